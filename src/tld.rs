//! Recognized top-level domains accepted by the `tlds` filter families.
//!
//! Recognition is backed by the public suffix list compiled into `psl`, so every
//! delegated generic, brand and country-code domain is accepted.

/// Checks whether `tld` (with its leading dot, e.g. `.gov`) is a recognized top-level domain.
///
/// Matching is case-insensitive. Only single labels are considered; `.co.uk` is a
/// public suffix but not a top-level domain.
pub fn is_recognized(tld: &str) -> bool {
    let Some(label) = tld.strip_prefix('.') else {
        return false;
    };
    if label.is_empty() || label.contains('.') {
        return false;
    }
    let label = label.to_ascii_lowercase();

    match psl::suffix(label.as_bytes()) {
        Some(suffix) => suffix.is_known() && suffix.as_bytes() == label.as_bytes(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_domains() {
        for tld in [".gov", ".edu", ".biz", ".xyz", ".info", ".com", ".uk", ".DE", ".museum"] {
            assert!(is_recognized(tld), "{tld} should be recognized");
        }
    }

    #[test]
    fn test_newer_generic_domains() {
        for tld in [".ninja", ".london", ".google", ".fyi", ".nyc", ".Berlin"] {
            assert!(is_recognized(tld), "{tld} should be recognized");
        }
    }

    #[test]
    fn test_unknown_domains() {
        for tld in [".invalidtld", ".badzone", "com", ".", "", ".co.uk"] {
            assert!(!is_recognized(tld), "{tld} should be rejected");
        }
    }
}
