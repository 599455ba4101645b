use crate::PageMetadata;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::instrument;

/// A lone self-closing tag such as `<div/>` or `<img src="a.png" />`.
static SELF_CLOSING_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<[A-Za-z][\w:.-]*(\s+[^<>]*?)?\s*/>$"#).expect("valid tag pattern")
});

/// The `MetadataExtractor` struct reads title, description, author and Twitter handle
/// from the `<head>` of a rendered page.
pub struct MetadataExtractor {
    /// A map of metadata keys to CSS selectors used to extract metadata from the HTML document.
    metadata_selectors: HashMap<String, Selector>,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new([
            ("title", "head title"),
            ("description", "head meta[name='description']"),
            ("author", "head meta[name='author']"),
            ("twitter", "head meta[name='twitter:site']"),
        ])
    }
}

impl MetadataExtractor {
    /// Creates a new `MetadataExtractor` from `(key, selector)` pairs.
    ///
    /// Recognized keys are `title`, `description`, `author` and `twitter`; selectors that
    /// do not parse are skipped.
    pub fn new(
        metadata_selectors: impl IntoIterator<Item = (impl Into<String>, impl AsRef<str>)>,
    ) -> Self {
        let metadata_selectors = metadata_selectors
            .into_iter()
            .filter_map(|(key, sel)| {
                Selector::parse(sel.as_ref())
                    .ok()
                    .map(|selector| (key.into(), selector))
            })
            .collect();

        Self { metadata_selectors }
    }

    /// Extracts the page metadata.
    ///
    /// The HTML parser recovers from any malformed input, so this never fails; a page
    /// without usable metadata yields `PageMetadata::default()`.
    #[instrument(skip(self, html), fields(html_length = html.len()))]
    pub fn extract(&self, html: &str) -> PageMetadata {
        let document = Html::parse_document(html);

        let title = self.selector("title").and_then(|selector| {
            document
                .select(selector)
                .next()
                .map(|element| element.text().collect::<String>())
                .and_then(non_empty)
        });

        let description = self
            .meta_content(&document, "description")
            .filter(|description| is_valid_description(description));

        PageMetadata {
            title,
            description,
            author: self.meta_content(&document, "author"),
            twitter: self.meta_content(&document, "twitter"),
        }
    }

    fn selector(&self, key: &str) -> Option<&Selector> {
        self.metadata_selectors.get(key)
    }

    fn meta_content(&self, document: &Html, key: &str) -> Option<String> {
        document
            .select(self.selector(key)?)
            .next()
            .and_then(|element| element.value().attr("content"))
            .and_then(|content| non_empty(content.to_string()))
    }
}

/// Extracts the page metadata with the default selectors.
pub fn extract_metadata(html: &str) -> PageMetadata {
    MetadataExtractor::default().extract(html)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Checks whether a `description` meta value is real text.
///
/// Some pages put a markup fragment into the description, e.g. `<p>...</p>`. A value that
/// is a single well-formed element is rejected; everything else is accepted.
pub fn is_valid_description(description: &str) -> bool {
    !is_markup_element(description)
}

fn is_markup_element(value: &str) -> bool {
    let trimmed = value.trim();
    if !trimmed.starts_with('<') || !trimmed.ends_with('>') {
        return false;
    }

    // html5ever reports non-void self-closing tags as errors.
    if SELF_CLOSING_TAG.is_match(trimmed) {
        return true;
    }

    let fragment = Html::parse_fragment(trimmed);
    if !fragment.errors.is_empty() {
        return false;
    }

    let root = fragment.root_element();
    let mut elements = root.children().filter_map(ElementRef::wrap);
    let (Some(element), None) = (elements.next(), elements.next()) else {
        return false;
    };

    let has_loose_text = root.children().any(|child| match child.value() {
        Node::Text(text) => !text.trim().is_empty(),
        _ => false,
    });
    if has_loose_text {
        return false;
    }

    let closing_tag = format!("</{}>", element.value().name());
    trimmed.ends_with("/>") || trimmed.to_ascii_lowercase().ends_with(&closing_tag)
}
