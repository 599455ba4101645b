use rand::Rng;

/// Generates a text-mode browser (Lynx) user agent with randomized version components.
///
/// Search engines answer this browser with plain markup and no scripts, which keeps
/// result pages parseable.
///
/// # Arguments
///
/// * `rng` - The random source; pass a seeded generator for reproducible output.
///
/// # Returns
///
/// A string such as `Lynx/2.8.1 libwww-FM/14 SSL-MM/1.4.7 OpenSSL/3.5.2`.
pub fn generate_user_agent<R: Rng>(rng: &mut R) -> String {
    let lynx = if rng.gen_bool(0.5) {
        format!("Lynx/2.{}.{}", rng.gen_range(8..=9), rng.gen_range(0..=2))
    } else {
        format!("Lynx/3.{}.0", rng.gen_range(0..=2))
    };

    let libwww = format!("libwww-FM/{}", rng.gen_range(13..=15));
    let ssl_mm = format!("SSL-MM/1.{}.{}", rng.gen_range(4..=5), rng.gen_range(0..=9));

    let openssl_minor = if rng.gen_bool(0.5) {
        format!("1.{}", rng.gen_range(0..=1))
    } else {
        format!("3.{}", rng.gen_range(4..=5))
    };
    let openssl = format!("OpenSSL/{openssl_minor}.{}", rng.gen_range(0..=9));

    format!("{lynx} {libwww} {ssl_mm} {openssl}")
}
