use crate::RawResult;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Turns raw result page markup into an ordered list of results.
pub trait PageParser: Send + Sync {
    fn parse(&self, html: &str) -> Vec<RawResult>;
}

/// Selectors for one result page layout.
struct Layout {
    block: Selector,
    link: Selector,
    title: Selector,
    description: Selector,
}

impl Layout {
    fn new(block: &str, link: &str, title: &str, description: &str) -> Option<Self> {
        Some(Self {
            block: Selector::parse(block).ok()?,
            link: Selector::parse(link).ok()?,
            title: Selector::parse(title).ok()?,
            description: Selector::parse(description).ok()?,
        })
    }
}

/// The `GoogleResultParser` struct extracts results from Google result pages.
///
/// It tries the basic (text browser) layout first and falls back to the
/// full desktop layout. Redirect links (`/url?q=...`) are unwrapped.
pub struct GoogleResultParser {
    layouts: Vec<Layout>,
}

impl Default for GoogleResultParser {
    fn default() -> Self {
        let layouts = [
            // Layout served to text browsers
            ("div.ezO2md", "a[href]", "span.CVA68e", "span.FrIlee"),
            // Desktop layout
            ("div.g", "a[href]", "h3", "div.VwiC3b, div[style='-webkit-line-clamp:2']"),
            // News layout
            ("div.SoaBEf", "a[href]", "div[role='heading']", "div.GI74Re"),
        ];

        Self {
            layouts: layouts
                .into_iter()
                .filter_map(|(block, link, title, description)| {
                    Layout::new(block, link, title, description)
                })
                .collect(),
        }
    }
}

impl PageParser for GoogleResultParser {
    fn parse(&self, html: &str) -> Vec<RawResult> {
        let document = Html::parse_document(html);

        for layout in &self.layouts {
            let results: Vec<RawResult> = document
                .select(&layout.block)
                .filter_map(|block| self.parse_block(block, layout))
                .collect();

            if !results.is_empty() {
                debug!("Parsed {} results", results.len());
                return results;
            }
        }

        debug!("No results found in result page");
        Vec::new()
    }
}

impl GoogleResultParser {
    fn parse_block(&self, block: ElementRef<'_>, layout: &Layout) -> Option<RawResult> {
        let anchor = block.select(&layout.link).next()?;
        let href = anchor.value().attr("href")?;

        let link = clean_google_url(href)?;
        if !is_valid_url(&link) {
            debug!("Skipping link: {}", link);
            return None;
        }

        let title = anchor
            .select(&layout.title)
            .next()
            .or_else(|| block.select(&layout.title).next())
            .map(element_text)
            .filter(|title| !title.is_empty())?;

        let description = block
            .select(&layout.description)
            .next()
            .map(element_text)
            .filter(|description| !description.is_empty());

        Some(RawResult {
            title,
            link,
            description,
        })
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cleans a Google redirect URL to extract the actual URL.
///
/// # Arguments
///
/// * `url` - The `href` found in the result page.
///
/// # Returns
///
/// An `Option` containing the destination URL, or `None` for relative links that are not redirects.
pub fn clean_google_url(url: &str) -> Option<String> {
    if let Some((_, query)) = url.split_once("/url?") {
        let target = query.split('&').find_map(|pair| {
            pair.strip_prefix("q=").or_else(|| pair.strip_prefix("url="))
        })?;
        return urlencoding::decode(target).ok().map(|decoded| decoded.into_owned());
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        return Some(url.to_string());
    }

    None
}

/// Checks whether a URL points outside the search engine itself.
pub fn is_valid_url(url: &str) -> bool {
    let invalid_patterns = [
        "google.com/search",
        "google.com/url",
        "google.com/imgres",
        "accounts.google",
        "support.google",
        "maps.google",
        "webcache.googleusercontent",
        "/preferences",
        "/setprefs",
        "/advanced_search",
    ];

    (url.starts_with("https://") || url.starts_with("http://"))
        && url::Url::parse(url).is_ok()
        && !invalid_patterns.iter().any(|&pattern| url.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_PAGE: &str = r#"
        <html><body>
            <div class="ezO2md">
                <a href="/url?q=https://www.rust-lang.org/&amp;sa=U&amp;ved=2ah">
                    <span class="CVA68e">Rust Programming Language</span>
                </a>
                <span class="FrIlee">A language empowering everyone.</span>
            </div>
            <div class="ezO2md">
                <a href="/url?q=https://doc.rust-lang.org/book/%3Fx%3D1&amp;sa=U">
                    <span class="CVA68e">The Rust Book</span>
                </a>
            </div>
            <div class="ezO2md">
                <a href="/search?q=rust&amp;tbm=isch"><span class="CVA68e">Images</span></a>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_basic_layout() {
        let results = GoogleResultParser::default().parse(BASIC_PAGE);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].link, "https://www.rust-lang.org/");
        assert_eq!(
            results[0].description.as_deref(),
            Some("A language empowering everyone.")
        );
        assert_eq!(results[1].link, "https://doc.rust-lang.org/book/?x=1");
        assert_eq!(results[1].description, None);
    }

    #[test]
    fn test_desktop_layout() {
        let html = r#"
            <div class="g">
                <a href="https://example.com/page"><h3>Example page</h3></a>
                <div class="VwiC3b">Snippet   text</div>
            </div>
        "#;

        let results = GoogleResultParser::default().parse(html);

        assert_eq!(
            results,
            vec![RawResult::new(
                "Example page",
                "https://example.com/page",
                Some("Snippet text".to_string())
            )]
        );
    }

    #[test]
    fn test_empty_page() {
        assert!(GoogleResultParser::default().parse("<html></html>").is_empty());
    }

    #[test]
    fn test_clean_google_url() {
        assert_eq!(
            clean_google_url("/url?q=https://a.com/x%20y&sa=U").as_deref(),
            Some("https://a.com/x y")
        );
        assert_eq!(clean_google_url("https://a.com").as_deref(), Some("https://a.com"));
        assert_eq!(clean_google_url("/search?q=rust"), None);
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com"));
        assert!(!is_valid_url("https://www.google.com/search?q=x"));
        assert!(!is_valid_url("javascript:void(0)"));
    }
}
