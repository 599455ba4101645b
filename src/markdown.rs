use htmd::element_handler::{HandlerResult, Handlers};
use htmd::{Element, HtmlToMarkdown};

/// Converts rendered pages into markdown.
///
/// Scripts, styles and the document head never reach the output. Lines are not
/// wrapped.
pub struct MarkdownConverter {
    converter: HtmlToMarkdown,
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new(false, true)
    }
}

impl MarkdownConverter {
    /// Creates a converter.
    ///
    /// # Arguments
    ///
    /// * `ignore_links` - Keep only the text of `<a>` elements, dropping `[text](href)` syntax.
    /// * `ignore_images` - Drop `<img>` elements entirely.
    pub fn new(ignore_links: bool, ignore_images: bool) -> Self {
        let mut skipped = vec!["head", "script", "style", "noscript", "template"];
        if ignore_images {
            skipped.push("img");
        }

        let mut builder = HtmlToMarkdown::builder().skip_tags(skipped);
        if ignore_links {
            builder = builder.add_handler(vec!["a"], link_text_handler);
        }

        Self {
            converter: builder.build(),
        }
    }

    /// Converts `html` to markdown with surrounding whitespace trimmed.
    pub fn convert(&self, html: &str) -> std::io::Result<String> {
        Ok(self.converter.convert(html)?.trim().to_string())
    }
}

fn link_text_handler(handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    Some(handlers.walk_children(element.node))
}

/// Returns the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
