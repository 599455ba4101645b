use crate::extract::MetadataExtractor;
use crate::markdown::{truncate_chars, MarkdownConverter};
use crate::render::RenderSession;
use crate::{EnrichedResult, RawResult, Result, ResultRecord, SearchError};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Content types that can be enriched.
const TEXTUAL_TYPES: [&str; 3] = ["text/html", "text/plain", "application/xhtml+xml"];

/// Options for turning results into markdown or structured records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichOptions {
    /// Fetch each page; when `false` only the parsed fields are used.
    pub extend: bool,
    /// Maximum number of characters kept from the page body.
    pub content_length: usize,
    /// Render links as plain text.
    pub ignore_links: bool,
    /// Leave images out of the page body.
    pub ignore_images: bool,
    /// Emit only the page body, without the metadata lines.
    pub only_page_content: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            extend: true,
            content_length: 400,
            ignore_links: false,
            ignore_images: true,
            only_page_content: false,
        }
    }
}

impl EnrichOptions {
    /// Defaults for enriching one result on its own: a 1000 character preview.
    pub fn single() -> Self {
        Self {
            content_length: 1000,
            ..Self::default()
        }
    }

    /// Options that never fetch a page.
    pub fn basic() -> Self {
        Self {
            extend: false,
            ..Self::default()
        }
    }

    pub fn with_content_length(mut self, content_length: usize) -> Self {
        self.content_length = content_length;
        self
    }

    pub fn with_ignore_links(mut self, ignore_links: bool) -> Self {
        self.ignore_links = ignore_links;
        self
    }

    pub fn with_ignore_images(mut self, ignore_images: bool) -> Self {
        self.ignore_images = ignore_images;
        self
    }

    pub fn with_only_page_content(mut self, only_page_content: bool) -> Self {
        self.only_page_content = only_page_content;
        self
    }
}

/// Checks whether a link points to a page the enricher can read.
///
/// The content type is guessed from the path extension. HTML, plain text and XHTML
/// qualify, and so do paths whose type cannot be guessed (e.g. no extension).
pub fn is_textual(link: &str) -> bool {
    let path = match url::Url::parse(link) {
        Ok(url) => url.path().to_string(),
        Err(_) => link.to_string(),
    };

    match mime_guess::from_path(&path).first_raw() {
        Some(mime) => TEXTUAL_TYPES.contains(&mime),
        None => true,
    }
}

/// The `ResultEnricher` struct turns one result into a fuller record by rendering its page.
pub struct ResultEnricher {
    /// Whether pages are fetched at all.
    extend: bool,
    /// Maximum number of characters of page body kept.
    content_length: usize,
    converter: MarkdownConverter,
    extractor: MetadataExtractor,
}

impl Default for ResultEnricher {
    fn default() -> Self {
        Self::new(&EnrichOptions::default())
    }
}

impl ResultEnricher {
    pub fn new(options: &EnrichOptions) -> Self {
        Self {
            extend: options.extend,
            content_length: options.content_length,
            converter: MarkdownConverter::new(options.ignore_links, options.ignore_images),
            extractor: MetadataExtractor::default(),
        }
    }

    /// Enriches a single result.
    ///
    /// # Arguments
    ///
    /// * `result` - The result to enrich.
    /// * `session` - The render session used to load the page.
    ///
    /// # Returns
    ///
    /// `ResultRecord::Basic` without fetching when enrichment is disabled or the link is
    /// not a text page, `ResultRecord::Enriched` otherwise, or an error if the page could
    /// not be rendered.
    #[instrument(skip(self, session), fields(link = %result.link))]
    pub async fn enrich(
        &self,
        result: &RawResult,
        session: &dyn RenderSession,
    ) -> Result<ResultRecord> {
        if !self.will_fetch(result) {
            return Ok(ResultRecord::Basic(result.clone()));
        }

        let html = session.render(&result.link).await?;
        Ok(ResultRecord::Enriched(self.enrich_html(result, &html)?))
    }

    /// Returns only the truncated page body, or `None` when the page is not fetched.
    pub async fn page_content(
        &self,
        result: &RawResult,
        session: &dyn RenderSession,
    ) -> Result<Option<String>> {
        if !self.will_fetch(result) {
            return Ok(None);
        }

        let html = session.render(&result.link).await?;
        Ok(Some(self.preview(result, &html)?))
    }

    /// Builds the enriched record from markup that has already been rendered.
    pub fn enrich_html(&self, result: &RawResult, html: &str) -> Result<EnrichedResult> {
        let preview = self.preview(result, html)?;
        let metadata = self.extractor.extract(html);

        Ok(EnrichedResult::assemble(result, metadata, preview))
    }

    /// Whether enriching `result` renders its page.
    pub fn will_fetch(&self, result: &RawResult) -> bool {
        if !self.extend {
            return false;
        }
        if !is_textual(&result.link) {
            debug!("Not a text page, keeping basic result: {}", result.link);
            return false;
        }
        true
    }

    fn preview(&self, result: &RawResult, html: &str) -> Result<String> {
        let markdown = self
            .converter
            .convert(html)
            .map_err(|e| SearchError::Render {
                url: result.link.clone(),
                message: format!("markdown conversion failed: {e}"),
            })?;

        Ok(truncate_chars(&markdown, self.content_length).to_string())
    }
}
