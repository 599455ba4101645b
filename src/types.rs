use serde::{Deserialize, Serialize};

/// A search result as parsed from a result page, before enrichment.
///
/// Two results are the same result when their `link` is equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResult {
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RawResult {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            description,
        }
    }

    /// Renders the title, link and description lines without fetching the page.
    pub fn basic_markdown(&self) -> String {
        let mut parts = vec![
            format!("**Title:** {}", self.title),
            format!("**Link:** {}", self.link),
        ];
        if let Some(description) = &self.description {
            parts.push(format!("**Description:** {description}"));
        }
        parts.join("\n")
    }
}

/// Metadata read from the `<head>` of a fetched page.
///
/// Every field is optional; a page that cannot be read yields the default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub twitter: Option<String>,
}

/// A result augmented with page metadata and a preview of the page body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedResult {
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    pub page_preview: String,
}

impl EnrichedResult {
    /// Combines a raw result with the metadata and preview of its page.
    ///
    /// Page metadata wins over the values parsed from the result page; the
    /// description is dropped only when neither source has one.
    pub fn assemble(result: &RawResult, metadata: PageMetadata, page_preview: String) -> Self {
        Self {
            title: metadata.title.unwrap_or_else(|| result.title.clone()),
            link: result.link.clone(),
            description: metadata.description.or_else(|| result.description.clone()),
            author: metadata.author,
            twitter: metadata.twitter,
            page_preview,
        }
    }

    /// Renders the metadata lines followed by a `## Page Preview:` section.
    pub fn to_markdown(&self) -> String {
        let mut parts = vec![
            format!("**Title:** {}", self.title),
            format!("**Link:** {}", self.link),
        ];
        if let Some(description) = &self.description {
            parts.push(format!("**Description:** {description}"));
        }
        if let Some(author) = &self.author {
            parts.push(format!("**Author:** {author}"));
        }
        if let Some(twitter) = &self.twitter {
            parts.push(format!("**Twitter:** {twitter}"));
        }

        parts.push(String::new());
        parts.push("## Page Preview:\n".to_string());
        parts.push(self.page_preview.trim().to_string());

        parts.join("\n")
    }
}

/// A result whose page could not be fetched or rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedResult {
    #[serde(flatten)]
    pub result: RawResult,
    pub error: String,
}

/// The outcome of enriching one result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultRecord {
    /// The page was fetched and its metadata merged in.
    Enriched(EnrichedResult),
    /// Rendering failed; the parsed fields are kept along with the error.
    Failed(FailedResult),
    /// Enrichment was not requested or the link does not point to a text page.
    Basic(RawResult),
}

impl ResultRecord {
    pub fn title(&self) -> &str {
        match self {
            Self::Enriched(r) => &r.title,
            Self::Failed(r) => &r.result.title,
            Self::Basic(r) => &r.title,
        }
    }

    pub fn link(&self) -> &str {
        match self {
            Self::Enriched(r) => &r.link,
            Self::Failed(r) => &r.result.link,
            Self::Basic(r) => &r.link,
        }
    }

    pub fn is_enriched(&self) -> bool {
        matches!(self, Self::Enriched(_))
    }

    /// Markdown block for this record; failed records fall back to the basic form.
    pub fn to_markdown(&self) -> String {
        match self {
            Self::Enriched(r) => r.to_markdown(),
            Self::Failed(r) => r.result.basic_markdown(),
            Self::Basic(r) => r.basic_markdown(),
        }
    }
}
