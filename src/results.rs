use crate::enrich::{EnrichOptions, ResultEnricher};
use crate::render::{RenderEngine, RenderSession};
use crate::{FailedResult, RawResult, Result, ResultRecord, SearchError};
use futures::{stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// The heading that opens every markdown document.
const MARKDOWN_HEADING: &str = "# Search Results";

/// The `ResultSet` struct holds the results of one search, in backend order, along with
/// the render engine used to enrich them.
///
/// Batch operations open one render session, enrich the results one after another and
/// close the session before returning.
#[derive(Clone)]
pub struct ResultSet {
    results: Vec<RawResult>,
    engine: Arc<dyn RenderEngine>,
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

impl ResultSet {
    pub fn new(results: Vec<RawResult>, engine: Arc<dyn RenderEngine>) -> Self {
        Self { results, engine }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RawResult> {
        self.results.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawResult> {
        self.results.iter()
    }

    pub fn results(&self) -> &[RawResult] {
        &self.results
    }

    pub fn into_inner(self) -> Vec<RawResult> {
        self.results
    }

    /// Renders every result into one markdown document.
    ///
    /// # Arguments
    ///
    /// * `options` - Controls whether pages are fetched and how their bodies are rendered.
    ///
    /// # Returns
    ///
    /// A `Result` containing a `# Search Results` heading followed by one block per result,
    /// separated by blank lines, or an error if the render session could not be opened.
    pub async fn to_markdown(&self, options: &EnrichOptions) -> Result<String> {
        let blocks: Vec<String> = if options.only_page_content {
            self.page_blocks(options).await?
        } else {
            let records = self.enrich_all(options).await?;
            records.iter().map(ResultRecord::to_markdown).collect()
        };

        let mut document = Vec::with_capacity(blocks.len() + 1);
        document.push(MARKDOWN_HEADING.to_string());
        document.extend(blocks);

        Ok(document.join("\n\n"))
    }

    /// Turns every result into a structured record.
    ///
    /// Results whose page failed to render come back as `ResultRecord::Failed`; the
    /// other results are still enriched.
    pub async fn to_structured(&self, options: &EnrichOptions) -> Result<Vec<ResultRecord>> {
        self.enrich_all(options).await
    }

    /// Same as [`Self::to_structured`], as a JSON array.
    pub async fn to_json(&self, options: &EnrichOptions) -> Result<serde_json::Value> {
        let records = self.enrich_all(options).await?;
        Ok(serde_json::to_value(records)?)
    }

    /// Enriches the result at `index` with a session of its own.
    ///
    /// Pass [`EnrichOptions::single`] for the usual single-result preview length.
    ///
    /// # Arguments
    ///
    /// * `index` - The position of the result in this set.
    /// * `options` - Controls whether the page is fetched and how its body is rendered.
    ///
    /// # Returns
    ///
    /// A `Result` containing the record, or an error if `index` is out of range, the
    /// session could not be opened or the page could not be rendered.
    pub async fn enrich_one(&self, index: usize, options: &EnrichOptions) -> Result<ResultRecord> {
        let result = self.member(index)?;
        let enricher = ResultEnricher::new(options);
        if !enricher.will_fetch(result) {
            return Ok(ResultRecord::Basic(result.clone()));
        }

        let session = self.engine.open().await?;
        let record = enricher.enrich(result, session.as_ref()).await;
        close_session(session.as_ref()).await;

        record
    }

    /// Markdown block for the result at `index`, rendered with a session of its own.
    ///
    /// With `only_page_content` the block is just the truncated page body.
    pub async fn markdown_one(&self, index: usize, options: &EnrichOptions) -> Result<String> {
        if !options.only_page_content {
            return Ok(self.enrich_one(index, options).await?.to_markdown());
        }

        let result = self.member(index)?;
        let enricher = ResultEnricher::new(options);
        if !enricher.will_fetch(result) {
            return Ok(result.basic_markdown());
        }

        let session = self.engine.open().await?;
        let content = enricher.page_content(result, session.as_ref()).await;
        close_session(session.as_ref()).await;

        Ok(content?.unwrap_or_else(|| result.basic_markdown()))
    }

    fn member(&self, index: usize) -> Result<&RawResult> {
        self.results.get(index).ok_or_else(|| {
            SearchError::validation(
                "index",
                format!("{index} is out of range for {} results", self.results.len()),
            )
        })
    }

    async fn enrich_all(&self, options: &EnrichOptions) -> Result<Vec<ResultRecord>> {
        if !options.extend {
            return Ok(self.results.iter().cloned().map(ResultRecord::Basic).collect());
        }

        let session = self.engine.open().await?;
        info!("Enriching {} results", self.results.len());

        let enricher = ResultEnricher::new(options);
        let records = enrich_each(&self.results, &enricher, session.as_ref()).await;
        close_session(session.as_ref()).await;

        Ok(records)
    }

    async fn page_blocks(&self, options: &EnrichOptions) -> Result<Vec<String>> {
        if !options.extend {
            return Ok(self.results.iter().map(RawResult::basic_markdown).collect());
        }

        let session = self.engine.open().await?;
        info!("Reading page content of {} results", self.results.len());

        let enricher = ResultEnricher::new(options);
        let blocks = content_each(&self.results, &enricher, session.as_ref()).await;
        close_session(session.as_ref()).await;

        Ok(blocks)
    }
}

async fn close_session(session: &dyn RenderSession) {
    if let Err(e) = session.close().await {
        warn!("Failed to close render session: {}", e);
    }
}

async fn enrich_each(
    results: &[RawResult],
    enricher: &ResultEnricher,
    session: &dyn RenderSession,
) -> Vec<ResultRecord> {
    stream::iter(results)
        .then(move |result| async move {
            match enricher.enrich(result, session).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("Failed to enrich {}: {}", result.link, e);
                    ResultRecord::Failed(FailedResult {
                        result: result.clone(),
                        error: e.to_string(),
                    })
                }
            }
        })
        .collect()
        .await
}

/// Page bodies in order; results that are not fetched or fail fall back to basic blocks.
async fn content_each(
    results: &[RawResult],
    enricher: &ResultEnricher,
    session: &dyn RenderSession,
) -> Vec<String> {
    stream::iter(results)
        .then(move |result| async move {
            match enricher.page_content(result, session).await {
                Ok(Some(content)) => content,
                Ok(None) => result.basic_markdown(),
                Err(e) => {
                    warn!("Failed to read {}: {}", result.link, e);
                    result.basic_markdown()
                }
            }
        })
        .collect()
        .await
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a RawResult;
    type IntoIter = std::slice::Iter<'a, RawResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = RawResult;
    type IntoIter = std::vec::IntoIter<RawResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
