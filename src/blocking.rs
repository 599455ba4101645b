//! A blocking counterpart of the async API.
//!
//! Every call drives the async implementation to completion on a private
//! current-thread runtime, so both APIs behave the same. These types must not be
//! used from within an async runtime.

use crate::enrich::EnrichOptions;
use crate::search::RetrievalParams;
use crate::{RawResult, Result, ResultRecord, SearchConfig, SearchRequest};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

fn runtime() -> Result<Arc<Runtime>> {
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(Arc::new(runtime))
}

/// Blocking version of [`crate::Searcher`].
#[derive(Clone)]
pub struct Searcher {
    inner: crate::Searcher,
    runtime: Arc<Runtime>,
}

impl Searcher {
    pub fn new(config: SearchConfig) -> Result<Self> {
        Self::from_async(crate::Searcher::new(config)?)
    }

    /// Wraps an async searcher, e.g. one built with custom components.
    pub fn from_async(inner: crate::Searcher) -> Result<Self> {
        Ok(Self {
            inner,
            runtime: runtime()?,
        })
    }

    pub fn request(&self, query: impl Into<String>) -> SearchRequest {
        self.inner.request(query)
    }

    /// Runs a search, blocking until the results are collected.
    pub fn search(&self, request: &SearchRequest) -> Result<ResultSet> {
        let inner = self.runtime.block_on(self.inner.search(request))?;
        Ok(ResultSet {
            inner,
            runtime: Arc::clone(&self.runtime),
        })
    }

    pub fn retrieve(&self, query: &str, params: &RetrievalParams) -> Result<Vec<RawResult>> {
        self.runtime.block_on(self.inner.retrieve(query, params))
    }
}

/// Blocking version of [`crate::ResultSet`].
#[derive(Debug, Clone)]
pub struct ResultSet {
    inner: crate::ResultSet,
    runtime: Arc<Runtime>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RawResult> {
        self.inner.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawResult> {
        self.inner.iter()
    }

    pub fn to_markdown(&self, options: &EnrichOptions) -> Result<String> {
        self.runtime.block_on(self.inner.to_markdown(options))
    }

    pub fn to_structured(&self, options: &EnrichOptions) -> Result<Vec<ResultRecord>> {
        self.runtime.block_on(self.inner.to_structured(options))
    }

    pub fn to_json(&self, options: &EnrichOptions) -> Result<serde_json::Value> {
        self.runtime.block_on(self.inner.to_json(options))
    }

    pub fn enrich_one(&self, index: usize, options: &EnrichOptions) -> Result<ResultRecord> {
        self.runtime.block_on(self.inner.enrich_one(index, options))
    }

    pub fn markdown_one(&self, index: usize, options: &EnrichOptions) -> Result<String> {
        self.runtime.block_on(self.inner.markdown_one(index, options))
    }

    /// Returns the async result set.
    pub fn into_async(self) -> crate::ResultSet {
        self.inner
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a RawResult;
    type IntoIter = std::slice::Iter<'a, RawResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

/// Runs a search with a default blocking `Searcher` that uses the request's proxy.
pub fn search(request: &SearchRequest) -> Result<ResultSet> {
    let config = SearchConfig {
        proxy: request.proxy.clone(),
        ..SearchConfig::default()
    };

    Searcher::new(config)?.search(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RetryPolicy;
    use mockito::Matcher;
    use std::time::Duration;

    const RESULT_PAGE: &str = r#"
        <html><body>
            <div class="ezO2md">
                <a href="/url?q=https://tokio.rs/&amp;sa=U"><span class="CVA68e">Tokio</span></a>
                <span class="FrIlee">An asynchronous runtime.</span>
            </div>
            <div class="ezO2md">
                <a href="/url?q=https://docs.rs/tokio&amp;sa=U"><span class="CVA68e">tokio - Rust</span></a>
            </div>
        </body></html>
    "#;

    fn config(server: &mockito::Server) -> SearchConfig {
        SearchConfig {
            base_url: format!("{}/search", server.url()),
            pace: Duration::ZERO,
            retry: RetryPolicy::none(),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_blocking_search_and_markdown() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "tokio".into()),
                Matcher::UrlEncoded("num".into(), "3".into()),
            ]))
            .with_status(200)
            .with_body(RESULT_PAGE)
            .create();

        let searcher = Searcher::new(config(&server)).unwrap();
        let request = searcher.request("tokio").length(2).sleep(Duration::ZERO);
        let results = searcher.search(&request).unwrap();

        mock.assert();
        assert_eq!(results.len(), 2);
        assert_eq!(results.get(0).map(|r| r.link.as_str()), Some("https://tokio.rs/"));

        let markdown = results.to_markdown(&EnrichOptions::basic()).unwrap();
        assert_eq!(
            markdown,
            "# Search Results\n\n\
             **Title:** Tokio\n**Link:** https://tokio.rs/\n**Description:** An asynchronous runtime.\n\n\
             **Title:** tokio - Rust\n**Link:** https://docs.rs/tokio"
        );
        assert_eq!(
            results.markdown_one(1, &EnrichOptions::basic()).unwrap(),
            "**Title:** tokio - Rust\n**Link:** https://docs.rs/tokio"
        );
    }

    #[test]
    fn test_blocking_search_reports_exhaustion() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html><body>No results</body></html>")
            .create();

        let searcher = Searcher::new(config(&server)).unwrap();
        let request = searcher.request("nothing").sleep(Duration::ZERO);
        let err = searcher.search(&request).unwrap_err();

        assert!(matches!(
            err,
            crate::SearchError::Exhausted {
                requested: 5,
                collected: 0
            }
        ));
    }
}
