use crate::fetcher::{GoogleFetcher, PageFetcher, PageRequest};
use crate::parser::{GoogleResultParser, PageParser};
use crate::render::{HttpRenderEngine, RenderEngine};
use crate::{Filters, RawResult, Result, ResultSet, RetryPolicy, SearchConfig, SearchError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Rounds in a row that may accept nothing new before the backend is considered exhausted.
const MAX_STALE_ROUNDS: usize = 2;

/// The kind of results requested from the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Regular web results.
    #[default]
    #[serde(rename = "search", alias = "web")]
    Web,
    /// News results.
    News,
}

impl FromStr for Mode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" | "web" => Ok(Self::Web),
            "news" => Ok(Self::News),
            other => Err(SearchError::validation(
                "mode",
                format!("expected \"search\" or \"news\", got \"{other}\""),
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Web => f.write_str("search"),
            Self::News => f.write_str("news"),
        }
    }
}

/// A search to run: the free-text query, its filters and how many results to collect.
///
/// ```no_run
/// # async fn run() -> search_ai::Result<()> {
/// use search_ai::{Filters, Mode, SearchRequest};
///
/// let filters = Filters::builder().sites("docs.rs").build()?;
/// let request = SearchRequest::new("async runtime")
///     .mode(Mode::Web)
///     .filters(filters)
///     .length(10)
///     .unique(true);
///
/// let results = search_ai::search(&request).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub mode: Mode,
    pub filters: Filters,
    /// The number of results to collect.
    pub length: usize,
    /// The offset of the first requested result.
    pub offset: usize,
    /// Drop results whose link was already collected.
    pub unique: bool,
    pub safe: bool,
    pub lang: String,
    pub region: Option<String>,
    /// Proxy used by the free [`search`] function.
    pub proxy: Option<String>,
    /// The pause between two result page requests.
    pub sleep: Duration,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: Mode::Web,
            filters: Filters::default(),
            length: 5,
            offset: 0,
            unique: false,
            safe: true,
            lang: String::from("en"),
            region: None,
            proxy: None,
            sleep: crate::DEFAULT_PACE,
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn safe(mut self, safe: bool) -> Self {
        self.safe = safe;
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn sleep(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    /// The query text followed by the compiled filters, if any.
    pub fn compiled_query(&self) -> String {
        if self.filters.is_empty() {
            self.query.clone()
        } else {
            format!("{} {}", self.query, self.filters.compile())
        }
    }

    /// The retrieval parameters for this request, retried according to `retry`.
    pub fn retrieval_params(&self, retry: RetryPolicy) -> RetrievalParams {
        RetrievalParams {
            mode: self.mode,
            length: self.length,
            offset: self.offset,
            unique: self.unique,
            safe: self.safe,
            lang: self.lang.clone(),
            region: self.region.clone(),
            pace: self.sleep,
            retry,
        }
    }
}

/// The knobs of a single retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalParams {
    pub mode: Mode,
    pub length: usize,
    pub offset: usize,
    pub unique: bool,
    pub safe: bool,
    pub lang: String,
    pub region: Option<String>,
    pub pace: Duration,
    pub retry: RetryPolicy,
}

/// The `Searcher` struct runs searches against a backend and hands out result sets.
///
/// The page fetcher, result parser and render engine are trait objects, so any of
/// them can be swapped out; [`Searcher::new`] wires up the Google defaults.
#[derive(Clone)]
pub struct Searcher {
    config: SearchConfig,
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn PageParser>,
    render: Arc<dyn RenderEngine>,
}

impl Searcher {
    /// Creates a new `Searcher` with the default collaborators.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration shared by the fetcher and the render engine.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Searcher`, or an error if an HTTP client could not be created.
    pub fn new(config: SearchConfig) -> Result<Self> {
        let fetcher = Arc::new(GoogleFetcher::new(&config)?);
        let render = Arc::new(HttpRenderEngine::new(&config)?);

        Ok(Self::with_components(
            config,
            fetcher,
            Arc::new(GoogleResultParser::default()),
            render,
        ))
    }

    pub fn with_components(
        config: SearchConfig,
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<dyn PageParser>,
        render: Arc<dyn RenderEngine>,
    ) -> Self {
        Self {
            config,
            fetcher,
            parser,
            render,
        }
    }

    /// Replaces the engine used to render result pages during enrichment.
    pub fn with_render_engine(mut self, render: Arc<dyn RenderEngine>) -> Self {
        self.render = render;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Starts a request with this searcher's locale, safe search and pacing defaults.
    pub fn request(&self, query: impl Into<String>) -> SearchRequest {
        SearchRequest {
            safe: self.config.safe,
            lang: self.config.lang.clone(),
            region: self.config.region.clone(),
            proxy: self.config.proxy.clone(),
            sleep: self.config.pace,
            ..SearchRequest::new(query)
        }
    }

    /// Runs a search and returns the collected results.
    ///
    /// The request's `proxy` is not consulted; the searcher's clients were built with
    /// the proxy of its configuration.
    #[instrument(skip(self, request), fields(query = %request.query, mode = %request.mode))]
    pub async fn search(&self, request: &SearchRequest) -> Result<ResultSet> {
        if request.proxy.is_some() && request.proxy != self.config.proxy {
            debug!("Ignoring request proxy; the searcher uses its configured proxy");
        }

        let params = request.retrieval_params(self.config.retry);
        let results = self.retrieve(&request.compiled_query(), &params).await?;

        Ok(ResultSet::new(results, Arc::clone(&self.render)))
    }

    /// Collects `params.length` results for an already compiled query.
    ///
    /// Result pages are requested one after another, starting at `params.offset`, with a
    /// jittered pause of `params.pace` between them. When `params.unique` is set, links
    /// already collected in this call are skipped.
    ///
    /// # Arguments
    ///
    /// * `query` - The compiled query text.
    /// * `params` - Retrieval parameters.
    ///
    /// # Returns
    ///
    /// A `Result` containing exactly `params.length` results in backend order, or
    /// `SearchError::Exhausted` if the backend stops supplying new results first.
    pub async fn retrieve(&self, query: &str, params: &RetrievalParams) -> Result<Vec<RawResult>> {
        let length = params.length;
        if length == 0 {
            return Ok(Vec::new());
        }

        let mut accepted: Vec<RawResult> = Vec::with_capacity(length);
        let mut seen: HashSet<String> = HashSet::new();
        let mut cursor = params.offset;
        let mut stale_rounds = 0;

        loop {
            let request = PageRequest {
                query: query.to_string(),
                mode: params.mode,
                num: length + 1,
                start: cursor,
                safe: params.safe,
                lang: params.lang.clone(),
                region: params.region.clone(),
            };

            let html = self.fetch_with_retry(&request, &params.retry).await?;
            let page = self.parser.parse(&html);
            if page.is_empty() {
                error!(
                    "Result page at offset {} was empty; collected {} of {}",
                    cursor,
                    accepted.len(),
                    length
                );
                return Err(SearchError::Exhausted {
                    requested: length,
                    collected: accepted.len(),
                });
            }

            let page_len = page.len();
            let before = accepted.len();
            for result in page {
                if params.unique && !seen.insert(result.link.clone()) {
                    debug!("Skipping duplicate: {}", result.link);
                    continue;
                }

                accepted.push(result);
                if accepted.len() == length {
                    return Ok(accepted);
                }
            }

            let new_results = accepted.len() - before;
            info!(
                "Round at offset {} accepted {} of {} results ({}/{})",
                cursor,
                new_results,
                page_len,
                accepted.len(),
                length
            );

            if new_results == 0 {
                stale_rounds += 1;
                if stale_rounds >= MAX_STALE_ROUNDS {
                    error!(
                        "No new results for {} rounds; collected {} of {}",
                        stale_rounds,
                        accepted.len(),
                        length
                    );
                    return Err(SearchError::Exhausted {
                        requested: length,
                        collected: accepted.len(),
                    });
                }
            } else {
                stale_rounds = 0;
            }

            cursor += page_len;

            let delay = jittered_pace(params.pace, &mut rand::thread_rng());
            sleep(delay).await;
        }
    }

    async fn fetch_with_retry(&self, request: &PageRequest, policy: &RetryPolicy) -> Result<String> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.fetcher.fetch_page(request).await {
                Ok(html) => return Ok(html),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = policy.backoff(attempt);
                    warn!(
                        "Attempt {} of {} failed: {}. Retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Returns `pace` scaled by a uniform factor between 0.8 and 1.2.
pub fn jittered_pace<R: Rng>(pace: Duration, rng: &mut R) -> Duration {
    if pace.is_zero() {
        return Duration::ZERO;
    }
    pace.mul_f64(rng.gen_range(0.8..=1.2))
}

/// Runs a search with a default `Searcher` that uses the request's proxy.
pub async fn search(request: &SearchRequest) -> Result<ResultSet> {
    let config = SearchConfig {
        proxy: request.proxy.clone(),
        ..SearchConfig::default()
    };

    Searcher::new(config)?.search(request).await
}
