use std::time::Duration;
use thiserror::Error;

pub mod blocking;
pub mod config;
pub mod enrich;
pub mod extract;
pub mod fetcher;
pub mod filters;
pub mod markdown;
pub mod parser;
pub mod render;
pub mod results;
pub mod search;
pub mod tld;
pub mod types;
pub mod useragent;

// Re-export commonly used types
pub use config::{RetryPolicy, SearchConfig};
pub use enrich::{EnrichOptions, ResultEnricher};
pub use filters::{Filters, FiltersBuilder};
pub use results::ResultSet;
pub use search::{search, Mode, SearchRequest, Searcher};
pub use types::{EnrichedResult, FailedResult, PageMetadata, RawResult, ResultRecord};

/// The `SearchError` enum represents the errors that can occur while compiling filters,
/// retrieving result pages or enriching results.
#[derive(Error, Debug)]
pub enum SearchError {
    /// A filter field or a call argument failed validation.
    #[error("invalid value for `{field}`: {message}")]
    Validation { field: String, message: String },
    /// Represents an error that occurs during an HTTP request.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
    /// The backend stopped supplying new results before the target count was reached.
    #[error("search exhausted: collected {collected} of {requested} requested results")]
    Exhausted { requested: usize, collected: usize },
    /// A single page could not be rendered during enrichment.
    #[error("failed to render {url}: {message}")]
    Render { url: String, message: String },
    /// The render session could not be established.
    #[error("render session unavailable: {0}")]
    Session(String),
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    /// The runtime backing the blocking API could not be created.
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SearchError {
    /// Builds a `Validation` error for the given field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same request could succeed.
    ///
    /// Connection failures, timeouts, rate limiting (429) and server errors (5xx) are
    /// transient. Everything else is surfaced to the caller immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => {
                if let Some(status) = e.status() {
                    return is_transient_status(status.as_u16());
                }
                e.is_timeout() || e.is_connect() || e.is_body()
            }
            Self::Status { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// A type alias for `Result` with the `SearchError` error type.
pub type Result<T> = std::result::Result<T, SearchError>;

// Constants

/// The default timeout duration for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// The default maximum number of attempts for a result page request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// The first retry waits this long; later retries double it.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Upper bound for a single retry delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);
/// The default pause between two result page requests.
pub const DEFAULT_PACE: Duration = Duration::from_secs(1);
/// The default search endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.google.com/search";
