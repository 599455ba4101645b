use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// The `SearchConfig` struct holds the settings shared by every request a `Searcher` makes.
/// It covers the backend endpoint, transport timeouts, retries, pacing and the default locale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// The search endpoint result pages are requested from.
    pub base_url: String,
    /// The timeout duration for HTTP requests.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Retry settings for result page requests.
    pub retry: RetryPolicy,
    /// The pause between two result page requests.
    #[serde(with = "duration_secs")]
    pub pace: Duration,
    /// Interface language sent as `hl`.
    pub lang: String,
    /// Country sent as `gl`.
    pub region: Option<String>,
    /// Whether safe search is requested.
    pub safe: bool,
    /// Proxy URL used for both result pages and rendered pages.
    pub proxy: Option<String>,
    /// The timeout for rendering a single destination page.
    #[serde(with = "duration_secs")]
    pub render_timeout: Duration,
}

/// The `RetryPolicy` struct describes how transient transport failures are retried.
/// Delays start at `initial_backoff` and double after every failed attempt up to `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// The delay before the first retry.
    #[serde(with = "duration_secs")]
    pub initial_backoff: Duration,
    /// The largest delay between two attempts.
    #[serde(with = "duration_secs")]
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::DEFAULT_MAX_ATTEMPTS,
            initial_backoff: crate::DEFAULT_INITIAL_BACKOFF,
            max_backoff: crate::DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes a single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Returns the delay to wait after the given failed attempt (1-based).
    ///
    /// # Arguments
    ///
    /// * `attempt` - The number of attempts made so far.
    ///
    /// # Returns
    ///
    /// `initial_backoff * 2^(attempt - 1)`, capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_backoff)
    }
}

impl Default for SearchConfig {
    /// Provides default values for the `SearchConfig` struct.
    ///
    /// # Returns
    ///
    /// A `SearchConfig` instance with default settings.
    fn default() -> Self {
        Self {
            base_url: crate::DEFAULT_BASE_URL.to_string(),
            timeout: crate::DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            pace: crate::DEFAULT_PACE,
            lang: String::from("en"),
            region: None,
            safe: true,
            proxy: None,
            render_timeout: crate::DEFAULT_TIMEOUT,
        }
    }
}

impl SearchConfig {
    /// Loads the configuration from an optional file and `SEARCH_AI_*` environment variables.
    ///
    /// Values missing from both sources keep their defaults. Nested keys use `__` in
    /// environment variable names, e.g. `SEARCH_AI_RETRY__MAX_ATTEMPTS=5`.
    ///
    /// # Arguments
    ///
    /// * `path` - An optional configuration file (TOML, YAML or JSON, picked by extension).
    ///
    /// # Returns
    ///
    /// A `Result` containing the merged `SearchConfig`, or an error if a source is malformed.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("SEARCH_AI")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Durations are written as fractional seconds in configuration sources.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
