use crate::search::Mode;
use crate::useragent::generate_user_agent;
use crate::{Result, SearchConfig, SearchError};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, COOKIE, USER_AGENT};
use reqwest::{Client, Proxy};
use tracing::{debug, instrument};

/// Cookies that skip the consent interstitial.
const CONSENT_COOKIES: &str = "CONSENT=PENDING+987; SOCS=CAESHAgBEhIaAB";

/// The parameters of one result page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// The compiled query text.
    pub query: String,
    pub mode: Mode,
    /// The number of results asked for.
    pub num: usize,
    /// The offset of the first result.
    pub start: usize,
    pub safe: bool,
    pub lang: String,
    pub region: Option<String>,
}

impl PageRequest {
    /// The query string parameters sent to the backend, in order.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.query.clone()),
            ("num", self.num.to_string()),
            ("start", self.start.to_string()),
            ("safe", self.safe.to_string()),
            ("hl", self.lang.clone()),
        ];
        if let Some(region) = &self.region {
            params.push(("gl", region.clone()));
        }
        if self.mode == Mode::News {
            params.push(("tbm", "nws".to_string()));
        }
        params
    }
}

/// Fetches raw result page markup from a search backend.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Requests one result page.
    ///
    /// Transport failures are reported as errors whose [`SearchError::is_transient`]
    /// decides whether the caller retries.
    async fn fetch_page(&self, request: &PageRequest) -> Result<String>;
}

/// The `GoogleFetcher` struct requests result pages from Google's HTML search endpoint.
pub struct GoogleFetcher {
    /// The HTTP client used for making requests.
    client: Client,
    /// The search endpoint.
    base_url: String,
}

impl GoogleFetcher {
    /// Creates a new `GoogleFetcher` with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Provides the endpoint, request timeout and optional proxy.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `GoogleFetcher` instance, or an error if the client could not be created.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.timeout).gzip(true);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for GoogleFetcher {
    #[instrument(skip(self), fields(start = request.start, num = request.num))]
    async fn fetch_page(&self, request: &PageRequest) -> Result<String> {
        let user_agent = generate_user_agent(&mut rand::thread_rng());
        debug!("Requesting result page with user agent {}", user_agent);

        let response = self
            .client
            .get(&self.base_url)
            .query(&request.params())
            .header(ACCEPT, "text/html, text/plain, text/sgml, text/css, */*;q=0.01")
            .header(ACCEPT_ENCODING, "gzip")
            .header(ACCEPT_LANGUAGE, "en")
            .header(USER_AGENT, user_agent)
            .header(COOKIE, CONSENT_COOKIES)
            .send()
            .await?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: Mode, region: Option<&str>) -> PageRequest {
        PageRequest {
            query: "rust site:docs.rs".to_string(),
            mode,
            num: 6,
            start: 10,
            safe: true,
            lang: "en".to_string(),
            region: region.map(str::to_string),
        }
    }

    #[test]
    fn test_web_params() {
        let params = request(Mode::Web, None).params();
        assert_eq!(
            params,
            vec![
                ("q", "rust site:docs.rs".to_string()),
                ("num", "6".to_string()),
                ("start", "10".to_string()),
                ("safe", "true".to_string()),
                ("hl", "en".to_string()),
            ]
        );
    }

    #[test]
    fn test_news_params_add_discriminator() {
        let params = request(Mode::News, Some("us")).params();
        assert!(params.contains(&("gl", "us".to_string())));
        assert_eq!(params.last(), Some(&("tbm", "nws".to_string())));
    }
}
