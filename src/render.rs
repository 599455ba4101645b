//! Render sessions that turn a URL into page markup.
//!
//! A [`RenderEngine`] opens a [`RenderSession`]; one session is reused for every
//! page of a batch and closed when the batch ends. Dropping a session releases
//! its resources as well, so cancelled batches do not leak browsers.

use crate::{Result, SearchConfig, SearchError};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Proxy};
use tracing::{debug, instrument};

/// The user agent presented when fetching destination pages.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Opens render sessions.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Opens a session. Failing here aborts the whole batch that asked for it.
    async fn open(&self) -> Result<Box<dyn RenderSession>>;
}

/// A reusable handle that returns the rendered markup of a page.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Loads `url` and returns its markup once the page has finished loading.
    async fn render(&self, url: &str) -> Result<String>;

    /// Releases the session.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// The `HttpRenderEngine` struct fetches pages over plain HTTP.
///
/// Scripts are not executed; the markup is what the server sent.
#[derive(Clone)]
pub struct HttpRenderEngine {
    /// The HTTP client shared by every session.
    client: Client,
}

impl HttpRenderEngine {
    /// Creates a new `HttpRenderEngine` with the render timeout and proxy of `config`.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(config.render_timeout)
            .gzip(true);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl RenderEngine for HttpRenderEngine {
    async fn open(&self) -> Result<Box<dyn RenderSession>> {
        Ok(Box::new(HttpRenderSession {
            client: self.client.clone(),
        }))
    }
}

struct HttpRenderSession {
    client: Client,
}

#[async_trait]
impl RenderSession for HttpRenderSession {
    #[instrument(skip(self))]
    async fn render(&self, url: &str) -> Result<String> {
        let render_error = |message: String| SearchError::Render {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await
            .map_err(|e| render_error(e.to_string()))?;

        let status = response.status();
        debug!("Response status: {}", status);
        if !status.is_success() {
            return Err(render_error(format!("HTTP {status}")));
        }

        response.text().await.map_err(|e| render_error(e.to_string()))
    }
}

#[cfg(feature = "chrome")]
pub use chrome::ChromeRenderEngine;

#[cfg(feature = "chrome")]
mod chrome {
    use super::{RenderEngine, RenderSession, BROWSER_USER_AGENT};
    use crate::{Result, SearchConfig, SearchError};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;
    use tracing::{info, warn};

    /// The `ChromeRenderEngine` struct renders pages in headless Chromium.
    ///
    /// Every session launches one browser; each page gets a fresh tab that is closed
    /// once its markup has been read.
    #[derive(Debug, Clone)]
    pub struct ChromeRenderEngine {
        proxy: Option<String>,
        timeout: Duration,
    }

    impl ChromeRenderEngine {
        pub fn new(config: &SearchConfig) -> Self {
            Self {
                proxy: config.proxy.clone(),
                timeout: config.render_timeout,
            }
        }
    }

    #[async_trait]
    impl RenderEngine for ChromeRenderEngine {
        async fn open(&self) -> Result<Box<dyn RenderSession>> {
            let mut builder = BrowserConfig::builder()
                .request_timeout(self.timeout)
                .window_size(1280, 720)
                .arg(format!("--user-agent={BROWSER_USER_AGENT}"))
                .arg("--lang=en-US")
                .arg("--no-first-run")
                .arg("--no-default-browser-check")
                .arg("--disable-extensions")
                .arg("--mute-audio");
            if let Some(proxy) = &self.proxy {
                builder = builder.arg(format!("--proxy-server={proxy}"));
            }
            let config = builder.build().map_err(SearchError::Session)?;

            info!("Launching headless browser");
            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| SearchError::Session(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        warn!("Browser handler error: {:?}", e);
                    }
                }
            });

            Ok(Box::new(ChromeRenderSession {
                browser: Mutex::new(Some(browser)),
                handler,
            }))
        }
    }

    struct ChromeRenderSession {
        browser: Mutex<Option<Browser>>,
        handler: JoinHandle<()>,
    }

    #[async_trait]
    impl RenderSession for ChromeRenderSession {
        async fn render(&self, url: &str) -> Result<String> {
            let render_error = |message: String| SearchError::Render {
                url: url.to_string(),
                message,
            };

            let guard = self.browser.lock().await;
            let browser = guard
                .as_ref()
                .ok_or_else(|| render_error("session already closed".to_string()))?;

            let page = browser
                .new_page(url)
                .await
                .map_err(|e| render_error(e.to_string()))?;

            let content = match page.wait_for_navigation().await {
                Ok(page) => page.content().await.map_err(|e| render_error(e.to_string())),
                Err(e) => Err(render_error(e.to_string())),
            };

            if let Err(e) = page.close().await {
                warn!("Failed to close tab for {}: {}", url, e);
            }

            content
        }

        async fn close(&self) -> Result<()> {
            if let Some(mut browser) = self.browser.lock().await.take() {
                browser
                    .close()
                    .await
                    .map_err(|e| SearchError::Session(e.to_string()))?;
                if let Err(e) = browser.wait().await {
                    warn!("Browser did not exit cleanly: {}", e);
                }
            }
            self.handler.abort();
            Ok(())
        }
    }

    impl Drop for ChromeRenderSession {
        fn drop(&mut self) {
            // Browser's own Drop kills the process.
            self.handler.abort();
        }
    }
}
