//! Page sources: where the crawler gets rendered HTML from.
//!
//! The catalog is rendered client-side, so the production source is a real
//! browser ([`crate::browser::BrowserSource`]). [`HttpSource`] does a plain GET
//! and is enough for server-rendered mirrors and for tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use coursescope_shared::{CourseScopeError, Result};

/// User-Agent string for catalog requests.
const USER_AGENT: &str = concat!("CourseScope/", env!("CARGO_PKG_VERSION"));

/// Something that can turn a URL into the page's HTML.
#[async_trait]
pub trait PageSource: Send {
    /// Load `url` and return its HTML.
    ///
    /// `ready` lists CSS selectors of which at least one must be present before
    /// the DOM is read. Sources that do not render (plain HTTP) may ignore it.
    async fn fetch(&mut self, url: &Url, ready: &[&str]) -> Result<String>;

    /// Release any external resources (browser process, tabs).
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Human-readable source name for tracing.
    fn name(&self) -> &str;
}

/// Plain HTTP page source backed by `reqwest`.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    /// Create a source whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| CourseScopeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch(&mut self, url: &Url, _ready: &[&str]) -> Result<String> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| CourseScopeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CourseScopeError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| CourseScopeError::Network(format!("{url}: body read failed: {e}")))
    }

    fn name(&self) -> &str {
        "http"
    }
}
