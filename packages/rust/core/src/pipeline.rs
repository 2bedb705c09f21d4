//! End-to-end crawl: config → page source → crawler → CSV store.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, instrument};

use coursescope_crawler::{
    BrowserSettings, BrowserSource, CrawlProgress, CrawlReport, Crawler, HttpSource, PageSource,
};
use coursescope_shared::{BrowserConfig, CourseScopeError, CrawlConfig, Result};
use coursescope_storage::CourseStore;

/// How catalog pages are fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Driver {
    /// Headless (or headed) Chrome over CDP. Required for the live catalog.
    #[default]
    Browser,
    /// Plain HTTP GET.
    Http,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Browser => "browser",
            Self::Http => "http",
        })
    }
}

impl FromStr for Driver {
    type Err = CourseScopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" => Ok(Self::Browser),
            "http" => Ok(Self::Http),
            other => Err(CourseScopeError::config(format!(
                "unknown driver '{other}' (expected browser or http)"
            ))),
        }
    }
}

/// Everything the crawl pipeline needs.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub crawl: CrawlConfig,
    pub driver: Driver,
    pub browser: BrowserConfig,
}

/// Run an incremental crawl, appending to the configured output files.
#[instrument(skip_all, fields(driver = %request.driver, terms = request.crawl.terms.len(), prefixes = request.crawl.prefixes.len()))]
pub async fn crawl_catalog(
    request: &CrawlRequest,
    progress: &dyn CrawlProgress,
) -> Result<CrawlReport> {
    let config = &request.crawl;
    let store = CourseStore::new(&config.courses_path, &config.empty_prefixes_path);
    let page_timeout = Duration::from_secs(config.page_timeout_secs);

    info!(
        courses = %store.courses_path().display(),
        empty = %store.empty_prefixes_path().display(),
        "crawl output"
    );

    match request.driver {
        Driver::Browser => {
            let settings = BrowserSettings::from_config(&request.browser, config.headless, page_timeout);
            run_with(config.clone(), BrowserSource::new(settings), &store, progress).await
        }
        Driver::Http => {
            run_with(config.clone(), HttpSource::new(page_timeout)?, &store, progress).await
        }
    }
}

async fn run_with<S: PageSource>(
    config: CrawlConfig,
    source: S,
    store: &CourseStore,
    progress: &dyn CrawlProgress,
) -> Result<CrawlReport> {
    let mut crawler = Crawler::new(config, source);
    crawler.run(store, progress).await
}
