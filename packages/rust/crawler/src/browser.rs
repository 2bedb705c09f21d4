//! Browser-backed page source.
//!
//! Uses chromiumoxide (CDP) to drive a local Chrome/Chromium. One tab is kept
//! open and reused for every page. A failed navigation drops the tab; a tab
//! that cannot be opened, or a run of consecutive failures, drops the whole
//! browser so the next fetch launches a fresh one.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use coursescope_shared::{BrowserConfig, CourseScopeError, Result};

use crate::source::PageSource;

/// How often the DOM is polled for a ready selector.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
const READY_POLL: Duration = Duration::from_millis(250);

/// Consecutive failed fetches after which the browser is relaunched.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
const RELAUNCH_AFTER: u32 = 3;

/// A browser step that failed during a fetch.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    OpenTab,
    Navigate,
    WaitReady,
    ReadDom,
}

/// What to discard after a failed step.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Teardown {
    Nothing,
    Tab,
    Browser,
}

/// `failures` counts consecutive failed fetches, this one included.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn teardown_after(step: Step, failures: u32) -> Teardown {
    match step {
        Step::OpenTab => Teardown::Browser,
        _ if failures >= RELAUNCH_AFTER => Teardown::Browser,
        Step::Navigate | Step::ReadDom => Teardown::Tab,
        Step::WaitReady => Teardown::Nothing,
    }
}

/// Launch settings for [`BrowserSource`].
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub args: Vec<String>,
    /// Maximum wait for a ready selector.
    pub page_timeout: Duration,
}

impl BrowserSettings {
    pub fn from_config(config: &BrowserConfig, headless: bool, page_timeout: Duration) -> Self {
        Self {
            headless,
            chrome_executable: config.chrome_executable.as_ref().map(PathBuf::from),
            window_width: config.window_width,
            window_height: config.window_height,
            args: config.args.clone(),
            page_timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// chromiumoxide implementation
// ---------------------------------------------------------------------------

#[cfg(feature = "browser")]
pub use imp::BrowserSource;

#[cfg(feature = "browser")]
mod imp {
    use super::*;

    use chromiumoxide::{Browser, BrowserConfig as CdpConfig, Page};
    use futures::StreamExt;
    use tokio::task::JoinHandle;

    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &[&str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    /// Page source driving a real browser.
    pub struct BrowserSource {
        settings: BrowserSettings,
        browser: Option<Browser>,
        page: Option<Page>,
        handler: Option<JoinHandle<()>>,
        failures: u32,
    }

    impl BrowserSource {
        /// Create the source. The browser is launched lazily on first fetch.
        pub fn new(settings: BrowserSettings) -> Self {
            Self {
                settings,
                browser: None,
                page: None,
                handler: None,
                failures: 0,
            }
        }

        fn find_chrome(&self) -> Result<PathBuf> {
            if let Some(path) = &self.settings.chrome_executable {
                return Ok(path.clone());
            }

            for path in CHROME_PATHS {
                let p = std::path::Path::new(path);
                if p.exists() {
                    info!(path, "found Chrome");
                    return Ok(p.to_path_buf());
                }
            }

            for cmd in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
                if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                    if output.status.success() {
                        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                        if !path.is_empty() {
                            info!(%path, "found Chrome in PATH");
                            return Ok(PathBuf::from(path));
                        }
                    }
                }
            }

            Err(CourseScopeError::Browser(
                "Chrome/Chromium not found. Install it or set [browser].chrome_executable, \
                 or crawl with `--driver http`."
                    .into(),
            ))
        }

        async fn ensure_browser(&mut self) -> Result<()> {
            if self.browser.is_some() {
                return Ok(());
            }

            info!(headless = self.settings.headless, "launching browser");
            let chrome = self.find_chrome()?;

            let mut builder = CdpConfig::builder()
                .chrome_executable(chrome)
                .window_size(self.settings.window_width, self.settings.window_height)
                .request_timeout(self.settings.page_timeout)
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--no-default-browser-check");

            if !self.settings.headless {
                builder = builder.with_head();
            }
            for arg in &self.settings.args {
                builder = builder.arg(arg.clone());
            }

            let config = builder
                .build()
                .map_err(|e| CourseScopeError::Browser(format!("invalid browser config: {e}")))?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| CourseScopeError::Browser(format!("failed to launch browser: {e}")))?;

            self.handler = Some(tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            }));
            self.browser = Some(browser);
            Ok(())
        }

        async fn open_tab(&mut self) -> Result<Page> {
            self.ensure_browser().await?;

            let browser = self
                .browser
                .as_ref()
                .ok_or_else(|| CourseScopeError::Browser("browser not initialized".into()))?;
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| CourseScopeError::Browser(format!("failed to open tab: {e}")))?;

            self.page = Some(page.clone());
            Ok(page)
        }

        /// The reusable tab. A running browser that cannot open one is
        /// relaunched once before giving up.
        async fn ensure_page(&mut self) -> Result<Page> {
            if let Some(page) = &self.page {
                return Ok(page.clone());
            }
            match self.open_tab().await {
                Ok(page) => Ok(page),
                Err(e) if self.browser.is_some() => {
                    warn!(error = %e, "browser session lost, relaunching");
                    self.teardown(teardown_after(Step::OpenTab, self.failures)).await;
                    self.open_tab().await
                }
                Err(e) => Err(e),
            }
        }

        async fn teardown(&mut self, teardown: Teardown) {
            match teardown {
                Teardown::Nothing => {}
                Teardown::Tab => self.page = None,
                Teardown::Browser => {
                    self.page = None;
                    if let Some(mut browser) = self.browser.take() {
                        let _ = browser.kill().await;
                    }
                    if let Some(handler) = self.handler.take() {
                        handler.abort();
                    }
                    self.failures = 0;
                }
            }
        }

        async fn load(
            &mut self,
            url: &Url,
            ready: &[&str],
        ) -> std::result::Result<String, (Step, CourseScopeError)> {
            let page = self
                .ensure_page()
                .await
                .map_err(|e| (Step::OpenTab, e))?;

            page.goto(url.as_str()).await.map_err(|e| {
                (
                    Step::Navigate,
                    CourseScopeError::Browser(format!("{url}: navigation failed: {e}")),
                )
            })?;

            self.wait_for_any(&page, url, ready)
                .await
                .map_err(|e| (Step::WaitReady, e))?;

            page.content().await.map_err(|e| {
                (
                    Step::ReadDom,
                    CourseScopeError::Browser(format!("{url}: could not read DOM: {e}")),
                )
            })
        }

        async fn wait_for_any(&self, page: &Page, url: &Url, ready: &[&str]) -> Result<()> {
            if ready.is_empty() {
                return Ok(());
            }

            let deadline = tokio::time::Instant::now() + self.settings.page_timeout;
            loop {
                for selector in ready {
                    if page.find_element(*selector).await.is_ok() {
                        debug!(%url, selector, "page ready");
                        return Ok(());
                    }
                }
                if tokio::time::Instant::now() >= deadline {
                    return Err(CourseScopeError::Browser(format!(
                        "{url}: timed out after {}s waiting for {}",
                        self.settings.page_timeout.as_secs(),
                        ready.join(" | ")
                    )));
                }
                tokio::time::sleep(READY_POLL).await;
            }
        }
    }

    #[async_trait]
    impl PageSource for BrowserSource {
        async fn fetch(&mut self, url: &Url, ready: &[&str]) -> Result<String> {
            debug!(%url, "navigating");
            match self.load(url, ready).await {
                Ok(html) => {
                    self.failures = 0;
                    Ok(html)
                }
                Err((step, e)) => {
                    self.failures += 1;
                    let teardown = teardown_after(step, self.failures);
                    if teardown == Teardown::Browser {
                        warn!(%url, ?step, failures = self.failures, "dropping browser session");
                    }
                    self.teardown(teardown).await;
                    Err(e)
                }
            }
        }

        async fn close(&mut self) -> Result<()> {
            self.page = None;
            self.failures = 0;
            if let Some(mut browser) = self.browser.take() {
                if let Err(e) = browser.close().await {
                    warn!(error = %e, "browser did not close cleanly");
                }
                let _ = browser.wait().await;
            }
            if let Some(handler) = self.handler.take() {
                handler.abort();
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "browser"
        }
    }
}

// ---------------------------------------------------------------------------
// Stub for when the browser feature is disabled
// ---------------------------------------------------------------------------

#[cfg(not(feature = "browser"))]
pub struct BrowserSource {
    #[allow(dead_code)]
    settings: BrowserSettings,
}

#[cfg(not(feature = "browser"))]
impl BrowserSource {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageSource for BrowserSource {
    async fn fetch(&mut self, _url: &Url, _ready: &[&str]) -> Result<String> {
        Err(CourseScopeError::Browser(
            "browser support not compiled. Rebuild with `--features browser` or use `--driver http`"
                .into(),
        ))
    }

    fn name(&self) -> &str {
        "browser"
    }
}
