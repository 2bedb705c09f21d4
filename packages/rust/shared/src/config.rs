//! Application configuration for CourseScope.
//!
//! User config lives at `~/.coursescope/coursescope.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CourseScopeError, Result};
use crate::types::{TermSpec, is_valid_prefix};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "coursescope.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".coursescope";

// ---------------------------------------------------------------------------
// Config structs (matching coursescope.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalog site and crawl pacing.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Where crawl and analysis files live.
    #[serde(default)]
    pub output: OutputConfig,

    /// Browser launch settings.
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Classifier thresholds and keyword overrides.
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Root of the course catalog (search form lives here).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Terms to crawl, in order.
    #[serde(default = "default_terms")]
    pub terms: Vec<TermSpec>,

    /// JSON file holding the prefix list.
    #[serde(default = "default_prefixes_path")]
    pub prefixes_path: String,

    /// Pause after each course page, in ms.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// How long to wait for a page's content to render.
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            terms: default_terms(),
            prefixes_path: default_prefixes_path(),
            request_delay_ms: default_request_delay(),
            page_timeout_secs: default_page_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://catalog.nau.edu/Courses".into()
}
fn default_terms() -> Vec<TermSpec> {
    vec![
        TermSpec::new("Fall 2025", Some(1257)),
        TermSpec::new("Spring 2026", Some(1261)),
    ]
}
fn default_prefixes_path() -> String {
    "prefixes.json".into()
}
fn default_request_delay() -> u64 {
    250
}
fn default_page_timeout() -> u64 {
    15
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for every CSV this tool reads or writes.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    #[serde(default = "default_courses_file")]
    pub courses_file: String,

    #[serde(default = "default_empty_prefixes_file")]
    pub empty_prefixes_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            courses_file: default_courses_file(),
            empty_prefixes_file: default_empty_prefixes_file(),
        }
    }
}

impl OutputConfig {
    pub fn dir_path(&self) -> PathBuf {
        PathBuf::from(&self.dir)
    }

    pub fn courses_path(&self) -> PathBuf {
        self.dir_path().join(&self.courses_file)
    }

    pub fn empty_prefixes_path(&self) -> PathBuf {
        self.dir_path().join(&self.empty_prefixes_file)
    }
}

fn default_output_dir() -> String {
    "outputs".into()
}
fn default_courses_file() -> String {
    "nau_courses.csv".into()
}
fn default_empty_prefixes_file() -> String {
    "nau_empty_prefixes.csv".into()
}

/// `[browser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Explicit Chrome/Chromium binary. Searched on common paths when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_executable: Option<String>,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Extra command-line switches passed to the browser.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
            args: Vec::new(),
        }
    }
}

fn default_window_width() -> u32 {
    1400
}
fn default_window_height() -> u32 {
    900
}

/// `[classifier]` section.
///
/// Keyword lists left unset fall back to the built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_true")]
    pub fuzzy_enabled: bool,

    /// Minimum 0-100 similarity for a fuzzy match.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: u8,

    /// Threshold used by the broad (recall-oriented) variant.
    #[serde(default = "default_broad_fuzzy_threshold")]
    pub broad_fuzzy_threshold: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_patterns: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_patterns: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_patterns: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzzy_phrases: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethics_patterns: Option<Vec<String>>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            fuzzy_enabled: true,
            fuzzy_threshold: default_fuzzy_threshold(),
            broad_fuzzy_threshold: default_broad_fuzzy_threshold(),
            primary_patterns: None,
            secondary_patterns: None,
            context_patterns: None,
            fuzzy_phrases: None,
            ethics_patterns: None,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_fuzzy_threshold() -> u8 {
    90
}
fn default_broad_fuzzy_threshold() -> u8 {
    85
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration: merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Catalog root; search results live under `{base_url}/results`.
    pub base_url: Url,
    /// Terms to crawl.
    pub terms: Vec<TermSpec>,
    /// Prefixes to search within each term.
    pub prefixes: Vec<String>,
    /// Replace both output files instead of resuming.
    pub overwrite: bool,
    /// Run the browser without a visible window.
    pub headless: bool,
    /// Pause after each course page, in ms.
    pub request_delay_ms: u64,
    /// Render wait per page, in seconds.
    pub page_timeout_secs: u64,
    /// Courses CSV.
    pub courses_path: PathBuf,
    /// Empty-prefix log CSV.
    pub empty_prefixes_path: PathBuf,
}

impl CrawlConfig {
    /// Build the runtime config. Prefixes are loaded separately.
    pub fn from_app(config: &AppConfig, prefixes: Vec<String>) -> Result<Self> {
        let base_url = parse_base_url(&config.catalog.base_url)?;

        Ok(Self {
            base_url,
            terms: config.catalog.terms.clone(),
            prefixes,
            overwrite: false,
            headless: true,
            request_delay_ms: config.catalog.request_delay_ms,
            page_timeout_secs: config.catalog.page_timeout_secs,
            courses_path: config.output.courses_path(),
            empty_prefixes_path: config.output.empty_prefixes_path(),
        })
    }
}

/// Parse the catalog root, forcing a trailing slash so relative joins stay
/// under it (`.../Courses/` + `results` → `.../Courses/results`).
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| CourseScopeError::config(format!("invalid base_url '{raw}': {e}")))
}

// ---------------------------------------------------------------------------
// Prefix list
// ---------------------------------------------------------------------------

/// Load the course prefix list from a JSON array of strings.
pub fn load_prefixes(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(CourseScopeError::config(format!(
            "prefix file not found at {}. Run `coursescope prefixes extract` to generate it.",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| CourseScopeError::io(path, e))?;
    let prefixes: Vec<String> = serde_json::from_str(&content).map_err(|e| {
        CourseScopeError::validation(format!(
            "invalid prefixes format in {}; expected a JSON list of strings: {e}",
            path.display()
        ))
    })?;

    if prefixes.is_empty() {
        return Err(CourseScopeError::validation(format!(
            "prefix file {} is empty",
            path.display()
        )));
    }

    for prefix in prefixes.iter().filter(|p| !is_valid_prefix(p)) {
        tracing::warn!(%prefix, "prefix does not look like a catalog code");
    }

    Ok(prefixes)
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.coursescope/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CourseScopeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.coursescope/coursescope.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CourseScopeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CourseScopeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CourseScopeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CourseScopeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CourseScopeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
