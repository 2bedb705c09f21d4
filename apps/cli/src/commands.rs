//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use coursescope_classifier::KeywordConfig;
use coursescope_core::analyze::CANDIDATES_FILE;
use coursescope_core::{AnalyzeConfig, BroadConfig, ColumnMap, CrawlRequest, Driver};
use coursescope_crawler::{CrawlProgress, CrawlReport};
use coursescope_shared::{
    AppConfig, CrawlConfig, TermSpec, init_config, load_config, load_config_from, load_prefixes,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CourseScope: find AI and ethics content in the NAU course catalog.
#[derive(Parser)]
#[command(
    name = "coursescope",
    version,
    about = "Crawl the NAU course catalog and flag AI- and ethics-related courses.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.coursescope/coursescope.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Page source for the crawler.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum DriverArg {
    Browser,
    Http,
}

impl From<DriverArg> for Driver {
    fn from(arg: DriverArg) -> Self {
        match arg {
            DriverArg::Browser => Driver::Browser,
            DriverArg::Http => Driver::Http,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl the catalog, resuming from existing output.
    Crawl {
        /// Discard existing output and crawl everything again.
        #[arg(long)]
        overwrite: bool,

        /// Show the browser window.
        #[arg(long)]
        no_headless: bool,

        /// Prefix list (JSON array). Defaults to [catalog].prefixes_path.
        #[arg(long)]
        prefixes: Option<PathBuf>,

        /// How pages are fetched.
        #[arg(long, value_enum, default_value = "browser")]
        driver: DriverArg,

        /// Term to crawl as "Label" or "Label=code". Repeatable; replaces configured terms.
        #[arg(long = "term")]
        terms: Vec<TermSpec>,
    },

    /// Classify crawled courses and write the reports.
    Analyze {
        /// Course CSV. Defaults to the crawl output.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Report directory. Defaults to [output].dir.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Empty-prefix log for the gap report.
        #[arg(long)]
        empty_prefixes: Option<PathBuf>,

        #[command(flatten)]
        columns: ColumnArgs,

        /// Minimum fuzzy score (0-100).
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        fuzzy_threshold: Option<u8>,

        /// Turn fuzzy matching off.
        #[arg(long)]
        disable_fuzzy: bool,
    },

    /// Recall-oriented AI candidate search for manual review.
    AnalyzeBroad {
        /// Course CSV. Defaults to the crawl output.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Candidate CSV. Defaults to <output dir>/nau_courses_ai_candidates.csv.
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        columns: ColumnArgs,

        /// Minimum fuzzy score (0-100).
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        fuzzy_threshold: Option<u8>,

        /// Turn fuzzy matching off.
        #[arg(long)]
        disable_fuzzy: bool,
    },

    /// Prefix list management.
    Prefixes {
        #[command(subcommand)]
        action: PrefixesAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Input column names, for course files from other sources.
#[derive(Args, Debug, Clone)]
pub(crate) struct ColumnArgs {
    /// Column holding the course prefix.
    #[arg(long, default_value = "prefix")]
    prefix_col: String,

    /// Column holding the course number.
    #[arg(long, default_value = "number")]
    number_col: String,

    /// Column holding the course title.
    #[arg(long, default_value = "title")]
    title_col: String,

    /// Column holding the course description.
    #[arg(long, default_value = "description")]
    description_col: String,
}

impl From<ColumnArgs> for ColumnMap {
    fn from(args: ColumnArgs) -> Self {
        Self {
            prefix: args.prefix_col,
            number: args.number_col,
            title: args.title_col,
            description: args.description_col,
        }
    }
}

/// Prefix subcommands.
#[derive(Subcommand)]
pub(crate) enum PrefixesAction {
    /// Extract prefix codes from the prefixes document (text or PDF).
    Extract {
        /// Source document.
        source: PathBuf,

        /// Output JSON file. Defaults to [catalog].prefixes_path.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "coursescope=info",
        1 => "coursescope=debug",
        _ => "coursescope=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Crawl {
            overwrite,
            no_headless,
            prefixes,
            driver,
            terms,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_crawl(&config, overwrite, no_headless, prefixes, driver.into(), terms).await
        }
        Command::Analyze {
            input,
            output_dir,
            empty_prefixes,
            columns,
            fuzzy_threshold,
            disable_fuzzy,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            let keywords = keywords_for(&config, fuzzy_threshold, disable_fuzzy);
            let analyze = AnalyzeConfig {
                input: input.unwrap_or_else(|| config.output.courses_path()),
                output_dir: output_dir.unwrap_or_else(|| config.output.dir_path()),
                empty_prefixes: empty_prefixes
                    .unwrap_or_else(|| config.output.empty_prefixes_path()),
                columns: columns.into(),
                keywords,
            };
            cmd_analyze(&analyze)
        }
        Command::AnalyzeBroad {
            input,
            output,
            columns,
            fuzzy_threshold,
            disable_fuzzy,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            let broad = BroadConfig {
                input: input.unwrap_or_else(|| config.output.courses_path()),
                output: output.unwrap_or_else(|| config.output.dir_path().join(CANDIDATES_FILE)),
                columns: columns.into(),
                fuzzy_enabled: config.classifier.fuzzy_enabled && !disable_fuzzy,
                fuzzy_threshold: fuzzy_threshold.unwrap_or(config.classifier.broad_fuzzy_threshold),
            };
            cmd_analyze_broad(&broad)
        }
        Command::Prefixes { action } => match action {
            PrefixesAction::Extract { source, out } => {
                let config = resolve_config(config_path.as_deref())?;
                let out = out.unwrap_or_else(|| PathBuf::from(&config.catalog.prefixes_path));
                cmd_prefixes_extract(&source, &out)
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn keywords_for(config: &AppConfig, threshold: Option<u8>, disable_fuzzy: bool) -> KeywordConfig {
    let mut keywords = KeywordConfig::from_config(&config.classifier);
    if let Some(threshold) = threshold {
        keywords = keywords.with_fuzzy_threshold(threshold);
    }
    if disable_fuzzy {
        keywords = keywords.without_fuzzy();
    }
    keywords
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_crawl(
    config: &AppConfig,
    overwrite: bool,
    no_headless: bool,
    prefixes: Option<PathBuf>,
    driver: Driver,
    terms: Vec<TermSpec>,
) -> Result<()> {
    let prefixes_path = prefixes.unwrap_or_else(|| PathBuf::from(&config.catalog.prefixes_path));
    let prefixes = load_prefixes(&prefixes_path)?;

    let mut crawl = CrawlConfig::from_app(config, prefixes)?;
    crawl.overwrite = overwrite;
    crawl.headless = !no_headless;
    if !terms.is_empty() {
        crawl.terms = terms;
    }
    if crawl.terms.is_empty() {
        return Err(eyre!("no terms to crawl: set [catalog].terms or pass --term"));
    }

    info!(
        %driver,
        overwrite,
        terms = crawl.terms.len(),
        prefixes = crawl.prefixes.len(),
        "starting catalog crawl"
    );

    let request = CrawlRequest {
        crawl,
        driver,
        browser: config.browser.clone(),
    };
    let reporter = CliProgress::new();
    let report = coursescope_core::crawl_catalog(&request, &reporter).await?;

    println!();
    println!("  Crawl finished.");
    println!("  Courses added:  {}", report.courses_added);
    println!("  Pairs searched: {}", report.pairs_searched);
    println!("  Pairs skipped:  {}", report.pairs_skipped);
    println!("  Empty pairs:    {}", report.pairs_empty);
    if report.pairs_unstored > 0 {
        println!("  Unstored pairs: {} (retried next run)", report.pairs_unstored);
    }
    println!("  Page errors:    {}", report.errors.len());
    println!("  Time:           {:.1}s", report.duration.as_secs_f64());
    for (term, reason) in &report.failed_terms {
        println!("  Term skipped:   {term} ({reason})");
    }
    println!();

    if !report.failed_terms.is_empty() {
        warn!(count = report.failed_terms.len(), "some terms could not be resolved");
    }
    Ok(())
}

fn cmd_analyze(config: &AnalyzeConfig) -> Result<()> {
    let outcome = coursescope_core::analyze(config)?;

    println!();
    println!("  Analysis complete.");
    println!("  Rows classified:   {}", outcome.rows);
    println!("  Unique courses:    {}", outcome.summary.total_unique_courses);
    println!("  AI-related:        {}", outcome.summary.total_ai_related);
    println!("  Ethics-related:    {}", outcome.summary.total_ethics_related);
    println!("  AI and ethics:     {}", outcome.summary.total_ai_and_ethics);
    println!("  Empty prefixes:    {}", outcome.gap_prefixes);
    for file in &outcome.files {
        println!("  Wrote {}", file.display());
    }
    println!();
    Ok(())
}

fn cmd_analyze_broad(config: &BroadConfig) -> Result<()> {
    let count = coursescope_core::analyze_broad(config)?;
    println!("Wrote {count} AI candidates to {}", config.output.display());
    Ok(())
}

fn cmd_prefixes_extract(source: &Path, out: &Path) -> Result<()> {
    let prefixes = coursescope_core::extract_prefix_file(source, out)?;
    println!("Found {} unique prefixes; wrote {}", prefixes.len(), out.display());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid progress template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl CrawlProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn pair_started(&self, term: &str, prefix: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {term} {prefix}"));
    }

    fn pair_finished(&self, term: &str, prefix: &str, listed: usize, added: usize) {
        self.spinner
            .set_message(format!("{term} {prefix}: {listed} listed, {added} new"));
    }

    fn done(&self, _report: &CrawlReport) {
        self.spinner.finish_and_clear();
    }
}
