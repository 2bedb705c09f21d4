//! Pipeline orchestration for CourseScope.
//!
//! Ties the crawler, classifier, and CSV storage together into the
//! workflows the CLI exposes: crawl, analyze, analyze-broad, and prefix
//! extraction.

pub mod analyze;
pub mod pipeline;
pub mod prefixes;

pub use analyze::{AnalyzeConfig, AnalyzeOutcome, BroadConfig, ColumnMap, analyze, analyze_broad};
pub use pipeline::{CrawlRequest, Driver, crawl_catalog};
pub use prefixes::{extract_prefix_file, extract_prefixes};
