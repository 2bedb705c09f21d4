//! Catalog crawler for the NAU course catalog.
//!
//! This crate provides:
//! - [`source`]: the [`PageSource`] seam with a plain HTTP implementation
//! - [`browser`]: a Chrome-backed source for the client-rendered catalog
//! - [`extract`]: HTML parsing of search, results, and course pages
//! - [`ledger`]: reconciliation of existing output and crawl planning
//! - [`engine`]: the incremental, resumable crawl loop

pub mod browser;
pub mod engine;
pub mod extract;
pub mod ledger;
pub mod source;

pub use browser::{BrowserSettings, BrowserSource};
pub use engine::{CrawlProgress, CrawlReport, Crawler, ResolvedTerm, SilentProgress};
pub use extract::ResultsPage;
pub use ledger::{ScrapeLedger, TermPlan};
pub use source::{HttpSource, PageSource};
