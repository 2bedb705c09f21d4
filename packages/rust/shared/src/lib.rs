//! Shared types, error model, and configuration for CourseScope.
//!
//! This crate is the foundation depended on by all other CourseScope crates.
//! It provides:
//! - [`CourseScopeError`], the unified error type
//! - Domain types ([`CourseRecord`], [`EmptyPrefixEntry`], [`TermSpec`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrowserConfig, CatalogConfig, ClassifierConfig, CrawlConfig, OutputConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, load_prefixes,
    parse_base_url,
};
pub use error::{CourseScopeError, Result};
pub use types::{
    COURSE_COLUMNS, CourseRecord, EMPTY_REASON, EmptyPrefixEntry, SECTIONS_DELIMITER, TermSpec,
    is_valid_prefix, sections,
};
