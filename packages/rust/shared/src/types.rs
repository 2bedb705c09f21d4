//! Core domain types for catalog crawling and course classification.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CourseScopeError;

/// Separator used when a list of sections is flattened into one CSV cell.
pub const SECTIONS_DELIMITER: &str = "; ";

/// Reason recorded for a (term, prefix) pair whose search had no results.
pub const EMPTY_REASON: &str = "empty";

static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z&]{2,6}$").expect("valid prefix regex"));

/// Whether `code` looks like a catalog course prefix (`ACC`, `CS`, `H&S`).
pub fn is_valid_prefix(code: &str) -> bool {
    PREFIX_RE.is_match(code)
}

// ---------------------------------------------------------------------------
// TermSpec
// ---------------------------------------------------------------------------

/// An academic term to crawl.
///
/// `code` is the catalog site's internal identifier for the term. When it is
/// `None` the crawler looks it up from the site's term selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSpec {
    /// Display label, e.g. `Fall 2025`.
    pub label: String,
    /// Pinned term code, e.g. `1257`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

impl TermSpec {
    pub fn new(label: impl Into<String>, code: Option<u32>) -> Self {
        Self {
            label: label.into(),
            code,
        }
    }
}

impl std::str::FromStr for TermSpec {
    type Err = CourseScopeError;

    /// Parse `Fall 2025` or `Fall 2025=1257`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (label, code) = match s.rsplit_once('=') {
            Some((label, code)) => {
                let code = code.trim().parse::<u32>().map_err(|e| {
                    CourseScopeError::validation(format!("invalid term code in '{s}': {e}"))
                })?;
                (label.trim(), Some(code))
            }
            None => (s.trim(), None),
        };

        if label.is_empty() {
            return Err(CourseScopeError::validation(format!(
                "term '{s}' has an empty label"
            )));
        }

        Ok(Self::new(label, code))
    }
}

// ---------------------------------------------------------------------------
// CourseRecord
// ---------------------------------------------------------------------------

/// One row of crawl output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Term display label.
    #[serde(default)]
    pub term: String,
    /// Catalog year, e.g. `2025-2026`. Empty when the page did not show one.
    #[serde(default)]
    pub catalog_year: String,
    /// Course prefix.
    pub prefix: String,
    /// Catalog course number; may carry a letter suffix (`499C`).
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Units as printed by the catalog (`3`, `1-6`, ...).
    #[serde(default)]
    pub units: String,
    /// Terms in which sections are offered, in page order.
    #[serde(default, with = "sections")]
    pub sections_offered: Vec<String>,
    /// Source page.
    #[serde(default)]
    pub url: String,
}

impl CourseRecord {
    /// Crawl dedup key: (term, prefix, number).
    pub fn crawl_key(&self) -> (&str, &str, &str) {
        (&self.term, &self.prefix, &self.number)
    }

    /// Classifier dedup key: (prefix, number). Courses repeat across terms.
    pub fn course_key(&self) -> (&str, &str) {
        (&self.prefix, &self.number)
    }

    /// Title and description joined for keyword matching.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Column order of the courses file.
pub const COURSE_COLUMNS: [&str; 9] = [
    "term",
    "catalog_year",
    "prefix",
    "number",
    "title",
    "description",
    "units",
    "sections_offered",
    "url",
];

// ---------------------------------------------------------------------------
// EmptyPrefixEntry
// ---------------------------------------------------------------------------

/// A (term, prefix) pair that was searched and returned nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyPrefixEntry {
    pub term: String,
    pub term_code: u32,
    pub prefix: String,
    pub error: String,
}

impl EmptyPrefixEntry {
    /// Entry for a search that came back with zero results.
    pub fn empty(term: impl Into<String>, term_code: u32, prefix: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            term_code,
            prefix: prefix.into(),
            error: EMPTY_REASON.to_string(),
        }
    }
}

/// `sections_offered` is a list in memory and a `; `-joined cell on disk.
pub mod sections {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::SECTIONS_DELIMITER;

    pub fn serialize<S: Serializer>(value: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.join(SECTIONS_DELIMITER))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(split(&raw))
    }

    /// Split a joined cell back into its section labels.
    pub fn split(raw: &str) -> Vec<String> {
        raw.split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}
