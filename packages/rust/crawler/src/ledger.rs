//! Incremental-crawl bookkeeping.
//!
//! A [`ScrapeLedger`] is rebuilt from the output files at the start of every
//! run. Planning is a set difference: requested (term, prefix) pairs minus the
//! pairs the ledger already holds. Interrupting a crawl and running it again
//! therefore only fetches what is missing.

use std::collections::HashSet;

use coursescope_shared::{CourseRecord, EmptyPrefixEntry, TermSpec};

/// What is already on disk.
#[derive(Debug, Default, Clone)]
pub struct ScrapeLedger {
    /// (term, prefix) pairs with at least one course row or an empty entry.
    done_pairs: HashSet<(String, String)>,
    /// (term, prefix, number) keys of stored courses.
    course_keys: HashSet<(String, String, String)>,
    /// (term, url) of stored course pages.
    course_urls: HashSet<(String, String)>,
}

/// The prefixes still to crawl within one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermPlan {
    pub term: TermSpec,
    /// Prefixes not yet processed for this term, in configured order.
    pub prefixes: Vec<String>,
    /// Prefixes skipped because the ledger already has them.
    pub skipped: usize,
}

impl ScrapeLedger {
    /// An empty ledger (overwrite mode or first run).
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile against the existing output files.
    pub fn from_existing(courses: &[CourseRecord], empty: &[EmptyPrefixEntry]) -> Self {
        let mut ledger = Self::new();
        for course in courses {
            ledger.record_course(course);
        }
        for entry in empty {
            ledger.mark_done(&entry.term, &entry.prefix);
        }
        ledger
    }

    /// Has this (term, prefix) pair been fully processed?
    pub fn is_done(&self, term: &str, prefix: &str) -> bool {
        self.done_pairs
            .contains(&(term.to_string(), prefix.to_string()))
    }

    /// Is a course with this (term, prefix, number) already stored?
    pub fn contains_course(&self, course: &CourseRecord) -> bool {
        let (term, prefix, number) = course.crawl_key();
        self.course_keys
            .contains(&(term.to_string(), prefix.to_string(), number.to_string()))
    }

    /// Was this page already scraped for `term`?
    pub fn contains_url(&self, term: &str, url: &str) -> bool {
        self.course_urls
            .contains(&(term.to_string(), url.to_string()))
    }

    /// Remember a stored course. Its (term, prefix) pair counts as done.
    pub fn record_course(&mut self, course: &CourseRecord) {
        let (term, prefix, number) = course.crawl_key();
        self.course_keys
            .insert((term.to_string(), prefix.to_string(), number.to_string()));
        if !course.url.is_empty() {
            self.course_urls
                .insert((term.to_string(), course.url.clone()));
        }
        self.mark_done(term, prefix);
    }

    pub fn mark_done(&mut self, term: &str, prefix: &str) {
        self.done_pairs.insert((term.to_string(), prefix.to_string()));
    }

    pub fn done_pairs(&self) -> usize {
        self.done_pairs.len()
    }

    pub fn course_count(&self) -> usize {
        self.course_keys.len()
    }

    /// Requested work minus what is already done, term-major.
    pub fn plan(&self, terms: &[TermSpec], prefixes: &[String]) -> Vec<TermPlan> {
        terms
            .iter()
            .map(|term| {
                let mut seen = HashSet::new();
                let mut todo = Vec::new();
                let mut skipped = 0;
                for prefix in prefixes {
                    if !seen.insert(prefix.as_str()) {
                        continue;
                    }
                    if self.is_done(&term.label, prefix) {
                        skipped += 1;
                    } else {
                        todo.push(prefix.clone());
                    }
                }
                TermPlan {
                    term: term.clone(),
                    prefixes: todo,
                    skipped,
                }
            })
            .collect()
    }
}
