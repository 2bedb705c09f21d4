//! Aggregates over classified courses: unique subsets, per-prefix totals,
//! the summary, and the empty-prefix gap report.

use std::collections::BTreeMap;

use coursescope_shared::EmptyPrefixEntry;

use crate::classify::ClassificationRecord;

/// One row per (prefix, number). The first occurrence supplies the course
/// fields; both flags are OR-ed across every occurrence. Sorted by prefix,
/// then number.
pub fn unique_courses(records: &[ClassificationRecord]) -> Vec<ClassificationRecord> {
    let mut unique: BTreeMap<(String, String), ClassificationRecord> = BTreeMap::new();

    for record in records {
        let key = (record.course.prefix.clone(), record.course.number.clone());
        match unique.get_mut(&key) {
            Some(existing) => {
                existing.is_ai_related |= record.is_ai_related;
                existing.is_ethics_related |= record.is_ethics_related;
                if existing.ai_hit.is_none() {
                    existing.ai_hit = record.ai_hit.clone();
                }
            }
            None => {
                unique.insert(key, record.clone());
            }
        }
    }
    unique.into_values().collect()
}

/// Unique AI-related courses.
pub fn ai_subset(unique: &[ClassificationRecord]) -> Vec<ClassificationRecord> {
    unique.iter().filter(|r| r.is_ai_related).cloned().collect()
}

/// Unique ethics-related courses.
pub fn ethics_subset(unique: &[ClassificationRecord]) -> Vec<ClassificationRecord> {
    unique.iter().filter(|r| r.is_ethics_related).cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PrefixTotal {
    pub prefix: String,
    pub total_courses: usize,
    pub ai_related_courses: usize,
}

/// Unique-course counts per prefix, sorted by prefix.
pub fn prefix_totals(unique: &[ClassificationRecord]) -> Vec<PrefixTotal> {
    let mut totals: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in unique {
        let entry = totals.entry(record.course.prefix.as_str()).or_default();
        entry.0 += 1;
        if record.is_ai_related {
            entry.1 += 1;
        }
    }

    totals
        .into_iter()
        .map(|(prefix, (total, ai))| PrefixTotal {
            prefix: prefix.to_string(),
            total_courses: total,
            ai_related_courses: ai,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_unique_courses: usize,
    pub total_ai_related: usize,
    pub total_ethics_related: usize,
    pub total_ai_and_ethics: usize,
}

impl Summary {
    pub fn from_unique(unique: &[ClassificationRecord]) -> Self {
        Self {
            total_unique_courses: unique.len(),
            total_ai_related: unique.iter().filter(|r| r.is_ai_related).count(),
            total_ethics_related: unique.iter().filter(|r| r.is_ethics_related).count(),
            total_ai_and_ethics: unique
                .iter()
                .filter(|r| r.is_ai_related && r.is_ethics_related)
                .count(),
        }
    }

    /// `(metric, value)` rows in report order.
    pub fn metrics(&self) -> [(&'static str, usize); 4] {
        [
            ("total_unique_courses", self.total_unique_courses),
            ("total_ai_related", self.total_ai_related),
            ("total_ethics_related", self.total_ethics_related),
            ("total_ai_and_ethics", self.total_ai_and_ethics),
        ]
    }
}

/// A prefix that came back empty, with the terms it was empty in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapEntry {
    pub prefix: String,
    pub terms: Vec<String>,
}

/// Group empty-prefix entries by prefix. Terms keep first-seen order.
pub fn gap_report(entries: &[EmptyPrefixEntry]) -> Vec<GapEntry> {
    let mut gaps: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for entry in entries {
        let terms = gaps.entry(entry.prefix.as_str()).or_default();
        if !terms.contains(&entry.term) {
            terms.push(entry.term.clone());
        }
    }

    gaps.into_iter()
        .map(|(prefix, terms)| GapEntry {
            prefix: prefix.to_string(),
            terms,
        })
        .collect()
}
