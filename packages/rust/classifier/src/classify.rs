//! Default (precision-oriented) classification.

use tracing::{debug, info, instrument};

use coursescope_shared::{CourseRecord, Result};

use crate::keywords::KeywordConfig;
use crate::matchers::{EthicsMatcher, MatchHit, MatcherChain};
use crate::text::normalize;

/// A course with its flags. Computed fresh every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRecord {
    pub course: CourseRecord,
    pub is_ai_related: bool,
    pub is_ethics_related: bool,
    /// What made the course AI-related, if it is.
    pub ai_hit: Option<MatchHit>,
}

/// Compiled matchers for one keyword config.
pub struct Classifier {
    chain: MatcherChain,
    ethics: EthicsMatcher,
}

impl Classifier {
    pub fn new(keywords: &KeywordConfig) -> Result<Self> {
        Ok(Self {
            chain: MatcherChain::from_keywords(keywords)?,
            ethics: EthicsMatcher::from_keywords(keywords)?,
        })
    }

    pub fn classify_course(&self, course: &CourseRecord) -> ClassificationRecord {
        let text = normalize(&course.text());
        let ai_hit = self.chain.check(&text);
        if let Some(hit) = &ai_hit {
            debug!(
                prefix = %course.prefix,
                number = %course.number,
                tier = %hit.tier,
                term = %hit.term,
                "AI match"
            );
        }

        ClassificationRecord {
            course: course.clone(),
            is_ai_related: ai_hit.is_some(),
            is_ethics_related: self.ethics.is_match(&text),
            ai_hit,
        }
    }
}

/// Flag every course. Output order follows input order.
#[instrument(skip_all, fields(courses = courses.len(), fuzzy = keywords.fuzzy_enabled))]
pub fn classify(courses: &[CourseRecord], keywords: &KeywordConfig) -> Result<Vec<ClassificationRecord>> {
    let classifier = Classifier::new(keywords)?;
    let records: Vec<_> = courses.iter().map(|c| classifier.classify_course(c)).collect();

    info!(
        ai = records.iter().filter(|r| r.is_ai_related).count(),
        ethics = records.iter().filter(|r| r.is_ethics_related).count(),
        "classified courses"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::MatchTier;

    fn course(prefix: &str, number: &str, title: &str, description: &str) -> CourseRecord {
        CourseRecord {
            term: "Fall 2025".into(),
            prefix: prefix.into(),
            number: number.into(),
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    #[test]
    fn flags_are_independent() {
        let courses = vec![
            course("CS", "470", "Artificial Intelligence", "Search, planning, machine learning."),
            course("PHI", "331", "Environmental Ethics", "Moral questions about nature."),
            course("CS", "396", "AI Ethics", "Ethical issues raised by AI systems."),
            course("ACC", "205", "Financial Accounting", "Recording transactions."),
        ];
        let records = classify(&courses, &KeywordConfig::default()).unwrap();

        let flags: Vec<(bool, bool)> = records
            .iter()
            .map(|r| (r.is_ai_related, r.is_ethics_related))
            .collect();
        assert_eq!(flags, vec![(true, false), (false, true), (true, true), (false, false)]);
        assert_eq!(records[0].ai_hit.as_ref().unwrap().tier, MatchTier::Primary);
        assert!(records[3].ai_hit.is_none());
    }

    #[test]
    fn title_and_description_both_count() {
        let records = classify(
            &[course("MAT", "461", "Applied Statistics", "Includes a unit on neural networks.")],
            &KeywordConfig::default(),
        )
        .unwrap();
        assert!(records[0].is_ai_related);
    }

    #[test]
    fn title_only_fragments_are_not_ai() {
        let courses = vec![
            course("BUS", "101", "Agent", ""),
            course("EDU", "200", "Learning", ""),
            course("ART", "150", "Vision", ""),
        ];
        let records = classify(&courses, &KeywordConfig::default()).unwrap();
        for record in &records {
            assert!(!record.is_ai_related, "{} flagged: {:?}", record.course.title, record.ai_hit);
        }
    }

    #[test]
    fn empty_text_is_not_flagged() {
        let records = classify(&[course("XYZ", "100", "", "")], &KeywordConfig::default()).unwrap();
        assert!(!records[0].is_ai_related);
        assert!(!records[0].is_ethics_related);
    }

    #[test]
    fn bad_override_pattern_fails() {
        let keywords = KeywordConfig {
            ethics: vec!["[".into()],
            ..KeywordConfig::default()
        };
        assert!(classify(&[], &keywords).is_err());
    }
}
