//! Broad (recall-oriented) candidate search.
//!
//! Every pattern carries a label so the output explains why a course matched.
//! Nothing is context-gated here; the list is meant for manual review.

use std::collections::{BTreeSet, HashSet};

use regex::Regex;
use tracing::{info, instrument};

use coursescope_shared::{CourseRecord, CourseScopeError, Result};

use crate::fuzzy;
use crate::text::normalize;

/// `(label, pattern)` pairs. Labels may repeat.
pub const BROAD_PATTERNS: &[(&str, &str)] = &[
    ("artificial_intelligence", r"\bartificial intelligence\b"),
    ("ai", r"\bai\b"),
    ("machine_learning", r"\bmachine learning\b"),
    ("deep_learning", r"\bdeep learning\b"),
    ("generative_ai", r"\bgenerative ai\b"),
    ("llm", r"\blarge language models?\b"),
    ("llm", r"\bllm\b"),
    ("gpt", r"\bgpt\b"),
    ("chatgpt", r"\bchatgpt\b"),
    ("neural_network", r"\bneural networks?\b"),
    ("reinforcement_learning", r"\breinforcement learning\b"),
    ("nlp", r"\bnatural language processing\b"),
    ("nlp", r"\bnlp\b"),
    ("computer_vision", r"\bcomputer vision\b"),
    ("machine_vision", r"\bmachine vision\b"),
    ("image_processing", r"\bimage processing\b"),
    ("pattern_recognition", r"\bpattern recognition\b"),
    ("data_mining", r"\bdata mining\b"),
    ("information_retrieval", r"\binformation retrieval\b"),
    ("expert_systems", r"\bexpert systems?\b"),
    ("knowledge_representation", r"\bknowledge representation\b"),
    ("intelligent_systems", r"\bintelligent systems?\b"),
    ("intelligent_agents", r"\bintelligent agents?\b"),
    ("agents", r"\bagents?\b"),
    ("agentic", r"\bagentic\b"),
    ("multi_agent", r"\bmulti agents?\b"),
    ("autonomous_systems", r"\bautonomous systems?\b"),
    ("autonomous", r"\bautonomous\b"),
    ("robotics", r"\brobotics?\b"),
    ("computational_intelligence", r"\bcomputational intelligence\b"),
    ("speech_recognition", r"\bspeech recognition\b"),
    ("recommendation_systems", r"\brecommendation systems?\b"),
    ("recommender_systems", r"\brecommender systems?\b"),
    ("decision_support", r"\bdecision support\b"),
    ("intelligent_control", r"\bintelligent control\b"),
    ("data_science", r"\bdata science\b"),
];

pub const BROAD_FUZZY_PHRASES: &[&str] = &[
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "generative ai",
    "large language model",
    "neural network",
    "reinforcement learning",
    "natural language processing",
    "computer vision",
    "pattern recognition",
    "data mining",
    "information retrieval",
    "expert systems",
    "knowledge representation",
    "intelligent systems",
    "intelligent agent",
    "autonomous systems",
    "computational intelligence",
    "speech recognition",
    "recommendation systems",
    "recommender systems",
    "decision support",
    "intelligent control",
    "data science",
];

pub const DEFAULT_BROAD_FUZZY_THRESHOLD: u8 = 85;

/// A course flagged by the broad search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadCandidate {
    pub course: CourseRecord,
    pub is_ai_candidate: bool,
    /// Sorted, comma-joined labels; `fuzzy:<phrase>` when only fuzzy fired.
    pub reason: String,
    /// Phrase that met the threshold, else empty.
    pub fuzzy_phrase: String,
    /// Best fuzzy score, even when below threshold. 0 with fuzzy disabled.
    pub fuzzy_score: u8,
}

/// Compiled labelled patterns plus fuzzy settings.
pub struct BroadClassifier {
    patterns: Vec<(String, Regex)>,
    phrases: Vec<String>,
    fuzzy_enabled: bool,
    threshold: u8,
}

impl BroadClassifier {
    pub fn new(fuzzy_enabled: bool, threshold: u8) -> Result<Self> {
        if threshold > 100 {
            return Err(CourseScopeError::validation(format!(
                "fuzzy threshold must be 0-100, got {threshold}"
            )));
        }
        let patterns = BROAD_PATTERNS
            .iter()
            .map(|(label, pattern)| {
                Regex::new(pattern)
                    .map(|re| (label.to_string(), re))
                    .map_err(|e| CourseScopeError::config(format!("invalid pattern '{pattern}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            phrases: BROAD_FUZZY_PHRASES.iter().map(|p| normalize(p)).collect(),
            fuzzy_enabled,
            threshold,
        })
    }

    pub fn evaluate(&self, course: &CourseRecord) -> BroadCandidate {
        let text = normalize(&course.text());

        let labels: BTreeSet<&str> = self
            .patterns
            .iter()
            .filter(|(_, re)| re.is_match(&text))
            .map(|(label, _)| label.as_str())
            .collect();

        let (best_phrase, fuzzy_score) = if self.fuzzy_enabled && !text.is_empty() {
            fuzzy::best_match(&text, &self.phrases).unwrap_or(("", 0))
        } else {
            ("", 0)
        };
        let fuzzy_hit = self.fuzzy_enabled && !best_phrase.is_empty() && fuzzy_score >= self.threshold;
        let fuzzy_phrase = if fuzzy_hit { best_phrase.to_string() } else { String::new() };

        let reason = if !labels.is_empty() {
            labels.into_iter().collect::<Vec<_>>().join(",")
        } else if fuzzy_hit {
            format!("fuzzy:{fuzzy_phrase}")
        } else {
            String::new()
        };

        BroadCandidate {
            course: course.clone(),
            is_ai_candidate: !reason.is_empty(),
            reason,
            fuzzy_phrase,
            fuzzy_score,
        }
    }
}

/// Candidates unique by (prefix, number), first occurrence kept, sorted by
/// prefix then number.
#[instrument(skip_all, fields(courses = courses.len(), threshold = threshold))]
pub fn broad_candidates(
    courses: &[CourseRecord],
    fuzzy_enabled: bool,
    threshold: u8,
) -> Result<Vec<BroadCandidate>> {
    let classifier = BroadClassifier::new(fuzzy_enabled, threshold)?;

    let mut seen = HashSet::new();
    let mut candidates: Vec<BroadCandidate> = courses
        .iter()
        .map(|c| classifier.evaluate(c))
        .filter(|c| c.is_ai_candidate)
        .filter(|c| seen.insert((c.course.prefix.clone(), c.course.number.clone())))
        .collect();

    candidates.sort_by(|a, b| a.course.course_key().cmp(&b.course.course_key()));
    info!(candidates = candidates.len(), "broad search complete");
    Ok(candidates)
}
