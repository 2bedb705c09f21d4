//! Keyword configuration for the classifiers.
//!
//! Every pattern list and threshold the matchers use lives in
//! [`KeywordConfig`]. Callers build one (usually from the `[classifier]`
//! config section) and pass it in explicitly.

use regex::Regex;

use coursescope_shared::{ClassifierConfig, CourseScopeError, Result};

use crate::text::normalize;

/// Explicit AI terms. Any hit marks a course as AI-related.
pub const PRIMARY_PATTERNS: &[&str] = &[
    r"\bartificial intelligence\b",
    r"\bmachine learning\b",
    r"\bdeep learning\b",
    r"\bgenerative ai\b",
    r"\blarge language models?\b",
    r"\bllm\b",
    r"\bgpt\b",
    r"\bchatgpt\b",
    r"\bneural networks?\b",
    r"\breinforcement learning\b",
    r"\bnatural language processing\b",
    r"\bnlp\b",
    r"\bcomputer vision\b",
    r"\bintelligent systems?\b",
    r"\bai\b",
    r"\bagentic\b",
    r"\bmulti agents?\b",
    r"\bintelligent agents?\b",
];

/// Ambiguous terms that only count next to a context term.
pub const SECONDARY_PATTERNS: &[&str] = &[
    r"\bethic(s|al)?\b",
    r"\bagents?\b",
    r"\bautonomous systems?\b",
];

/// Terms that unlock the secondary patterns.
pub const CONTEXT_PATTERNS: &[&str] = &[
    r"\bai\b",
    r"\bartificial intelligence\b",
    r"\bmachine learning\b",
    r"\bdeep learning\b",
    r"\bgenerative ai\b",
    r"\blarge language models?\b",
    r"\bllm\b",
    r"\bgpt\b",
    r"\bchatgpt\b",
    r"\bneural networks?\b",
    r"\bnatural language processing\b",
    r"\bnlp\b",
    r"\bcomputer vision\b",
    r"\bintelligent systems?\b",
];

/// Canonical phrases for typo-tolerant matching.
pub const FUZZY_PHRASES: &[&str] = &[
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "generative ai",
    "large language model",
    "neural network",
    "reinforcement learning",
    "natural language processing",
    "computer vision",
    "intelligent systems",
    "intelligent agent",
    "multi agent",
    "agentic",
];

/// Ethics terms. Never gated.
pub const ETHICS_PATTERNS: &[&str] = &[
    r"\bethic(s|al|ally)?\b",
    r"\bbioethic(s|al)?\b",
    r"\bmorals?\b",
    r"\bmorality\b",
    r"\bresponsible ai\b",
    r"\bprofessional responsibility\b",
];

pub const DEFAULT_FUZZY_THRESHOLD: u8 = 90;

/// Patterns and thresholds for [`crate::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordConfig {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    pub context: Vec<String>,
    /// Stored normalized.
    pub fuzzy_phrases: Vec<String>,
    pub ethics: Vec<String>,
    pub fuzzy_enabled: bool,
    /// Minimum partial-ratio score (0-100) for a fuzzy hit.
    pub fuzzy_threshold: u8,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            primary: owned(PRIMARY_PATTERNS),
            secondary: owned(SECONDARY_PATTERNS),
            context: owned(CONTEXT_PATTERNS),
            fuzzy_phrases: FUZZY_PHRASES.iter().map(|p| normalize(p)).collect(),
            ethics: owned(ETHICS_PATTERNS),
            fuzzy_enabled: true,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl KeywordConfig {
    /// Defaults overlaid with the `[classifier]` section.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let defaults = Self::default();
        Self {
            primary: config.primary_patterns.clone().unwrap_or(defaults.primary),
            secondary: config.secondary_patterns.clone().unwrap_or(defaults.secondary),
            context: config.context_patterns.clone().unwrap_or(defaults.context),
            fuzzy_phrases: config
                .fuzzy_phrases
                .as_ref()
                .map(|phrases| phrases.iter().map(|p| normalize(p)).collect())
                .unwrap_or(defaults.fuzzy_phrases),
            ethics: config.ethics_patterns.clone().unwrap_or(defaults.ethics),
            fuzzy_enabled: config.fuzzy_enabled,
            fuzzy_threshold: config.fuzzy_threshold,
        }
    }

    pub fn with_fuzzy_threshold(mut self, threshold: u8) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn without_fuzzy(mut self) -> Self {
        self.fuzzy_enabled = false;
        self
    }

    /// Reject thresholds outside 0-100.
    pub fn validate(&self) -> Result<()> {
        if self.fuzzy_threshold > 100 {
            return Err(CourseScopeError::validation(format!(
                "fuzzy threshold must be 0-100, got {}",
                self.fuzzy_threshold
            )));
        }
        Ok(())
    }
}

fn owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

/// A compiled list of patterns, kept with their source for reporting.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compile `patterns`. A bad user-supplied pattern is a config error.
    pub fn compile(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| CourseScopeError::config(format!("invalid pattern '{p}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// First matched text, in pattern order.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.patterns
            .iter()
            .find_map(|re| re.find(text))
            .map(|m| m.as_str())
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
