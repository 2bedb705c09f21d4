//! AI matcher strategies and the ordered chain that runs them.

use serde::Serialize;

use coursescope_shared::Result;

use crate::fuzzy;
use crate::keywords::{KeywordConfig, PatternSet};

// ---------------------------------------------------------------------------
// Hits
// ---------------------------------------------------------------------------

/// Which matcher tier fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Primary,
    ContextGated,
    Fuzzy,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::ContextGated => "context_gated",
            Self::Fuzzy => "fuzzy",
        }
    }
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A positive match: the tier, what fired, and the fuzzy score if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchHit {
    pub tier: MatchTier,
    pub term: String,
    pub score: Option<u8>,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One matching strategy over normalized text.
///
/// Matchers are tried in chain order; the first hit wins.
pub trait Matcher: Send + Sync {
    /// Inspect normalized text. `None` means no opinion.
    fn check(&self, text: &str) -> Option<MatchHit>;

    /// Matcher name for tracing.
    fn name(&self) -> &str;
}

/// Explicit AI terms.
pub struct PrimaryMatcher {
    patterns: PatternSet,
}

impl PrimaryMatcher {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns }
    }
}

impl Matcher for PrimaryMatcher {
    fn check(&self, text: &str) -> Option<MatchHit> {
        self.patterns.find(text).map(|term| MatchHit {
            tier: MatchTier::Primary,
            term: term.to_string(),
            score: None,
        })
    }

    fn name(&self) -> &str {
        "primary"
    }
}

/// Ambiguous terms that count only when a context term is also present.
pub struct ContextGatedMatcher {
    terms: PatternSet,
    context: PatternSet,
}

impl ContextGatedMatcher {
    pub fn new(terms: PatternSet, context: PatternSet) -> Self {
        Self { terms, context }
    }
}

impl Matcher for ContextGatedMatcher {
    fn check(&self, text: &str) -> Option<MatchHit> {
        let term = self.terms.find(text)?;
        self.context.is_match(text).then(|| MatchHit {
            tier: MatchTier::ContextGated,
            term: term.to_string(),
            score: None,
        })
    }

    fn name(&self) -> &str {
        "context_gated"
    }
}

/// Typo-tolerant match of canonical phrases.
pub struct FuzzyMatcher {
    phrases: Vec<String>,
    threshold: u8,
}

impl FuzzyMatcher {
    /// `phrases` must already be normalized.
    pub fn new(phrases: Vec<String>, threshold: u8) -> Self {
        Self { phrases, threshold }
    }

    /// Best phrase and score, regardless of threshold.
    pub fn best(&self, text: &str) -> Option<(&str, u8)> {
        if text.is_empty() {
            return None;
        }
        fuzzy::best_match(text, &self.phrases)
    }
}

impl Matcher for FuzzyMatcher {
    fn check(&self, text: &str) -> Option<MatchHit> {
        let (phrase, score) = self.best(text)?;
        (score >= self.threshold).then(|| MatchHit {
            tier: MatchTier::Fuzzy,
            term: phrase.to_string(),
            score: Some(score),
        })
    }

    fn name(&self) -> &str {
        "fuzzy"
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Matchers in priority order: primary, context-gated, then fuzzy.
pub struct MatcherChain {
    matchers: Vec<Box<dyn Matcher>>,
}

impl MatcherChain {
    /// Build the chain from a keyword config. Fuzzy is left out when disabled.
    pub fn from_keywords(keywords: &KeywordConfig) -> Result<Self> {
        keywords.validate()?;

        let mut matchers: Vec<Box<dyn Matcher>> = vec![
            Box::new(PrimaryMatcher::new(PatternSet::compile(&keywords.primary)?)),
            Box::new(ContextGatedMatcher::new(
                PatternSet::compile(&keywords.secondary)?,
                PatternSet::compile(&keywords.context)?,
            )),
        ];
        if keywords.fuzzy_enabled {
            matchers.push(Box::new(FuzzyMatcher::new(
                keywords.fuzzy_phrases.clone(),
                keywords.fuzzy_threshold,
            )));
        }
        Ok(Self { matchers })
    }

    /// First hit in chain order.
    pub fn check(&self, text: &str) -> Option<MatchHit> {
        if text.is_empty() {
            return None;
        }
        self.matchers.iter().find_map(|m| m.check(text))
    }

    /// Matcher names in order.
    pub fn names(&self) -> Vec<&str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }
}

/// Ungated ethics rule set.
pub struct EthicsMatcher {
    patterns: PatternSet,
}

impl EthicsMatcher {
    pub fn from_keywords(keywords: &KeywordConfig) -> Result<Self> {
        Ok(Self {
            patterns: PatternSet::compile(&keywords.ethics)?,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.is_match(text)
    }
}
