//! Curriculum classification for CourseScope.
//!
//! Tags crawled courses as AI-related and/or ethics-related.
//!
//! - [`matchers`]: the AI matcher chain (primary, context-gated, fuzzy) and the ethics rule set
//! - [`keywords`]: [`KeywordConfig`], every pattern list and threshold in one place
//! - [`classify`](mod@classify): the default classifier
//! - [`broad`]: the recall-oriented candidate search
//! - [`report`]: aggregates for the report files

pub mod broad;
pub mod classify;
pub mod fuzzy;
pub mod keywords;
pub mod matchers;
pub mod report;
pub mod text;

pub use broad::{BroadCandidate, BroadClassifier, DEFAULT_BROAD_FUZZY_THRESHOLD, broad_candidates};
pub use classify::{ClassificationRecord, Classifier, classify};
pub use keywords::{DEFAULT_FUZZY_THRESHOLD, KeywordConfig, PatternSet};
pub use matchers::{
    ContextGatedMatcher, EthicsMatcher, FuzzyMatcher, MatchHit, MatchTier, Matcher, MatcherChain,
    PrimaryMatcher,
};
pub use report::{GapEntry, PrefixTotal, Summary};
pub use text::normalize;
