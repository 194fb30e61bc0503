//! Retrieval pipeline: embed -> nearest -> rank -> clarify

pub mod pipeline;

use serde::Deserialize;
use serde::Serialize;

pub use pipeline::open_store;
pub use pipeline::JokeService;

use crate::models::RankedCandidate;

/// One search call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub context: Option<String>,
    /// Defaults to 1; must be positive
    #[serde(default, alias = "maxResults")]
    pub max_results: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// Result of a search; ambiguity and emptiness are outcomes, not errors
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Results(Vec<RankedCandidate>),
    Clarification {
        prompt: String,
        categories: Vec<String>,
        candidates: Vec<RankedCandidate>,
    },
    NoMatch,
}

impl SearchOutcome {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Results(_) => "results",
            Self::Clarification { .. } => "clarification",
            Self::NoMatch => "no_match",
        }
    }

    /// Candidates carried by the outcome, best first
    pub fn candidates(&self) -> &[RankedCandidate] {
        match self {
            Self::Results(candidates) | Self::Clarification { candidates, .. } => candidates,
            Self::NoMatch => &[],
        }
    }

    pub const fn needs_clarification(&self) -> bool {
        matches!(self, Self::Clarification { .. })
    }
}
