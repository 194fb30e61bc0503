//! Decides when a ranked list is too uncertain to answer directly

use std::collections::BTreeSet;

use super::word_tokens;
use crate::config::ClarificationConfig;
use crate::models::RankedCandidate;

pub const VAGUE_QUERY_PROMPT: &str = "Could you be more specific about the kind of joke you want?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarificationDecision {
    /// Confident enough to answer
    Clear,
    /// Ask the user to narrow the request
    Ambiguous {
        prompt: String,
        categories: Vec<String>,
    },
    /// Nothing to rank
    Empty,
}

impl ClarificationDecision {
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ClarificationPolicy {
    confidence_floor: f32,
    min_separation: f32,
    prompt_top_k: usize,
    literal_match_override: bool,
}

impl Default for ClarificationPolicy {
    fn default() -> Self {
        Self::from_config(&ClarificationConfig::default())
    }
}

impl ClarificationPolicy {
    pub fn from_config(config: &ClarificationConfig) -> Self {
        Self {
            confidence_floor: config.confidence_floor,
            min_separation: config.min_separation,
            prompt_top_k: config.prompt_top_k.max(1),
            literal_match_override: config.literal_match_override,
        }
    }

    /// Inspect `ranked` (best first) for the query that produced it
    pub fn decide(&self, query: &str, ranked: &[RankedCandidate]) -> ClarificationDecision {
        let low_confidence = ranked
            .first()
            .is_some_and(|top| top.score < self.confidence_floor);
        self.judge(query, ranked, low_confidence)
    }

    /// Decide for candidates that all fell under the similarity floor
    ///
    /// They count as low confidence whatever their composite score.
    pub fn decide_below_floor(
        &self,
        query: &str,
        ranked: &[RankedCandidate],
    ) -> ClarificationDecision {
        self.judge(query, ranked, true)
    }

    fn judge(
        &self,
        query: &str,
        ranked: &[RankedCandidate],
        low_confidence: bool,
    ) -> ClarificationDecision {
        let Some(top) = ranked.first() else {
            return ClarificationDecision::Empty;
        };

        let too_close = ranked
            .get(1)
            .is_some_and(|second| top.score - second.score < self.min_separation);

        // A literal hit only vouches for a weak top score, never for a tie
        let weak = low_confidence
            && !(self.literal_match_override && contains_query(&top.joke.text, query));

        if !(weak || too_close) {
            return ClarificationDecision::Clear;
        }

        let labels = self.labels(ranked);
        ClarificationDecision::Ambiguous {
            prompt: clarification_prompt(&labels),
            categories: labels,
        }
    }

    /// Distinct categories of the top candidates, widened to tags when fewer than two
    fn labels(&self, ranked: &[RankedCandidate]) -> Vec<String> {
        let top = &ranked[..ranked.len().min(self.prompt_top_k)];

        let categories: BTreeSet<String> = top
            .iter()
            .map(|c| c.joke.category.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        if categories.len() >= 2 {
            return categories.into_iter().collect();
        }

        let mut labels = categories;
        labels.extend(
            top.iter()
                .flat_map(|c| c.joke.tags.iter())
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty()),
        );
        labels.into_iter().collect()
    }
}

/// "Did you mean a joke about A, B or C?"
pub fn clarification_prompt(labels: &[String]) -> String {
    match labels {
        [] => VAGUE_QUERY_PROMPT.to_string(),
        [only] => format!("Did you mean a joke about {only}?"),
        [init @ .., last] => format!("Did you mean a joke about {} or {last}?", init.join(", ")),
    }
}

/// Whether the query's words appear as a contiguous run of whole words in `text`
fn contains_query(text: &str, query: &str) -> bool {
    let needle = word_tokens(query);
    if needle.is_empty() {
        return false;
    }
    word_tokens(text)
        .windows(needle.len())
        .any(|window| window == needle.as_slice())
}
