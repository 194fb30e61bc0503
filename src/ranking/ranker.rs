//! Composite scoring of nearest-neighbour candidates

use std::cmp::Ordering;

use tracing::debug;

use super::context_tokens;
use crate::config::RankingConfig;
use crate::config::WEIGHT_SUM_TOLERANCE;
use crate::corpus::Neighbor;
use crate::errors::JokeError;
use crate::errors::Result;
use crate::models::FeedbackStats;
use crate::models::Joke;
use crate::models::RankedCandidate;

const FEEDBACK_EPSILON: f64 = 1e-9;

/// Confidence assumed for a joke nobody has rated yet
pub const NEUTRAL_FEEDBACK: f32 = 0.5;

/// Weights of the three score components; non-negative, summing to 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    pub similarity: f32,
    pub feedback: f32,
    pub context: f32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            similarity: 0.7,
            feedback: 0.2,
            context: 0.1,
        }
    }
}

impl RankingWeights {
    pub fn new(similarity: f32, feedback: f32, context: f32) -> Result<Self> {
        let weights = Self {
            similarity,
            feedback,
            context,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<()> {
        let all = [self.similarity, self.feedback, self.context];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(JokeError::Config(format!(
                "ranking weights must be finite and non-negative, got {all:?}"
            )));
        }
        let sum: f32 = all.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(JokeError::Config(format!(
                "ranking weights must sum to 1, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Scores candidates; pure and deterministic
#[derive(Debug, Clone)]
pub struct Ranker {
    weights: RankingWeights,
    min_similarity: f32,
}

impl Default for Ranker {
    fn default() -> Self {
        Self {
            weights: RankingWeights::default(),
            min_similarity: RankingConfig::default().min_similarity,
        }
    }
}

impl Ranker {
    pub const fn new(weights: RankingWeights, min_similarity: f32) -> Self {
        Self {
            weights,
            min_similarity,
        }
    }

    pub fn from_config(config: &RankingConfig) -> Result<Self> {
        let weights = RankingWeights::new(
            config.similarity_weight,
            config.feedback_weight,
            config.context_weight,
        )?;
        Ok(Self::new(weights, config.min_similarity))
    }

    pub const fn weights(&self) -> RankingWeights {
        self.weights
    }

    /// Score and order candidates, best first
    ///
    /// Candidates under the similarity floor are dropped; an empty result
    /// means nothing in the corpus resembles the query.
    pub fn rank(&self, candidates: Vec<Neighbor>, context: Option<&str>) -> Vec<RankedCandidate> {
        self.partition(candidates, context).0
    }

    /// Score and order every candidate, split into `(matches, below_floor)`
    ///
    /// Both halves keep the best-first order.
    pub fn partition(
        &self,
        candidates: Vec<Neighbor>,
        context: Option<&str>,
    ) -> (Vec<RankedCandidate>, Vec<RankedCandidate>) {
        let tokens = context.map(context_tokens).unwrap_or_default();

        let mut scored: Vec<RankedCandidate> = candidates
            .into_iter()
            .map(|(joke, distance)| self.score(joke, distance, &tokens))
            .collect();
        scored.sort_by(compare_ranked);

        let (matches, below_floor): (Vec<_>, Vec<_>) = scored
            .into_iter()
            .partition(|c| c.similarity >= self.min_similarity);

        debug!(
            "Ranked {} candidates, {} under the similarity floor ({} context tokens)",
            matches.len(),
            below_floor.len(),
            tokens.len()
        );
        (matches, below_floor)
    }

    /// Score one candidate against pre-tokenized context
    pub fn score(&self, joke: Joke, distance: f32, context_tokens: &[String]) -> RankedCandidate {
        let similarity = similarity_from_distance(distance);
        let feedback_confidence = feedback_confidence(joke.feedback());
        let tag_overlap = tag_overlap(&joke, context_tokens);

        let score = self.weights.similarity * similarity
            + self.weights.feedback * feedback_confidence
            + self.weights.context * tag_overlap;

        RankedCandidate {
            joke,
            distance,
            similarity,
            feedback_confidence,
            tag_overlap,
            score,
        }
    }
}

pub fn similarity_from_distance(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - distance).clamp(0.0, 1.0)
}

/// `likes / (likes + dislikes)`, neutral when there is no feedback
pub fn feedback_confidence(stats: FeedbackStats) -> f32 {
    if stats.total() == 0 {
        return NEUTRAL_FEEDBACK;
    }
    let likes = stats.like_count as f64;
    let dislikes = stats.dislike_count as f64;
    (likes / (likes + dislikes + FEEDBACK_EPSILON)) as f32
}

/// Share of context tokens naming one of the joke's tags or its category
pub fn tag_overlap(joke: &Joke, context_tokens: &[String]) -> f32 {
    if context_tokens.is_empty() {
        return 0.0;
    }
    let category = joke.category.to_lowercase();
    let hits = context_tokens
        .iter()
        .filter(|token| {
            **token == category || joke.tags.iter().any(|tag| tag.eq_ignore_ascii_case(token))
        })
        .count();
    hits as f32 / context_tokens.len() as f32
}

/// Score descending, then similarity descending, then id ascending
fn compare_ranked(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.similarity.total_cmp(&a.similarity))
        .then_with(|| a.joke.id.cmp(&b.joke.id))
}
