//! Scoring, ambiguity detection and feedback folding

pub mod clarification;
pub mod feedback;
pub mod ranker;

pub use clarification::ClarificationDecision;
pub use clarification::ClarificationPolicy;
pub use feedback::FeedbackAggregator;
pub use ranker::Ranker;
pub use ranker::RankingWeights;

/// Lowercased words in order of appearance
///
/// Splits on anything that is neither alphanumeric nor `-`/`_`, so tags like
/// `knock-knock` survive as one token.
pub fn word_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercased, de-duplicated context tokens
pub fn context_tokens(context: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in word_tokens(context) {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}
