//! Text preprocessing utilities for embedding generation
//!
//! Cleans and normalizes query and joke text before it reaches the model, so
//! that the same joke embedded at ingestion and queried later produces the
//! same input string.

use tracing::debug;
use tracing::warn;

use crate::errors::JokeError;

/// Longest text (in characters) handed to the model
pub const MAX_EMBEDDING_CHARS: usize = 2000;

/// Preprocess text for embedding generation
///
/// - Normalizes whitespace and newlines
/// - Removes control characters
/// - Truncates long text at a word boundary
pub fn preprocess_text_for_embedding(text: &str) -> Result<String, JokeError> {
    if text.trim().is_empty() {
        return Err(JokeError::InvalidInput(
            "text to embed must not be empty".to_string(),
        ));
    }

    let sanitized = sanitize_text(&normalize_whitespace(text));

    if sanitized.is_empty() {
        return Err(JokeError::InvalidInput(
            "text contains only whitespace or control characters".to_string(),
        ));
    }

    let char_count = sanitized.chars().count();
    if char_count > MAX_EMBEDDING_CHARS {
        warn!(
            "Text too long ({} chars), truncating to {}",
            char_count, MAX_EMBEDDING_CHARS
        );
        return Ok(smart_truncate_text(&sanitized, MAX_EMBEDDING_CHARS));
    }

    debug!(
        "Preprocessed text: {} -> {} chars",
        text.len(),
        sanitized.len()
    );
    Ok(sanitized)
}

/// Normalize whitespace and newlines
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Replace control characters with spaces and collapse the result
fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Truncate to at most `max_chars` characters, preferring a word boundary
fn smart_truncate_text(text: &str, max_chars: usize) -> String {
    let truncated: String = text.chars().take(max_chars).collect();
    if truncated.len() == text.len() {
        return truncated;
    }

    if let Some(last_space) = truncated.rfind(' ') {
        // Only use word boundary if it's not too far back
        if last_space > truncated.len() * 3 / 4 {
            return truncated[..last_space].to_string();
        }
    }

    truncated
}
