use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::JokeError;
use crate::Result;

/// Category assigned when ingestion does not name one
pub const DEFAULT_CATEGORY: &str = "general";

/// Stable joke identifier
pub type JokeId = i64;

/// Parse an identifier received as a string at the API boundary
pub fn parse_joke_id(raw: &str) -> Result<JokeId> {
    raw.trim()
        .parse::<JokeId>()
        .map_err(|_| JokeError::InvalidInput(format!("joke id must be an integer, got '{raw}'")))
}

/// A joke record with its embedding and feedback counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joke {
    pub id: JokeId,
    pub text: String,
    pub category: String,
    /// Sorted, unique
    pub tags: Vec<String>,
    pub source: Option<String>,
    #[serde(skip_serializing, default)]
    pub embedding: Vec<f32>,
    pub like_count: u64,
    pub dislike_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Joke {
    pub fn feedback(&self) -> FeedbackStats {
        FeedbackStats {
            like_count: self.like_count,
            dislike_count: self.dislike_count,
        }
    }
}

/// Ingestion request; the store assigns an id when none is given
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJoke {
    #[serde(default)]
    pub id: Option<JokeId>,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl NewJoke {
    pub fn new(text: impl Into<String>, category: impl Into<String>, tags: &[&str]) -> Self {
        Self {
            id: None,
            text: text.into(),
            category: Some(category.into()),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: JokeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Validate and canonicalize text, category and tags
    pub fn normalized(self) -> Result<Self> {
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(JokeError::InvalidInput(
                "joke text must not be empty".to_string(),
            ));
        }

        let category = self
            .category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        Ok(Self {
            id: self.id,
            text,
            category: Some(category),
            tags: normalize_tags(&self.tags),
            source: self
                .source
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }

    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }
}

/// Trim, lowercase, deduplicate and sort tags, dropping empty ones
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut out: Vec<String> = tags
        .iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Like/dislike counters for one joke
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub like_count: u64,
    pub dislike_count: u64,
}

impl FeedbackStats {
    pub fn total(&self) -> u64 {
        self.like_count + self.dislike_count
    }
}

/// Append-only user feedback record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub joke_id: JokeId,
    pub liked: bool,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Diagnostic record of one search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLog {
    pub query: String,
    pub context: Option<String>,
    pub returned_ids: Vec<JokeId>,
    pub clarification_needed: bool,
    pub relevance_score: Option<f32>,
    pub created_at: DateTime<Utc>,
}

/// A joke scored against one query, discarded after the response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub joke: Joke,
    pub distance: f32,
    pub similarity: f32,
    pub feedback_confidence: f32,
    pub tag_overlap: f32,
    pub score: f32,
}

/// Aggregate counts over the corpus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_jokes: u64,
    pub total_tags: u64,
    pub total_feedback: u64,
    pub total_queries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_joke_id() {
        assert_eq!(parse_joke_id("123").unwrap(), 123);
        assert_eq!(parse_joke_id(" 42 ").unwrap(), 42);
        assert!(matches!(
            parse_joke_id("abc"),
            Err(JokeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(&["Pun", "food", " pun ", "", "Food"]);
        assert_eq!(tags, vec!["food".to_string(), "pun".to_string()]);
    }

    #[test]
    fn test_new_joke_normalized_defaults_category() {
        let joke = NewJoke {
            id: None,
            text: "  What do you call a fake noodle? An impasta!  ".to_string(),
            category: Some("   ".to_string()),
            tags: vec!["Food".to_string()],
            source: Some(String::new()),
        }
        .normalized()
        .unwrap();

        assert_eq!(joke.text, "What do you call a fake noodle? An impasta!");
        assert_eq!(joke.category_or_default(), DEFAULT_CATEGORY);
        assert_eq!(joke.tags, vec!["food".to_string()]);
        assert!(joke.source.is_none());
    }

    #[test]
    fn test_new_joke_rejects_blank_text() {
        let result = NewJoke::new(" \n\t ", "pun", &[]).normalized();
        assert!(matches!(result, Err(JokeError::InvalidInput(_))));
    }

    #[test]
    fn test_feedback_total() {
        let stats = FeedbackStats {
            like_count: 2,
            dislike_count: 1,
        };
        assert_eq!(stats.total(), 3);
    }
}
