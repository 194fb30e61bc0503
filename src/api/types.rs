//! API request and response types

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::models::parse_joke_id;
use crate::models::Joke;
use crate::models::JokeId;
use crate::models::NewJoke;
use crate::models::RankedCandidate;
use crate::retrieval::SearchOutcome;
use crate::Result;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
}

/// Joke id as sent by clients: a decimal string or a bare integer
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JokeIdParam {
    Number(i64),
    Text(String),
}

impl JokeIdParam {
    pub fn resolve(&self) -> Result<JokeId> {
        match self {
            Self::Number(id) => Ok(*id),
            Self::Text(raw) => parse_joke_id(raw),
        }
    }
}

/// Feedback request
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub joke_id: JokeIdParam,
    pub liked: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: Option<String>,
    pub like_count: u64,
    pub dislike_count: u64,
}

/// Add-joke request
#[derive(Debug, Deserialize)]
pub struct AddJokeRequest {
    #[serde(default)]
    pub id: Option<JokeIdParam>,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl AddJokeRequest {
    pub fn into_new_joke(self) -> Result<NewJoke> {
        Ok(NewJoke {
            id: self.id.as_ref().map(JokeIdParam::resolve).transpose()?,
            text: self.text,
            category: self.category,
            tags: self.tags,
            source: self.source,
        })
    }
}

/// Joke response; ids leave the API as strings
#[derive(Debug, Serialize, Deserialize)]
pub struct JokeResponse {
    pub id: String,
    pub text: String,
    pub category: String,
    pub tags: Vec<String>,
    pub source: Option<String>,
    pub like_count: u64,
    pub dislike_count: u64,
    pub created_at: DateTime<Utc>,
}

impl From<Joke> for JokeResponse {
    fn from(joke: Joke) -> Self {
        Self {
            id: joke.id.to_string(),
            text: joke.text,
            category: joke.category,
            tags: joke.tags,
            source: joke.source,
            like_count: joke.like_count,
            dislike_count: joke.dislike_count,
            created_at: joke.created_at,
        }
    }
}

/// One search hit in the flattened wire form
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub joke_id: String,
    pub text: String,
    pub category: String,
    pub tags: Vec<String>,
    pub score: f32,
    pub similarity: f32,
    pub is_clarification_needed: bool,
    pub clarification_prompt: Option<String>,
}

impl SearchResultItem {
    fn from_candidate(candidate: RankedCandidate, prompt: Option<&str>) -> Self {
        Self {
            joke_id: candidate.joke.id.to_string(),
            text: candidate.joke.text,
            category: candidate.joke.category,
            tags: candidate.joke.tags,
            score: candidate.score,
            similarity: candidate.similarity,
            is_clarification_needed: prompt.is_some(),
            clarification_prompt: prompt.map(str::to_string),
        }
    }
}

pub const NO_MATCH_MESSAGE: &str = "Sorry, I couldn't find a joke matching your query.";

/// Search response
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    /// `results`, `clarification` or `no_match`
    pub outcome: String,
    pub results: Vec<SearchResultItem>,
    #[serde(default)]
    pub clarification_prompt: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        let kind = outcome.kind().to_string();
        match outcome {
            SearchOutcome::Results(candidates) => Self {
                outcome: kind,
                results: candidates
                    .into_iter()
                    .map(|c| SearchResultItem::from_candidate(c, None))
                    .collect(),
                clarification_prompt: None,
                categories: Vec::new(),
                message: None,
            },
            SearchOutcome::Clarification {
                prompt,
                categories,
                candidates,
            } => Self {
                outcome: kind,
                results: candidates
                    .into_iter()
                    .map(|c| SearchResultItem::from_candidate(c, Some(&prompt)))
                    .collect(),
                clarification_prompt: Some(prompt),
                categories,
                message: None,
            },
            SearchOutcome::NoMatch => Self {
                outcome: kind,
                results: Vec::new(),
                clarification_prompt: None,
                categories: Vec::new(),
                message: Some(NO_MATCH_MESSAGE.to_string()),
            },
        }
    }
}
