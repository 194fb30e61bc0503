//! Corpus store: joke records, embeddings and feedback counters
//!
//! Two implementations share the [`CorpusStore`] contract:
//! - [`MemoryStore`]: in-process, exact cosine scan, atomic counters
//! - [`crate::database::Database`]: PostgreSQL with pgvector
//!
//! Distance is always cosine distance (`1 - cosine similarity`). Ranking and
//! clarification thresholds are tuned against it.

pub mod memory;
pub mod retry;

use async_trait::async_trait;
pub use memory::MemoryStore;
pub use retry::RetryPolicy;

use crate::errors::Result;
use crate::models::CorpusStats;
use crate::models::FeedbackEvent;
use crate::models::FeedbackStats;
use crate::models::Joke;
use crate::models::JokeId;
use crate::models::NewJoke;
use crate::models::QueryLog;

/// A nearest-neighbour hit: the joke and its cosine distance to the query
pub type Neighbor = (Joke, f32);

#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Up to `k` jokes ordered by ascending cosine distance, ties by ascending id
    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Store a normalized joke with its embedding
    ///
    /// Fails with `DuplicateId` when the requested id is taken.
    async fn insert(&self, joke: NewJoke, embedding: Vec<f32>) -> Result<Joke>;

    /// Fails with `NotFound` for unknown ids
    async fn get(&self, id: JokeId) -> Result<Joke>;

    /// Atomically bump one counter and append the event
    ///
    /// Unknown ids fail with `NotFound` and change nothing.
    async fn record_feedback(&self, event: &FeedbackEvent) -> Result<FeedbackStats>;

    async fn random(&self) -> Result<Option<Joke>>;

    /// Exact text match, used by the bulk loader to skip duplicates
    async fn find_by_text(&self, text: &str) -> Result<Option<Joke>>;

    async fn log_query(&self, log: &QueryLog) -> Result<()>;

    async fn stats(&self) -> Result<CorpusStats>;

    /// Dimension shared by every stored embedding, if known
    async fn embedding_dimension(&self) -> Result<Option<usize>>;
}

/// Order neighbours by ascending distance, then ascending id
pub fn sort_neighbors(neighbors: &mut [Neighbor]) {
    neighbors.sort_by(|(a, da), (b, db)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn joke(id: JokeId) -> Joke {
        Joke {
            id,
            text: format!("joke {id}"),
            category: "general".to_string(),
            tags: Vec::new(),
            source: None,
            embedding: Vec::new(),
            like_count: 0,
            dislike_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sort_neighbors_ties_by_id() {
        let mut neighbors = vec![(joke(3), 0.2), (joke(1), 0.2), (joke(2), 0.1)];
        sort_neighbors(&mut neighbors);
        let ids: Vec<JokeId> = neighbors.iter().map(|(j, _)| j.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
