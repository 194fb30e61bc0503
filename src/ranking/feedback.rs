//! Folds like/dislike signals into per-joke counters

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::corpus::CorpusStore;
use crate::corpus::RetryPolicy;
use crate::errors::Result;
use crate::models::FeedbackEvent;
use crate::models::FeedbackStats;
use crate::models::JokeId;

pub struct FeedbackAggregator {
    store: Arc<dyn CorpusStore>,
    retry: RetryPolicy,
}

impl FeedbackAggregator {
    pub fn new(store: Arc<dyn CorpusStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Add one like or dislike; the store applies it atomically
    ///
    /// # Errors
    /// - `NotFound` for unknown ids, with no counter or log change
    /// - `DependencyUnavailable` when the store does not answer in time
    pub async fn apply(
        &self,
        joke_id: JokeId,
        liked: bool,
        comment: Option<String>,
    ) -> Result<FeedbackStats> {
        let event = FeedbackEvent {
            joke_id,
            liked,
            comment: comment
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            created_at: Utc::now(),
        };

        let stats = self
            .retry
            .write("record_feedback", self.store.record_feedback(&event))
            .await?;

        info!(
            "Feedback on joke {}: {} (now {} likes, {} dislikes)",
            joke_id,
            if liked { "like" } else { "dislike" },
            stats.like_count,
            stats.dislike_count
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::MemoryStore;
    use crate::errors::JokeError;
    use crate::models::NewJoke;

    #[tokio::test]
    async fn test_apply_trims_comment_and_counts() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(NewJoke::new("a joke", "pun", &[]), vec![1.0, 0.0])
            .await
            .unwrap();
        let aggregator = FeedbackAggregator::new(store.clone(), RetryPolicy::default());

        let stats = aggregator
            .apply(1, true, Some("  lol  ".to_string()))
            .await
            .unwrap();
        assert_eq!(stats.like_count, 1);

        aggregator.apply(1, false, Some("   ".to_string())).await.unwrap();

        let events = store.feedback_events().await;
        assert_eq!(events[0].comment.as_deref(), Some("lol"));
        assert!(events[1].comment.is_none());
    }

    #[tokio::test]
    async fn test_apply_unknown_joke() {
        let store = Arc::new(MemoryStore::new());
        let aggregator = FeedbackAggregator::new(store, RetryPolicy::default());
        assert!(matches!(
            aggregator.apply(5, true, None).await,
            Err(JokeError::NotFound(5))
        ));
    }
}
