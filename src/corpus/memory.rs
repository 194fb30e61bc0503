//! In-process corpus store
//!
//! Jokes live in a sharded `DashMap`; each entry carries atomic counters so
//! feedback on one joke never blocks reads or feedback on another, and two
//! concurrent increments on the same joke both land.

use std::collections::BTreeSet;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::seq::IteratorRandom;
use tokio::sync::RwLock;
use tracing::debug;

use super::sort_neighbors;
use super::CorpusStore;
use super::Neighbor;
use crate::embeddings::cosine_distance;
use crate::errors::JokeError;
use crate::errors::Result;
use crate::models::CorpusStats;
use crate::models::FeedbackEvent;
use crate::models::FeedbackStats;
use crate::models::Joke;
use crate::models::JokeId;
use crate::models::NewJoke;
use crate::models::QueryLog;

struct JokeEntry {
    id: JokeId,
    text: String,
    category: String,
    tags: Vec<String>,
    source: Option<String>,
    embedding: Vec<f32>,
    created_at: DateTime<Utc>,
    likes: AtomicU64,
    dislikes: AtomicU64,
}

impl JokeEntry {
    fn snapshot(&self) -> Joke {
        Joke {
            id: self.id,
            text: self.text.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
            source: self.source.clone(),
            embedding: self.embedding.clone(),
            like_count: self.likes.load(Ordering::Acquire),
            dislike_count: self.dislikes.load(Ordering::Acquire),
            created_at: self.created_at,
        }
    }
}

/// Corpus store held entirely in memory
pub struct MemoryStore {
    jokes: DashMap<JokeId, Arc<JokeEntry>>,
    /// Ids start at 1
    next_id: AtomicI64,
    dimension: OnceLock<usize>,
    feedback_log: RwLock<Vec<FeedbackEvent>>,
    query_log: RwLock<Vec<QueryLog>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            jokes: DashMap::new(),
            next_id: AtomicI64::new(1),
            dimension: OnceLock::new(),
            feedback_log: RwLock::new(Vec::new()),
            query_log: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.jokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jokes.is_empty()
    }

    /// Copy of the append-only feedback log
    pub async fn feedback_events(&self) -> Vec<FeedbackEvent> {
        self.feedback_log.read().await.clone()
    }

    /// Copy of the query log
    pub async fn query_logs(&self) -> Vec<QueryLog> {
        self.query_log.read().await.clone()
    }

    /// Set counters directly, for seeding fixtures and imports
    pub fn set_feedback(&self, id: JokeId, stats: FeedbackStats) -> Result<()> {
        let entry = self.entry(id)?;
        entry.likes.store(stats.like_count, Ordering::Release);
        entry.dislikes.store(stats.dislike_count, Ordering::Release);
        Ok(())
    }

    fn entry(&self, id: JokeId) -> Result<Arc<JokeEntry>> {
        self.jokes
            .get(&id)
            .map(|e| Arc::clone(e.value()))
            .ok_or(JokeError::NotFound(id))
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        let expected = *self.dimension.get_or_init(|| len);
        if expected == len {
            Ok(())
        } else {
            Err(JokeError::InvalidInput(format!(
                "embedding has {len} dimensions, corpus uses {expected}"
            )))
        }
    }
}

#[async_trait]
impl CorpusStore for MemoryStore {
    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(JokeError::InvalidInput("k must be positive".to_string()));
        }
        if let Some(expected) = self.dimension.get() {
            if *expected != query.len() {
                return Err(JokeError::InvalidInput(format!(
                    "query has {} dimensions, corpus uses {expected}",
                    query.len()
                )));
            }
        }

        let mut scored: Vec<(Arc<JokeEntry>, f32)> = self
            .jokes
            .iter()
            .map(|e| {
                let entry = Arc::clone(e.value());
                let distance = cosine_distance(query, &entry.embedding);
                (entry, distance)
            })
            .collect();

        scored.sort_by(|(a, da), (b, db)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));
        scored.truncate(k);

        let mut neighbors: Vec<Neighbor> = scored
            .into_iter()
            .map(|(entry, distance)| (entry.snapshot(), distance))
            .collect();
        sort_neighbors(&mut neighbors);

        debug!("Memory store returned {} neighbours", neighbors.len());
        Ok(neighbors)
    }

    async fn insert(&self, joke: NewJoke, embedding: Vec<f32>) -> Result<Joke> {
        if embedding.is_empty() {
            return Err(JokeError::InvalidInput(
                "embedding must not be empty".to_string(),
            ));
        }
        self.check_dimension(embedding.len())?;

        let category = joke.category_or_default().to_string();
        let make_entry = |id: JokeId| {
            Arc::new(JokeEntry {
                id,
                text: joke.text.clone(),
                category: category.clone(),
                tags: joke.tags.clone(),
                source: joke.source.clone(),
                embedding: embedding.clone(),
                created_at: Utc::now(),
                likes: AtomicU64::new(0),
                dislikes: AtomicU64::new(0),
            })
        };

        let entry = if let Some(id) = joke.id {
            match self.jokes.entry(id) {
                Entry::Occupied(_) => return Err(JokeError::DuplicateId(id)),
                Entry::Vacant(slot) => {
                    let entry = make_entry(id);
                    slot.insert(Arc::clone(&entry));
                    self.next_id.fetch_max(id + 1, Ordering::AcqRel);
                    entry
                }
            }
        } else {
            loop {
                let id = self.next_id.fetch_add(1, Ordering::AcqRel);
                // Explicit ids may already occupy part of the sequence
                if let Entry::Vacant(slot) = self.jokes.entry(id) {
                    let entry = make_entry(id);
                    slot.insert(Arc::clone(&entry));
                    break entry;
                }
            }
        };

        Ok(entry.snapshot())
    }

    async fn get(&self, id: JokeId) -> Result<Joke> {
        Ok(self.entry(id)?.snapshot())
    }

    async fn record_feedback(&self, event: &FeedbackEvent) -> Result<FeedbackStats> {
        let entry = self.entry(event.joke_id)?;

        let stats = if event.liked {
            FeedbackStats {
                like_count: entry.likes.fetch_add(1, Ordering::AcqRel) + 1,
                dislike_count: entry.dislikes.load(Ordering::Acquire),
            }
        } else {
            FeedbackStats {
                like_count: entry.likes.load(Ordering::Acquire),
                dislike_count: entry.dislikes.fetch_add(1, Ordering::AcqRel) + 1,
            }
        };

        self.feedback_log.write().await.push(event.clone());
        Ok(stats)
    }

    async fn random(&self) -> Result<Option<Joke>> {
        let picked = self
            .jokes
            .iter()
            .choose(&mut rand::thread_rng())
            .map(|e| Arc::clone(e.value()));
        Ok(picked.map(|entry| entry.snapshot()))
    }

    async fn find_by_text(&self, text: &str) -> Result<Option<Joke>> {
        let needle = text.trim();
        Ok(self
            .jokes
            .iter()
            .filter(|e| e.value().text == needle)
            .map(|e| Arc::clone(e.value()))
            .min_by_key(|entry| entry.id)
            .map(|entry| entry.snapshot()))
    }

    async fn log_query(&self, log: &QueryLog) -> Result<()> {
        self.query_log.write().await.push(log.clone());
        Ok(())
    }

    async fn stats(&self) -> Result<CorpusStats> {
        let tags: BTreeSet<String> = self
            .jokes
            .iter()
            .flat_map(|e| e.value().tags.clone())
            .collect();

        Ok(CorpusStats {
            total_jokes: self.jokes.len() as u64,
            total_tags: tags.len() as u64,
            total_feedback: self.feedback_log.read().await.len() as u64,
            total_queries: self.query_log.read().await.len() as u64,
        })
    }

    async fn embedding_dimension(&self) -> Result<Option<usize>> {
        Ok(self.dimension.get().copied())
    }
}
