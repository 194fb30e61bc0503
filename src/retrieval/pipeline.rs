//! Joke service: the one object the transports talk to

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::SearchOutcome;
use super::SearchRequest;
use crate::config::AppConfig;
use crate::corpus::CorpusStore;
use crate::corpus::MemoryStore;
use crate::corpus::RetryPolicy;
use crate::database::Database;
use crate::embeddings::EmbeddingService;
use crate::errors::JokeError;
use crate::errors::Result;
use crate::models::CorpusStats;
use crate::models::FeedbackStats;
use crate::models::Joke;
use crate::models::JokeId;
use crate::models::NewJoke;
use crate::models::QueryLog;
use crate::models::RankedCandidate;
use crate::ranking::ClarificationDecision;
use crate::ranking::ClarificationPolicy;
use crate::ranking::FeedbackAggregator;
use crate::ranking::Ranker;

/// Open the store selected by `database.backend`
///
/// # Errors
/// - Connection errors for the postgres backend
/// - `Config` when the postgres schema has not been initialized
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn CorpusStore>> {
    if config.uses_postgres() {
        let database = Database::from_config(config).await?;
        database.verify_schema_or_error().await?;
        Ok(Arc::new(database))
    } else {
        info!("Using in-memory corpus store");
        Ok(Arc::new(MemoryStore::new()))
    }
}

pub struct JokeService {
    store: Arc<dyn CorpusStore>,
    embedder: Arc<EmbeddingService>,
    ranker: Ranker,
    clarification: ClarificationPolicy,
    feedback: FeedbackAggregator,
    retry: RetryPolicy,
    candidate_pool: usize,
    max_results_cap: usize,
}

impl JokeService {
    /// Wire the pipeline over an existing store and embedder
    ///
    /// # Errors
    /// - `Config` when ranking weights are invalid or the stored embeddings
    ///   have a different dimension than the embedder produces
    pub async fn new(
        config: &AppConfig,
        store: Arc<dyn CorpusStore>,
        embedder: Arc<EmbeddingService>,
    ) -> Result<Self> {
        let ranker = Ranker::from_config(&config.ranking)?;
        let retry = RetryPolicy::from_config(&config.database);

        let stored = retry
            .read("embedding_dimension", || store.embedding_dimension())
            .await?;
        if let Some(stored) = stored {
            if stored != embedder.dimension() {
                return Err(JokeError::Config(format!(
                    "corpus embeddings have {stored} dimensions but model '{}' produces {}",
                    embedder.model(),
                    embedder.dimension()
                )));
            }
        }

        info!(
            "Joke service ready (model: {}, dimension: {})",
            embedder.model(),
            embedder.dimension()
        );

        Ok(Self {
            feedback: FeedbackAggregator::new(Arc::clone(&store), retry),
            clarification: ClarificationPolicy::from_config(&config.clarification),
            candidate_pool: config.ranking.candidate_pool.max(1),
            max_results_cap: config.ranking.max_results_cap.max(1),
            store,
            embedder,
            ranker,
            retry,
        })
    }

    /// Build store, embedder and pipeline from configuration
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let store = open_store(config).await?;
        let embedder = Arc::new(EmbeddingService::new(config)?);
        Self::new(config, store, embedder).await
    }

    pub fn store(&self) -> &Arc<dyn CorpusStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<EmbeddingService> {
        &self.embedder
    }

    /// Find the best joke(s) for a query
    ///
    /// # Errors
    /// - `InvalidInput` for an empty query or `max_results == 0`
    /// - `DependencyUnavailable` when the embedder or store cannot answer
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(JokeError::InvalidInput("query must not be empty".to_string()));
        }
        let max_results = match request.max_results {
            Some(0) => {
                return Err(JokeError::InvalidInput(
                    "max_results must be positive".to_string(),
                ))
            }
            Some(n) => n.min(self.max_results_cap),
            None => 1,
        };
        let context = request
            .context
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        debug!("Searching for '{}' (max {})", query, max_results);

        let outcome = self.run_search(query, context, max_results).await.inspect_err(|e| {
            if matches!(e, JokeError::DependencyUnavailable(_)) {
                error!("Search failed, dependency unavailable: {}", e);
            }
        })?;

        self.log_query(query, context, &outcome).await;
        Ok(outcome)
    }

    async fn run_search(
        &self,
        query: &str,
        context: Option<&str>,
        max_results: usize,
    ) -> Result<SearchOutcome> {
        let query_vector = self.embedder.embed(query).await?;

        let k = self.candidate_pool.max(max_results);
        let neighbors = self
            .retry
            .read("nearest", || self.store.nearest(&query_vector, k))
            .await?;

        let (matches, below_floor) = self.ranker.partition(neighbors, context);

        // Nothing cleared the floor but the corpus is not empty: ask rather than give up
        let (ranked, decision) = if matches.is_empty() {
            let decision = self.clarification.decide_below_floor(query, &below_floor);
            (below_floor, decision)
        } else {
            let decision = self.clarification.decide(query, &matches);
            (matches, decision)
        };

        let outcome = match decision {
            ClarificationDecision::Empty => SearchOutcome::NoMatch,
            ClarificationDecision::Clear => SearchOutcome::Results(top(ranked, max_results)),
            ClarificationDecision::Ambiguous { prompt, categories } => {
                SearchOutcome::Clarification {
                    prompt,
                    categories,
                    candidates: top(ranked, max_results),
                }
            }
        };

        info!(
            "Search '{}' -> {} ({} candidates)",
            query,
            outcome.kind(),
            outcome.candidates().len()
        );
        Ok(outcome)
    }

    /// Best effort; a failed write never fails the search
    async fn log_query(&self, query: &str, context: Option<&str>, outcome: &SearchOutcome) {
        let log = QueryLog {
            query: query.to_string(),
            context: context.map(str::to_string),
            returned_ids: outcome.candidates().iter().map(|c| c.joke.id).collect(),
            clarification_needed: outcome.needs_clarification(),
            relevance_score: outcome.candidates().first().map(|c| c.score),
            created_at: Utc::now(),
        };

        if let Err(e) = self.retry.write("log_query", self.store.log_query(&log)).await {
            warn!("Failed to record query log: {}", e);
        }
    }

    /// Record one like or dislike
    pub async fn submit_feedback(
        &self,
        joke_id: JokeId,
        liked: bool,
        comment: Option<String>,
    ) -> Result<FeedbackStats> {
        self.feedback.apply(joke_id, liked, comment).await
    }

    /// Validate, embed and store a new joke
    ///
    /// # Errors
    /// - `InvalidInput` for empty text
    /// - `DuplicateId` when an explicit id is already taken
    pub async fn add_joke(&self, joke: NewJoke) -> Result<Joke> {
        let joke = joke.normalized()?;
        let embedding = self.embedder.embed(&joke.text).await?;
        self.insert_embedded(joke, embedding).await
    }

    /// Store a joke whose embedding was computed elsewhere (bulk loading)
    pub async fn insert_embedded(&self, joke: NewJoke, embedding: Vec<f32>) -> Result<Joke> {
        let joke = joke.normalized()?;
        let stored = self
            .retry
            .write("insert", self.store.insert(joke, embedding))
            .await?;
        info!("Added joke {} ({})", stored.id, stored.category);
        Ok(stored)
    }

    pub async fn get_joke(&self, id: JokeId) -> Result<Joke> {
        self.retry.read("get", || self.store.get(id)).await
    }

    pub async fn random_joke(&self) -> Result<Option<Joke>> {
        self.retry.read("random", || self.store.random()).await
    }

    pub async fn find_by_text(&self, text: &str) -> Result<Option<Joke>> {
        self.retry
            .read("find_by_text", || self.store.find_by_text(text))
            .await
    }

    pub async fn stats(&self) -> Result<CorpusStats> {
        self.retry.read("stats", || self.store.stats()).await
    }
}

fn top(mut ranked: Vec<RankedCandidate>, n: usize) -> Vec<RankedCandidate> {
    ranked.truncate(n);
    ranked
}
