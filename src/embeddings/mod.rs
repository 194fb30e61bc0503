//! Embeddings generation module
//!
//! This module turns query and joke text into fixed-length vectors using one of
//! several backends:
//! - Hash (local feature hashing, deterministic, no network)
//! - Ollama (local models)
//! - OpenAI (text-embedding-3-small, etc.)
//!
//! Every backend sits behind [`EmbeddingService`], which owns the concurrency
//! gate and timeouts for the process-wide model.
//!
//! # Examples
//!
//! ```rust,no_run
//! use jokerank::config::AppConfig;
//! use jokerank::embeddings::EmbeddingService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = EmbeddingService::new(&config)?;
//!
//!     let embedding = service.embed("Why did the chicken cross the road?").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod generator;
pub mod hashing;
pub mod text_preprocessing;

use async_trait::async_trait;
pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use generator::EmbeddingService;
pub use hashing::HashEmbedder;
pub use text_preprocessing::preprocess_text_for_embedding;

use crate::errors::JokeError;
use crate::errors::Result;

/// Default embedding dimension (all-MiniLM-L6-v2)
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// A model that maps preprocessed text to a vector
///
/// Implementations must be safe to call from many tasks at once; the
/// [`EmbeddingService`] limits how many calls are in flight.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Human-readable model name
    fn model(&self) -> &str;

    /// Length of every vector this backend returns
    fn dimension(&self) -> usize;

    async fn generate(&self, text: &str) -> Result<Vec<f32>>;
}

/// Configuration for embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_concurrency: usize,
    pub timeout_ms: u64,
}

impl EmbeddingConfig {
    pub fn from_app_config(config: &crate::config::AppConfig) -> Result<Self> {
        let embeddings = &config.embeddings;
        let provider = EmbeddingProvider::parse(&embeddings.provider)?;

        if provider == EmbeddingProvider::OpenAI && embeddings.api_key.is_none() {
            return Err(JokeError::Config(
                "embeddings.api_key is required for the openai provider".to_string(),
            ));
        }

        Ok(Self {
            provider,
            model: embeddings.model.clone(),
            dimension: embeddings.dimension,
            endpoint: embeddings.endpoint.trim_end_matches('/').to_string(),
            api_key: embeddings.api_key.clone(),
            max_concurrency: embeddings.max_concurrency,
            timeout_ms: embeddings.timeout_ms,
        })
    }
}

/// Cosine similarity between two vectors of equal length
///
/// Returns 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 1e-8 && norm_b > 1e-8 {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Cosine distance `1 - cos(a, b)`, in `[0, 2]`
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
