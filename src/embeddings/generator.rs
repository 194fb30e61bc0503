//! Embedding service: the single process-wide entry point to the model

use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;
use futures::stream::{
    self,
};
use tokio::sync::Semaphore;
use tracing::debug;
use tracing::warn;

use super::client::EmbeddingClient;
use super::client::EmbeddingProvider;
use super::hashing::HashEmbedder;
use super::EmbeddingBackend;
use super::EmbeddingConfig;
use crate::errors::JokeError;
use crate::errors::Result;

/// Service for generating embeddings through a bounded-concurrency gate
///
/// Constructed once at startup and shared by `Arc`. The gate only limits
/// embedding calls; store reads and feedback never wait on it.
pub struct EmbeddingService {
    backend: Arc<dyn EmbeddingBackend>,
    gate: Semaphore,
    timeout: Duration,
    provider: Option<EmbeddingProvider>,
}

impl EmbeddingService {
    /// Create a new embedding service from the application config
    pub fn new(config: &crate::config::AppConfig) -> Result<Self> {
        Self::from_config(EmbeddingConfig::from_app_config(config)?)
    }

    /// Create from custom config
    pub fn from_config(config: EmbeddingConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let backend: Arc<dyn EmbeddingBackend> = match config.provider {
            EmbeddingProvider::Hash => Arc::new(HashEmbedder::new(config.dimension)),
            provider => Arc::new(EmbeddingClient::new(
                provider,
                config.model.clone(),
                config.endpoint.clone(),
                config.api_key.clone(),
                config.dimension,
                timeout,
            )?),
        };

        let mut service = Self::with_backend(backend, config.max_concurrency, timeout);
        service.provider = Some(config.provider);
        Ok(service)
    }

    /// Wrap an arbitrary backend
    pub fn with_backend(
        backend: Arc<dyn EmbeddingBackend>,
        max_concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            gate: Semaphore::new(max_concurrency.max(1)),
            timeout,
            provider: None,
        }
    }

    /// Embed one text
    ///
    /// # Errors
    /// - `InvalidInput` for empty or whitespace-only text
    /// - `DependencyUnavailable` when the gate or the model does not answer in time
    /// - `Embedding` when the model returns a vector of the wrong length
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let processed = super::preprocess_text_for_embedding(text)?;

        let deadline = tokio::time::Instant::now() + self.timeout;

        let _permit = tokio::time::timeout_at(deadline, self.gate.acquire())
            .await
            .map_err(|_| {
                warn!("Timed out waiting for an embedding slot");
                JokeError::DependencyUnavailable("embedding queue is saturated".to_string())
            })?
            .map_err(|_| JokeError::DependencyUnavailable("embedding service closed".to_string()))?;

        let embedding = tokio::time::timeout_at(deadline, self.backend.generate(&processed))
            .await
            .map_err(|_| {
                warn!("Embedding call exceeded {:?}", self.timeout);
                JokeError::DependencyUnavailable(format!(
                    "embedding timed out after {} ms",
                    self.timeout.as_millis()
                ))
            })??;

        if embedding.len() != self.dimension() {
            return Err(JokeError::Embedding(format!(
                "model '{}' returned {} dimensions, expected {}",
                self.model(),
                embedding.len(),
                self.dimension()
            )));
        }

        debug!("Embedded {} chars", processed.len());
        Ok(embedding)
    }

    /// Embed many texts with at most `concurrency` calls in flight, preserving order
    pub async fn embed_batch(&self, texts: &[String], concurrency: usize) -> Vec<Result<Vec<f32>>> {
        stream::iter(texts.iter())
            .map(|text| self.embed(text))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.backend.dimension()
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Get the configured provider, if built from config
    pub const fn provider(&self) -> Option<EmbeddingProvider> {
        self.provider
    }

    /// Permits currently free in the gate
    pub fn available_permits(&self) -> usize {
        self.gate.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;

    use super::*;
    use crate::config::AppConfig;

    struct SlowBackend {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingBackend for SlowBackend {
        fn model(&self) -> &str {
            "slow"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn generate(&self, _text: &str) -> Result<Vec<f32>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![1.0, 0.0])
        }
    }

    struct WrongDimension;

    #[async_trait]
    impl EmbeddingBackend for WrongDimension {
        fn model(&self) -> &str {
            "wrong"
        }

        fn dimension(&self) -> usize {
            4
        }

        async fn generate(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; 3])
        }
    }

    fn slow(delay: Duration) -> Arc<SlowBackend> {
        Arc::new(SlowBackend {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_default_service_is_deterministic() {
        let service = EmbeddingService::new(&AppConfig::default()).unwrap();
        assert_eq!(service.provider(), Some(EmbeddingProvider::Hash));
        let a = service.embed("Knock knock. Who's there?").await.unwrap();
        let b = service.embed("Knock knock. Who's there?").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), service.dimension());
    }

    #[tokio::test]
    async fn test_empty_text_is_invalid_input() {
        let service = EmbeddingService::new(&AppConfig::default()).unwrap();
        assert!(matches!(service.embed("").await, Err(JokeError::InvalidInput(_))));
        assert!(matches!(service.embed("  \t\n").await, Err(JokeError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_gate_bounds_concurrency() {
        let backend = slow(Duration::from_millis(20));
        let service = Arc::new(EmbeddingService::with_backend(
            backend.clone(),
            2,
            Duration::from_secs(5),
        ));

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.embed(&format!("joke {i}")).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert!(backend.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(service.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_timeout_is_dependency_unavailable() {
        let service = EmbeddingService::with_backend(
            slow(Duration::from_millis(200)),
            1,
            Duration::from_millis(20),
        );
        let err = service.embed("slow joke").await.unwrap_err();
        assert!(matches!(err, JokeError::DependencyUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let service =
            EmbeddingService::with_backend(Arc::new(WrongDimension), 1, Duration::from_secs(1));
        assert!(matches!(
            service.embed("anything").await,
            Err(JokeError::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order() {
        let service = EmbeddingService::new(&AppConfig::default()).unwrap();
        let texts = vec!["first joke".to_string(), String::new(), "third joke".to_string()];
        let results = service.embed_batch(&texts, 2).await;

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &service.embed("first joke").await.unwrap()
        );
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
