//! Local feature-hashing embedder
//!
//! Maps word unigrams and bigrams into a fixed number of buckets with FNV-1a,
//! using one hash bit as the sign, then L2-normalizes. The output depends only
//! on the input text and the dimension, so vectors computed at ingestion stay
//! comparable with query vectors computed in any later process.

use async_trait::async_trait;

use super::EmbeddingBackend;
use crate::errors::Result;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

const UNIGRAM_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.5;

pub const HASH_MODEL_NAME: &str = "fnv1a-feature-hash";

/// Deterministic bag-of-words embedder
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Embed without going through the async trait
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = tokenize(text);

        if tokens.is_empty() {
            // Punctuation-only text still gets a stable, non-zero vector
            let whole = text.trim().to_lowercase();
            self.add_feature(&mut vector, "s:", &whole, UNIGRAM_WEIGHT);
        } else {
            for token in &tokens {
                self.add_feature(&mut vector, "w:", token, UNIGRAM_WEIGHT);
            }
            for pair in tokens.windows(2) {
                let bigram = format!("{} {}", pair[0], pair[1]);
                self.add_feature(&mut vector, "b:", &bigram, BIGRAM_WEIGHT);
            }
        }

        normalize(&mut vector);
        vector
    }

    fn add_feature(&self, vector: &mut [f32], namespace: &str, feature: &str, weight: f32) {
        let hash = fnv1a_64(namespace.as_bytes().iter().chain(feature.as_bytes()));
        let index = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }
}

#[async_trait]
impl EmbeddingBackend for HashEmbedder {
    fn model(&self) -> &str {
        HASH_MODEL_NAME
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn fnv1a_64<'a>(bytes: impl Iterator<Item = &'a u8>) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
