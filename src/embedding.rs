use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::{Error, Result};

/// Output width of the reference sentence-embedding model
/// (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Maps text to a fixed-length dense vector.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Client for a text-embeddings-inference style HTTP endpoint
/// (`POST /embed` with `{"inputs": [...]}`).
pub struct HttpEncoder {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEncoder {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/embed", base_url.trim_end_matches('/')),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: [&'a str; 1],
}

#[async_trait]
impl Encoder for HttpEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { inputs: [text] })
            .send()
            .await
            .map_err(|err| Error::EncodingFailure(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::EncodingFailure(format!(
                "embedder returned {status}: {body}"
            )));
        }

        let mut vectors: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|err| Error::EncodingFailure(err.to_string()))?;
        let vector = vectors
            .pop()
            .ok_or_else(|| Error::EncodingFailure("embedder returned no vectors".to_string()))?;
        if vector.len() != EMBEDDING_DIM {
            return Err(Error::EncodingFailure(format!(
                "embedder returned {} dimensions, expected {EMBEDDING_DIM}",
                vector.len()
            )));
        }
        Ok(vector)
    }
}

/// Deterministic feature-hashing encoder.
///
/// Each lowercased alphanumeric token hashes to a signed bucket; the result
/// is L2-normalized. Not a semantic model, but identical text maps to an
/// identical vector and token overlap produces positive cosine similarity,
/// which is enough for offline operation and tests.
pub struct HashingEncoder {
    dimension: usize,
}

impl HashingEncoder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        for token in tokens {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hashed = hasher.finish();
            let bucket = (hashed % self.dimension as u64) as usize;
            let sign = if hashed >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

#[async_trait]
impl Encoder for HashingEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_encoder_is_deterministic() {
        let encoder = HashingEncoder::default();
        assert_eq!(encoder.embed("block caching"), encoder.embed("block caching"));
    }

    #[test]
    fn hashing_encoder_output_is_unit_length() {
        let encoder = HashingEncoder::default();
        let vector = encoder.embed("crash recovery in file systems");
        assert_eq!(vector.len(), EMBEDDING_DIM);
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let encoder = HashingEncoder::default();
        let vector = encoder.embed("   ");
        assert!(vector.iter().all(|v| *v == 0.0));
    }
}
