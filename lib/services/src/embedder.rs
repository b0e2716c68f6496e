//! Text embedding services
//!
//! [`HttpEmbedder`] calls an OpenAI-compatible `/embeddings` endpoint.
//! [`HashEmbedder`] is a deterministic trigram/word hashing embedder for
//! tests and offline runs.

use resumatch_core::{Error, Result, Vector};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default embedding dimension (all-MiniLM-L6-v2)
pub const DEFAULT_DIMENSIONS: usize = 384;

pub trait Embedder: Send + Sync {
    /// Embed one text into a vector of [`Embedder::dimensions`] components.
    /// Empty text yields a zero vector.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vector>> + Send;

    fn dimensions(&self) -> usize;
}

impl<T: Embedder> Embedder for Arc<T> {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vector>> + Send {
        (**self).embed(text)
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }
}

/// Connection settings for [`HttpEmbedder`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpEmbedderConfig {
    pub endpoint: String,
    pub model: String,
    pub dimensions: usize,
    /// Bearer token; read from the environment, never from the settings file
    #[serde(skip)]
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for HttpEmbedderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8081/v1/embeddings".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            api_key: None,
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible embeddings endpoint
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: HttpEmbedderConfig,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("embedding client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpEmbedderConfig {
        &self.config
    }
}

impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vector> {
        if text.trim().is_empty() {
            return Ok(Vector::zeros(self.config.dimensions));
        }

        let mut request = self.client.post(&self.config.endpoint).json(&EmbedRequest {
            model: &self.config.model,
            input: vec![text],
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("HTTP error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!("API returned {status}: {body}")));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("JSON parse error: {e}")))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Embedding("response contained no embedding".to_string()))?;

        if embedding.len() != self.config.dimensions {
            return Err(Error::Embedding(format!(
                "expected {} dimensions, service returned {}",
                self.config.dimensions,
                embedding.len()
            )));
        }

        debug!(chars = text.len(), "embedded text");
        Ok(Vector::new(embedding))
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }
}

/// Deterministic hashing embedder.
///
/// Character trigrams and whole words are hashed into buckets, words counting
/// double, and the result is L2-normalized. Texts sharing vocabulary get a
/// high cosine similarity; identical texts get identical vectors.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Vector {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return Vector::zeros(self.dimensions);
        }

        let mut components = vec![0.0f32; self.dimensions];
        for trigram in trigrams(&normalized) {
            components[self.bucket(&trigram)] += 1.0;
        }
        for word in normalized.split_whitespace() {
            components[self.bucket(word)] += 2.0;
        }

        Vector::new(components).normalized()
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        (hasher.finish() % self.dimensions as u64) as usize
    }
}

fn trigrams(s: &str) -> Vec<String> {
    let padded: Vec<char> = format!("  {}  ", s).chars().collect();
    padded.windows(3).map(|w| w.iter().collect()).collect()
}

impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vector> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedder_deterministic() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_sync("Senior Rust Engineer");
        let b = embedder.embed_sync("senior rust engineer");
        assert_eq!(a, b);
        assert_eq!(a.dim(), 64);
        assert!((a.norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hash_embedder_similarity() {
        let embedder = HashEmbedder::default();
        let q = embedder.embed_sync("data scientist python machine learning");
        let close = embedder.embed_sync("python data scientist");
        let far = embedder.embed_sync("mechanical site supervisor");
        assert!(q.cosine_similarity(&close) > q.cosine_similarity(&far));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(16);
        let v = embedder.embed_sync("   ");
        assert_eq!(v.dim(), 16);
        assert_eq!(v.norm(), 0.0);
    }

    #[tokio::test]
    async fn test_embedder_trait_through_arc() {
        let embedder = Arc::new(HashEmbedder::new(32));
        let v = embedder.embed("rust").await.unwrap();
        assert_eq!(v.dim(), embedder.dimensions());
    }

    #[tokio::test]
    async fn test_http_embedder_empty_text_skips_request() {
        let embedder = HttpEmbedder::new(HttpEmbedderConfig {
            endpoint: "http://127.0.0.1:9/unreachable".into(),
            dimensions: 8,
            ..Default::default()
        })
        .unwrap();
        let v = embedder.embed("").await.unwrap();
        assert_eq!(v, Vector::zeros(8));
    }

    #[tokio::test]
    async fn test_http_embedder_connection_failure_is_embedding_error() {
        let embedder = HttpEmbedder::new(HttpEmbedderConfig {
            endpoint: "http://127.0.0.1:9/unreachable".into(),
            request_timeout_ms: 500,
            ..Default::default()
        })
        .unwrap();
        let err = embedder.embed("rust").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(err.is_infrastructure());
    }
}
