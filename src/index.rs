use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::embedding::EMBEDDING_DIM;
use crate::errors::{Error, Result};
use crate::extract::SourceKind;

/// Collection name used for course resources.
pub const DEFAULT_INDEX: &str = "course_resources";

/// The persisted document shape, the only externally visible schema.
///
/// Both the content and the prompt that motivated ingestion are embedded,
/// so retrieval could rank by either axis; ranking uses the content vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub link: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub prompt: String,
    pub prompt_vector: Vec<f32>,
    pub content: String,
    pub content_vector: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub score: f32,
    pub document: IndexedDocument,
}

/// Document store with insert-with-vector and approximate nearest-neighbor
/// search by cosine similarity.
#[async_trait]
pub trait MaterialIndex: Send + Sync {
    async fn put(&self, document: IndexedDocument) -> Result<()>;

    /// Ranked hits by descending content-vector similarity, at most `k`.
    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredHit>>;

    async fn count(&self) -> Result<usize>;
}

/// Cosine of the angle between two vectors; zero-norm inputs score 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// In-process index. Backs tests and offline runs; scores are
/// `cosine + 1.0`, matching the Elasticsearch script below so the two
/// implementations rank identically.
#[derive(Default)]
pub struct MemoryIndex {
    documents: RwLock<Vec<IndexedDocument>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MaterialIndex for MemoryIndex {
    async fn put(&self, document: IndexedDocument) -> Result<()> {
        self.documents
            .write()
            .map_err(|_| Error::StorageUnavailable("memory index lock poisoned".to_string()))?
            .push(document);
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredHit>> {
        let documents = self
            .documents
            .read()
            .map_err(|_| Error::StorageUnavailable("memory index lock poisoned".to_string()))?;
        let mut hits: Vec<ScoredHit> = documents
            .iter()
            .map(|document| ScoredHit {
                score: cosine(query_vector, &document.content_vector) + 1.0,
                document: document.clone(),
            })
            .collect();
        // Stable sort: ties keep insertion order.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self
            .documents
            .read()
            .map_err(|_| Error::StorageUnavailable("memory index lock poisoned".to_string()))?
            .len())
    }
}

/// Elasticsearch-backed index using a script-scored cosine-similarity query
/// over a single collection.
pub struct ElasticIndex {
    client: reqwest::Client,
    base_url: String,
    index: String,
    api_key: Option<String>,
}

impl ElasticIndex {
    pub async fn new(
        client: reqwest::Client,
        url: &str,
        index: &str,
        api_key: Option<String>,
    ) -> Result<Self> {
        let store = Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            api_key,
        };

        // Create the index with dense_vector mappings.
        // Ignore the error if the index already exists.
        let mapping = json!({
            "mappings": {
                "properties": {
                    "content_vector": { "type": "dense_vector", "dims": EMBEDDING_DIM },
                    "prompt_vector": { "type": "dense_vector", "dims": EMBEDDING_DIM }
                }
            }
        });
        let _ = store
            .request(Method::PUT, &format!("{}/{}", store.base_url, store.index))
            .json(&mapping)
            .send()
            .await;

        Ok(store)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, format!("ApiKey {key}"));
        }
        builder
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_score")]
    score: f32,
    #[serde(rename = "_source")]
    source: IndexedDocument,
}

#[derive(Deserialize)]
struct CountResponse {
    count: usize,
}

#[async_trait]
impl MaterialIndex for ElasticIndex {
    async fn put(&self, document: IndexedDocument) -> Result<()> {
        let response = self
            .request(Method::POST, &format!("{}/{}/_doc", self.base_url, self.index))
            .json(&document)
            .send()
            .await
            .map_err(|err| Error::StorageUnavailable(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::StorageUnavailable(format!(
                "index write returned {status}: {body}"
            )));
        }
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredHit>> {
        // Shifted by +1.0 so scores stay non-negative; the shift is
        // monotonic and does not change the ranking.
        let query = json!({
            "query": {
                "script_score": {
                    "query": { "match_all": {} },
                    "script": {
                        "source": "cosineSimilarity(params.query_vector, 'content_vector') + 1.0",
                        "params": { "query_vector": query_vector }
                    }
                }
            },
            "size": k
        });
        let response = self
            .request(
                Method::POST,
                &format!("{}/{}/_search", self.base_url, self.index),
            )
            .json(&query)
            .send()
            .await
            .map_err(|err| Error::StorageUnavailable(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::StorageUnavailable(format!(
                "search returned {status}: {body}"
            )));
        }
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|err| Error::StorageUnavailable(err.to_string()))?;
        Ok(parsed
            .hits
            .hits
            .into_iter()
            .map(|hit| ScoredHit {
                score: hit.score,
                document: hit.source,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .request(
                Method::GET,
                &format!("{}/{}/_count", self.base_url, self.index),
            )
            .send()
            .await
            .map_err(|err| Error::StorageUnavailable(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::StorageUnavailable(format!(
                "count returned {status}"
            )));
        }
        let parsed: CountResponse = response
            .json()
            .await
            .map_err(|err| Error::StorageUnavailable(err.to_string()))?;
        Ok(parsed.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str, content_vector: Vec<f32>) -> IndexedDocument {
        IndexedDocument {
            link: format!("https://example.com/{content}"),
            kind: SourceKind::Plaintext,
            prompt: "test".to_string(),
            prompt_vector: vec![0.0; content_vector.len()],
            content: content.to_string(),
            content_vector,
        }
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.6, 0.8];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn memory_index_ranks_by_descending_similarity() {
        let index = MemoryIndex::new();
        index.put(doc("far", vec![0.0, 1.0])).await.unwrap();
        index.put(doc("near", vec![1.0, 0.0])).await.unwrap();
        let hits = index.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.content, "near");
        assert!((hits[0].score - 2.0).abs() < 1e-6);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn memory_index_truncates_to_k() {
        let index = MemoryIndex::new();
        for i in 0..5 {
            index.put(doc(&i.to_string(), vec![1.0, 0.0])).await.unwrap();
        }
        let hits = index.search(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(index.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn memory_index_keeps_insertion_order_on_ties() {
        let index = MemoryIndex::new();
        index.put(doc("first", vec![1.0, 0.0])).await.unwrap();
        index.put(doc("second", vec![1.0, 0.0])).await.unwrap();
        let hits = index.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].document.content, "first");
        assert_eq!(hits[1].document.content, "second");
    }
}
