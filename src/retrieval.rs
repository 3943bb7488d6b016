use std::sync::Arc;

use crate::embedding::Encoder;
use crate::errors::Result;
use crate::extract::{ExtractionFailure, SourceKind, SourceRecord};
use crate::index::{IndexedDocument, MaterialIndex};

/// Default number of passages returned by [`RetrievalService::retrieve`].
pub const DEFAULT_TOP_K: usize = 3;

/// What happened to a record handed to [`RetrievalService::index_material`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Stored,
    /// The record carried an extraction failure and was not indexed.
    Skipped(ExtractionFailure),
}

/// Composes the encoder and the material index: ingestion embeds and stores,
/// retrieval embeds the query and ranks stored content.
pub struct RetrievalService {
    encoder: Arc<dyn Encoder>,
    index: Arc<dyn MaterialIndex>,
}

impl RetrievalService {
    pub fn new(encoder: Arc<dyn Encoder>, index: Arc<dyn MaterialIndex>) -> Self {
        Self { encoder, index }
    }

    /// Embeds and stores an extracted record together with the prompt that
    /// motivated its ingestion.
    ///
    /// Error records are skipped, never stored: the index must not contain
    /// placeholder content that would pollute similarity search.
    pub async fn index_material(
        &self,
        record: &SourceRecord,
        prompt: &str,
    ) -> Result<IndexOutcome> {
        if let SourceKind::Error(failure) = record.kind {
            tracing::warn!(link = %record.link, kind = %record.kind, "skipping indexing for failed extraction");
            return Ok(IndexOutcome::Skipped(failure));
        }

        let content_vector = self.encoder.encode(&record.content).await?;
        let prompt_vector = self.encoder.encode(prompt).await?;
        let document = IndexedDocument {
            link: record.link.clone(),
            kind: record.kind,
            prompt: prompt.to_string(),
            prompt_vector,
            content: record.content.clone(),
            content_vector,
        };
        self.index.put(document).await?;
        tracing::info!(link = %record.link, "indexed document");
        Ok(IndexOutcome::Stored)
    }

    /// Top-k stored passages most similar to the query, descending.
    ///
    /// An unreachable index surfaces as `Error::StorageUnavailable`; an
    /// empty result is only ever returned when the index really holds
    /// nothing similar, so missing context is never masked.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let query_vector = self.encoder.encode(query).await?;
        let hits = self.index.search(&query_vector, k).await?;
        Ok(hits.into_iter().map(|hit| hit.document.content).collect())
    }

    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<String>> {
        self.retrieve(query, DEFAULT_TOP_K).await
    }
}
