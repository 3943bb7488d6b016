use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::embedding::{Encoder, HashingEncoder, HttpEncoder};
use crate::errors::Result;
use crate::extract::{SourceExtractor, DEFAULT_FETCH_ATTEMPTS};
use crate::grading::{GeminiClient, GradingService, LlmClient, DEFAULT_MODEL};
use crate::index::{ElasticIndex, MaterialIndex, MemoryIndex, DEFAULT_INDEX};
use crate::pipeline::Assistant;
use crate::retrieval::RetrievalService;

/// Network timeout shared by all outbound clients.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Environment-driven configuration for the backend collaborators.
#[derive(Debug, Clone)]
pub struct Config {
    pub elastic_url: Option<String>,
    pub elastic_api_key: Option<String>,
    pub embedder_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub index_name: String,
    pub fetch_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            elastic_url: None,
            elastic_api_key: None,
            embedder_url: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            index_name: DEFAULT_INDEX.to_string(),
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            elastic_url: env::var("ELASTIC_SEARCH_URL").ok(),
            elastic_api_key: env::var("ELASTIC_SEARCH_API_KEY").ok(),
            embedder_url: env::var("EMBEDDER_URL").ok(),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            index_name: env::var("MATERIAL_INDEX").unwrap_or(defaults.index_name),
            fetch_attempts: defaults.fetch_attempts,
        }
    }

    /// Builds the assistant with all collaborators constructed once.
    /// Missing external endpoints degrade to the offline substitutes.
    pub async fn build_assistant(&self) -> Result<Assistant> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let encoder: Arc<dyn Encoder> = match &self.embedder_url {
            Some(url) => Arc::new(HttpEncoder::new(client.clone(), url)),
            None => {
                tracing::warn!("EMBEDDER_URL not set, using the offline hashing encoder");
                Arc::new(HashingEncoder::default())
            }
        };

        let index: Arc<dyn MaterialIndex> = match &self.elastic_url {
            Some(url) => Arc::new(
                ElasticIndex::new(
                    client.clone(),
                    url,
                    &self.index_name,
                    self.elastic_api_key.clone(),
                )
                .await?,
            ),
            None => {
                tracing::warn!("ELASTIC_SEARCH_URL not set, material index is in-memory only");
                Arc::new(MemoryIndex::new())
            }
        };

        let llm: Arc<dyn LlmClient> = Arc::new(GeminiClient::new(
            client.clone(),
            self.gemini_api_key.clone().unwrap_or_default(),
            &self.gemini_model,
        ));

        let extractor = SourceExtractor::new(client).with_max_attempts(self.fetch_attempts);
        Ok(Assistant::new(
            extractor,
            RetrievalService::new(encoder, index),
            GradingService::new(llm),
        ))
    }
}
