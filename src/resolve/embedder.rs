use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_MODEL: &str = "paraphrase-MiniLM-L6-v2";

/// Turns names into fixed-length vectors, one per input, in input order.
#[async_trait]
pub trait Embedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Client for any OpenAI-compatible `/v1/embeddings` endpoint serving a
/// sentence-transformers model.
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    model: String,
    batch_size: usize,
}

impl HttpEmbedder {
    pub fn new(base_url: String, model: String, batch_size: usize, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            batch_size: batch_size.max(1),
        })
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": &self.model,
            "input": texts,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP {} from {}", status, url));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .context("Malformed embeddings response")?;

        // Providers may return items out of order; `index` is authoritative
        // when present, and must then be present on every item.
        let indexed = parsed.data.iter().filter(|item| item.index.is_some()).count();
        if indexed == parsed.data.len() {
            parsed.data.sort_by_key(|item| item.index);
        } else if indexed > 0 {
            return Err(anyhow!(
                "Embeddings response has index on {} of {} items",
                indexed,
                parsed.data.len()
            ));
        }

        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            debug!("Embedding batch of {} names", chunk.len());
            vectors.extend(self.embed_chunk(chunk).await?);
        }
        Ok(vectors)
    }
}
