use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Client for a local embedding server exposing an OpenAI-compatible
/// `/v1/embeddings` endpoint.
#[derive(Clone)]
pub struct EmbeddingClient {
    base_url: String,
    model: String,
    dim: u64,
    client: Client,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    pub fn new(base_url: String, model: String, dim: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            dim,
            client: Client::new(),
        }
    }

    pub fn dim(&self) -> u64 {
        self.dim
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow!("Embedding server returned no vectors"))
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model,
                "input": texts,
            }))
            .send()
            .await
            .map_err(|e| anyhow!("Embedding server unreachable at {}: {}", url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Embedding request failed ({}): {}", status, body));
        }

        let parsed: EmbeddingsResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(anyhow!(
                "Embedding server returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            ));
        }

        let mut vectors = Vec::with_capacity(parsed.data.len());
        for row in parsed.data {
            if row.embedding.len() as u64 != self.dim {
                return Err(anyhow!(
                    "Embedding has wrong size: {} (expected {})",
                    row.embedding.len(),
                    self.dim
                ));
            }
            vectors.push(row.embedding);
        }

        Ok(vectors)
    }
}
