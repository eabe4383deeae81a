use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;

/// Runtime configuration resolved once at startup and handed to each
/// component at construction. Nothing reads the environment after this.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openrouter_api_key: String,
    pub openrouter_model: String,
    pub qdrant_url: String,
    pub embeddings_url: String,
    pub embeddings_model: String,
    pub embedding_dim: u64,
    pub data_dir: PathBuf,
    pub retrieval_limit: u64,
    pub converter_bin: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let openrouter_api_key = env::var("OPEN_ROUTER_API_KEY")
            .map_err(|_| anyhow!("OPEN_ROUTER_API_KEY environment variable is required"))?;

        let openrouter_model = env::var("OPEN_ROUTER_MODEL")
            .unwrap_or_else(|_| "openai/gpt-oss-safeguard-20b".to_string());

        let qdrant_url = env::var("QDRANT_URL")
            .unwrap_or_else(|_| "localhost:6334".to_string());

        let embeddings_url = env::var("EMBEDDINGS_URL")
            .unwrap_or_else(|_| "http://localhost:8081".to_string());

        // Multilingual model so Chinese and English content share one vector space
        let embeddings_model = env::var("EMBEDDINGS_MODEL")
            .unwrap_or_else(|_| "paraphrase-multilingual-MiniLM-L12-v2".to_string());

        let embedding_dim = env::var("EMBEDDING_DIM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(384);

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let retrieval_limit = env::var("RETRIEVAL_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        let converter_bin = env::var("CONVERTER_BIN")
            .unwrap_or_else(|_| "docling".to_string());

        Ok(Self {
            openrouter_api_key,
            openrouter_model,
            qdrant_url,
            embeddings_url,
            embeddings_model,
            embedding_dim,
            data_dir,
            retrieval_limit,
            converter_bin,
        })
    }
}
