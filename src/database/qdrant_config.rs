use anyhow::{anyhow, Result};
use qdrant_client::{config::QdrantConfig, Qdrant};
use std::time::Duration;

pub async fn create_qdrant_client(url: &str) -> Result<Qdrant> {
    // Strip any scheme the caller passed in
    let clean_url = if url.contains("://") {
        url.split("://").nth(1).unwrap_or(url).to_string()
    } else {
        url.to_string()
    };

    // The client speaks gRPC; replace the REST port if that's what we got
    let grpc_url = if clean_url.ends_with(":6333") {
        clean_url.replace(":6333", ":6334")
    } else {
        clean_url
    };

    let url_with_scheme = format!("http://{}", grpc_url);
    log::info!("Connecting to Qdrant at {}", url_with_scheme);

    let mut config = QdrantConfig::from_url(&url_with_scheme);
    config.check_compatibility = false;
    config.timeout = Duration::from_secs(30);
    config.connect_timeout = Duration::from_secs(10);

    let client = Qdrant::new(config)?;

    // Test the connection before handing the client out
    match client.list_collections().await {
        Ok(_) => {
            log::info!("Successfully connected to Qdrant");
            Ok(client)
        }
        Err(e) => {
            log::error!("Qdrant connection test failed: {}", e);
            Err(anyhow!("Failed to connect to Qdrant: {}", e))
        }
    }
}
