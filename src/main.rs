use medical_rag::api::{self, AppState};
use medical_rag::collection::Collection;
use medical_rag::config::AppConfig;
use medical_rag::database::VectorDb;
use medical_rag::document::DocumentPipeline;
use medical_rag::extract::SemanticExtractor;
use medical_rag::llm::EmbeddingClient;
use medical_rag::providers::openrouter::openrouter::OpenRouterProvider;
use medical_rag::providers::traits::CompletionProvider;
use medical_rag::rag::{IndexLoader, RagEngine, RetrievalRouter};

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Override OPEN_ROUTER_API_KEY from the environment
    #[arg(short, long)]
    api_key: Option<String>,

    #[arg(long, default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(api_key) = args.api_key {
        config.openrouter_api_key = api_key;
    }

    println!("{}", "Connecting to Qdrant...".cyan());
    let db = VectorDb::connect(&config.qdrant_url).await?;
    println!("{}", "Connected to vector store".green());

    let provider: Box<dyn CompletionProvider + Send + Sync> = Box::new(OpenRouterProvider::new(
        config.openrouter_api_key.clone(),
        config.openrouter_model.clone(),
    ));

    let embedder = EmbeddingClient::new(
        config.embeddings_url.clone(),
        config.embeddings_model.clone(),
        config.embedding_dim,
    );

    // Ensure the three collections exist so queries against an empty
    // store answer with a refusal instead of a storage error
    for collection in Collection::ALL {
        db.create_collection(collection.store_name(), config.embedding_dim)
            .await?;
    }

    let extractor = SemanticExtractor::new(provider.clone());
    let pipeline = DocumentPipeline::new(
        extractor,
        config.data_dir.clone(),
        config.converter_bin.clone(),
    );
    let loader = IndexLoader::new(db.clone(), embedder.clone(), config.data_dir.clone());
    let retriever = RetrievalRouter::new(
        db.clone(),
        embedder.clone(),
        provider.clone(),
        config.retrieval_limit,
    );
    let engine = RagEngine::new(Box::new(retriever), provider);

    let state = AppState {
        engine: Arc::new(engine),
        pipeline: Arc::new(pipeline),
        loader: Arc::new(loader),
        db,
        model_name: config.openrouter_model.clone(),
        data_dir: config.data_dir.clone(),
    };

    let app = api::create_api(state);

    let addr = format!("0.0.0.0:{}", args.port);
    println!("{}", format!("Starting API server on {}", addr).cyan());
    println!("{}", format!("Model: {}", config.openrouter_model).cyan());

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
