use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tower_http::cors::{Any, CorsLayer};
use validator::Validate;

use crate::collection::Collection;
use crate::database::VectorDb;
use crate::document::DocumentPipeline;
use crate::rag::{IndexLoader, RagEngine, RetrievedChunk};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RagEngine>,
    pub pipeline: Arc<DocumentPipeline>,
    pub loader: Arc<IndexLoader>,
    pub db: VectorDb,
    pub model_name: String,
    pub data_dir: PathBuf,
}

#[derive(Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 2000))]
    question: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    answer: String,
    context: Vec<RetrievedChunk>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    message: String,
}

#[derive(Serialize)]
pub struct LoadResponse {
    message: String,
    collection: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    qdrant_connection: String,
    collections: Vec<String>,
    model: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_collection(raw: &str) -> Result<Collection, ApiError> {
    raw.parse::<Collection>().map_err(ApiError::BadRequest)
}

/// Create and configure the API router
pub fn create_api(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/query/:collection", post(query_handler))
        .route("/upload/:collection", post(upload_handler))
        .route("/load/:collection", post(load_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, qdrant_connection, collections) = match state.db.list_collections().await {
        Ok(collections) => ("healthy".to_string(), "ok".to_string(), collections),
        Err(e) => ("degraded".to_string(), format!("error: {}", e), Vec::new()),
    };

    Json(HealthResponse {
        status,
        qdrant_connection,
        collections,
        model: state.model_name.clone(),
    })
}

async fn query_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<QueryResponse> {
    let collection = parse_collection(&collection)?;
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Invalid request: {}", e)))?;

    log::info!("Query for collection {}: {}", collection, request.question);

    let result = state
        .engine
        .answer(collection, &request.question)
        .await
        .map_err(|e| {
            log::error!("Query failed: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(Json(QueryResponse {
        answer: result.answer,
        context: result.context,
    }))
}

async fn upload_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let collection = parse_collection(&collection)?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
        .ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;

    let filename = field.file_name().unwrap_or_default().to_string();
    log::info!("Starting upload of file: {}", filename);

    if !filename.ends_with(".docx") {
        log::error!("Invalid file: {} - must be a .docx file", filename);
        return Err(ApiError::BadRequest(
            "File must be a .docx file".to_string(),
        ));
    }

    let content = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

    fs::create_dir_all(&state.data_dir)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let docx_path = state.pipeline.docx_path(collection);
    fs::write(&docx_path, &content)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save upload: {}", e)))?;
    log::info!(
        "File saved to {}, size: {} bytes",
        docx_path.display(),
        content.len()
    );

    state.pipeline.process(collection).await.map_err(|e| {
        log::error!("Processing failed: {}", e);
        ApiError::Internal(format!("Processing failed: {}", e))
    })?;

    let count = state.loader.reload(collection).await.map_err(|e| {
        log::error!("Failed to reload vectorstore: {}", e);
        ApiError::Internal(format!("Failed to reload vectorstore: {}", e))
    })?;
    log::info!("Reloaded {} chunks for {}", count, collection.store_name());

    Ok(Json(UploadResponse {
        message: format!(
            "{} document uploaded and processed successfully",
            collection
        ),
    }))
}

async fn load_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> ApiResult<LoadResponse> {
    let collection = parse_collection(&collection)?;

    let count = state.loader.reload(collection).await.map_err(|e| {
        log::error!("Failed to load JSON data: {}", e);
        ApiError::Internal(format!("Failed to load JSON data: {}", e))
    })?;

    Ok(Json(LoadResponse {
        message: format!(
            "Loaded {} chunks into collection {}",
            count,
            collection.store_name()
        ),
        collection: collection.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collection_paths() {
        assert!(parse_collection("pre").is_ok());
        assert!(parse_collection("middle").is_ok());
        assert!(parse_collection("post").is_ok());
        assert!(matches!(
            parse_collection("other"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_query_request_validation() {
        let empty = QueryRequest {
            question: String::new(),
        };
        assert!(empty.validate().is_err());

        let ok = QueryRequest {
            question: "血压低怎么办？".to_string(),
        };
        assert!(ok.validate().is_ok());
    }
}
