use crate::database::qdrant_config::create_qdrant_client;
use qdrant_client::{
    qdrant::{
        point_id::PointIdOptions, with_payload_selector::SelectorOptions, Condition,
        CreateCollection, Distance, Filter, PointId, PointStruct, SearchPoints, UpsertPoints,
        Value, VectorParams, VectorsConfig, WithPayloadSelector,
    },
    Qdrant,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Operation failed: {0}")]
    Operation(String),
}

/// One point to be indexed: the text that was embedded, its vector, and a
/// JSON payload of metadata. Points are immutable once stored; replacement
/// happens at collection granularity.
pub struct VectorPoint {
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

/// A search hit with its similarity score and stored payload.
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: HashMap<String, serde_json::Value>,
}

#[derive(Clone)]
pub struct VectorDb {
    client: Arc<Qdrant>,
}

impl VectorDb {
    pub async fn connect(url: &str) -> Result<Self, VectorDbError> {
        let client = create_qdrant_client(url)
            .await
            .map_err(|e| VectorDbError::Connection(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub async fn create_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> Result<(), VectorDbError> {
        let vectors_config = VectorsConfig {
            config: Some(qdrant_client::qdrant::vectors_config::Config::Params(
                VectorParams {
                    size: vector_size,
                    distance: Distance::Cosine.into(),
                    ..Default::default()
                },
            )),
        };

        let create_collection = CreateCollection {
            collection_name: name.to_string(),
            vectors_config: Some(vectors_config),
            ..Default::default()
        };

        match self.client.create_collection(create_collection).await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("AlreadyExists") => {
                log::info!("Collection {} already exists, skipping creation", name);
                Ok(())
            }
            Err(e) => Err(VectorDbError::Operation(e.to_string())),
        }
    }

    /// Drop and re-create a collection. Reloading goes through this so a
    /// fresh upload never leaves stale points behind.
    pub async fn recreate_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> Result<(), VectorDbError> {
        match self.client.delete_collection(name).await {
            Ok(_) => log::info!("Dropped collection {} before reload", name),
            Err(e) if e.to_string().contains("Not found") => {}
            Err(e) => return Err(VectorDbError::Operation(e.to_string())),
        }
        self.create_collection(name, vector_size).await
    }

    pub async fn store_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> Result<usize, VectorDbError> {
        if points.is_empty() {
            return Ok(0);
        }

        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|p| {
                let payload: HashMap<String, Value> = p
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect();
                PointStruct {
                    id: Some(PointId {
                        point_id_options: Some(PointIdOptions::Uuid(
                            Uuid::new_v4().to_string(),
                        )),
                    }),
                    vectors: Some(p.vector.into()),
                    payload,
                }
            })
            .collect();

        let count = points.len();
        let upsert_points = UpsertPoints {
            collection_name: collection.to_string(),
            points,
            ..Default::default()
        };

        self.client
            .upsert_points(upsert_points)
            .await
            .map_err(|e| VectorDbError::Operation(e.to_string()))?;

        Ok(count)
    }

    /// Similarity search, optionally restricted to points whose payload
    /// field matches a keyword exactly.
    pub async fn search(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: u64,
        keyword_filter: Option<(&str, &str)>,
    ) -> Result<Vec<ScoredPoint>, VectorDbError> {
        let filter = keyword_filter.map(|(field, value)| Filter {
            must: vec![Condition::matches(field, value.to_string())],
            ..Default::default()
        });

        let request = SearchPoints {
            collection_name: collection.to_string(),
            vector: query_vector,
            limit,
            filter,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let results = self
            .client
            .search_points(request)
            .await
            .map_err(|e| VectorDbError::Operation(e.to_string()))?;

        let points = results
            .result
            .into_iter()
            .map(|point| {
                let id = match point.id.and_then(|id| id.point_id_options) {
                    Some(PointIdOptions::Uuid(uuid)) => uuid,
                    _ => String::new(),
                };
                let payload = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| {
                        (
                            k,
                            serde_json::Value::try_from(v).unwrap_or(serde_json::Value::Null),
                        )
                    })
                    .collect();
                ScoredPoint {
                    id,
                    score: point.score,
                    payload,
                }
            })
            .collect();

        Ok(points)
    }

    pub async fn list_collections(&self) -> Result<Vec<String>, VectorDbError> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| VectorDbError::Operation(e.to_string()))?;
        Ok(response
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect())
    }
}
