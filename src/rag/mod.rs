pub mod engine;
pub mod loader;
pub mod retrieval;

pub use engine::{QueryResult, RagEngine};
pub use loader::IndexLoader;
pub use retrieval::{ContextRetriever, RetrievalRouter, RetrievedChunk};
