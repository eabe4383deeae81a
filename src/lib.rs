pub mod api;
pub mod collection;
pub mod config;
pub mod database;
pub mod document;
pub mod extract;
pub mod llm;
pub mod providers;
pub mod rag;

pub use collection::Collection;
pub use config::AppConfig;
