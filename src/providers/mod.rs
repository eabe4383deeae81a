pub mod openrouter;
pub mod traits;

pub use openrouter::openrouter::OpenRouterProvider;
pub use traits::CompletionProvider;
