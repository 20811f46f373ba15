mod config;
mod http;
mod normalize;
mod orchestrator;
mod provider;

pub use config::{DEFAULT_MODEL, EmbeddingConfig, EmbeddingSource};
pub use http::HttpEmbeddingGenerator;
pub use normalize::{RawEmbedding, normalize};
pub use orchestrator::EmbeddingOrchestrator;
#[cfg(test)]
pub use provider::MockEmbeddingGenerator;
pub use provider::EmbeddingGenerator;
