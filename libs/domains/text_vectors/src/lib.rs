//! Text Vector Domain Library
//!
//! Stores short texts as fixed-length embedding vectors and answers
//! nearest-neighbour queries over them, addressing records by caller-chosen
//! ids instead of the store's native keys.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │ TextVectorService  │  ← Initialization gate, text in / records out
//! └───┬───────────┬────┘
//!     │           │
//! ┌───▼───────────▼────┐     ┌───────────────────────┐
//! │ SimilaritySearch   │     │ EmbeddingOrchestrator │
//! │ VectorRecordStore  │     │   (local → remote)    │
//! └─────────┬──────────┘     └──────────┬────────────┘
//!           │                           │
//! ┌─────────▼──────────┐     ┌──────────▼────────────┐
//! │ VectorRepository   │     │ EmbeddingGenerator    │
//! │   (trait)          │     │   (trait)             │
//! └─────────┬──────────┘     └──────────┬────────────┘
//!           │                           │
//! ┌─────────▼──────────┐     ┌──────────▼────────────┐
//! │ QdrantRepository   │     │ HttpEmbeddingGenerator│
//! │ InMemoryRepository │     └───────────────────────┘
//! └────────────────────┘
//! ```
//!
//! # Features
//!
//! - **Stable identity**: caller ids map to deterministic UUID storage keys
//! - **Records**: store, batch store (all-or-nothing), get, delete
//! - **Search**: by text or by an existing record, with the source excluded
//! - **Cancellation**: every upstream call honours a [`CallContext`]
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_text_vectors::{
//!     CallContext, EmbeddingConfig, EmbeddingOrchestrator, QdrantConfig, QdrantRepository,
//!     SearchParams, StoreConfig, StoreRequest, TextVectorService,
//! };
//! use core_config::FromEnv;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StoreConfig::from_env()?;
//! let repository = QdrantRepository::new(QdrantConfig::from_env()?)?;
//! let embeddings = EmbeddingOrchestrator::from_config(&EmbeddingConfig::from_env()?, store.dimension)?;
//!
//! let service = TextVectorService::new(Arc::new(repository), embeddings, store);
//! let ctx = CallContext::new();
//! service.initialize(&ctx).await?;
//!
//! service
//!     .store(&ctx, StoreRequest::new("Rust is a systems language").with_id("doc_001"))
//!     .await?;
//! let hits = service.search(&ctx, "systems programming", SearchParams::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod identity;
pub mod memory;
pub mod models;
pub mod qdrant;
pub mod records;
pub mod repository;
pub mod search;
pub mod service;

// Re-export commonly used types
pub use config::StoreConfig;
pub use context::{CallContext, Readiness};
pub use embedding::{
    EmbeddingConfig, EmbeddingGenerator, EmbeddingOrchestrator, EmbeddingSource,
    HttpEmbeddingGenerator, RawEmbedding,
};
pub use error::{BatchItemError, ErrorKind, UpstreamError, VectorError, VectorResult};
pub use memory::InMemoryVectorRepository;
pub use models::{
    CollectionInfo, CollectionSpec, CollectionStats, CollectionStatus, DistanceMetric,
    NewVectorRecord, PayloadFilter, Point, SearchHit, SearchParams, SearchQuery, SearchResult,
    StoreRequest, VectorRecord,
};
pub use qdrant::{QdrantConfig, QdrantRepository};
pub use records::VectorRecordStore;
pub use repository::VectorRepository;
pub use search::SimilaritySearch;
pub use service::TextVectorService;
