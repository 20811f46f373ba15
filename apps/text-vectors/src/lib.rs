//! Text Vectors CLI
//!
//! Command line front end for the text vector store.
//!
//! ## Architecture
//!
//! ```text
//! text-vectors <command>
//!   ↓ (clap)
//! Cli (cli.rs)
//!   ↓ (bootstrap.rs: tracing → config → repository → service → initialize)
//! TextVectorService (domain layer)
//!   ↓
//! ┌─────────────┬────────────────────────┐
//! │ Qdrant      │ HttpEmbeddingGenerator │
//! └─────────────┴────────────────────────┘
//! ```
//!
//! Every command prints a single JSON document to stdout; logs go to stderr.
//!
//! ## Modules
//!
//! - `bootstrap`: Configuration loading and service construction
//! - `cli`: Argument parsing and command execution

pub mod bootstrap;
pub mod cli;

// Re-export for convenience
pub use cli::{Cli, Command, run};
