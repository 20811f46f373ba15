//! Text Vectors CLI - Entry Point
//!
//! Minimal entry point that delegates to the command runner.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    text_vectors::run().await
}
