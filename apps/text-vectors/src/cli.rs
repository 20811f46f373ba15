//! Argument parsing and command execution

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_text_vectors::models::DEFAULT_SEARCH_LIMIT;
use domain_text_vectors::{CallContext, SearchParams, StoreRequest, TextVectorService, VectorError};
use eyre::{Result, WrapErr, bail};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::bootstrap::{self, AppConfig};

#[derive(Parser, Debug)]
#[command(name = "text-vectors")]
#[command(about = "Store short texts as embedding vectors and search them by similarity")]
pub struct Cli {
    /// Abort the command after this many seconds
    #[arg(long, global = true, env = "TEXT_VECTORS_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Check that the service initializes and the vector store answers
    Health,

    /// Show collection statistics and the active embedding model
    Stats,

    /// Embed and store a text
    Store {
        /// Text to embed
        text: String,

        /// Record id; a random one is generated when omitted
        #[arg(long)]
        id: Option<String>,

        /// JSON object stored alongside the text
        #[arg(long, value_parser = parse_metadata)]
        metadata: Option<Map<String, Value>>,
    },

    /// Fetch a record by id
    Get { id: String },

    /// Delete a record by id
    Delete { id: String },

    /// Find records similar to a text
    Search {
        text: String,

        #[command(flatten)]
        params: SearchArgs,
    },

    /// Find records similar to a stored record, excluding it
    Similar {
        id: String,

        #[command(flatten)]
        params: SearchArgs,
    },
}

#[derive(Args, Debug, Clone, Copy, PartialEq)]
pub struct SearchArgs {
    /// Maximum number of hits (capped at 100)
    #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: u32,

    /// Minimum cosine similarity of a hit
    #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub threshold: f32,
}

impl From<SearchArgs> for SearchParams {
    fn from(args: SearchArgs) -> Self {
        SearchParams::new(args.limit, args.threshold)
    }
}

fn parse_metadata(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("metadata must be a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}

impl Cli {
    /// Call context for this invocation, bounded by `--timeout-secs`.
    pub fn context(&self) -> CallContext {
        match self.timeout_secs {
            Some(secs) => CallContext::new().with_timeout(Duration::from_secs(secs)),
            None => CallContext::new(),
        }
    }
}

/// Parse arguments, build the service and run the selected command
pub async fn run() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    let environment = Environment::from_env();
    init_tracing(&environment);

    let config = AppConfig::from_env().wrap_err("Failed to load configuration")?;
    let service = bootstrap::build_service(&config)?;

    let ctx = cli.context();
    bootstrap::cancel_on_ctrl_c(ctx.cancellation_token().clone());

    let output = execute(&service, &ctx, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Runs one command against `service` and returns what should be printed.
pub async fn execute(
    service: &TextVectorService,
    ctx: &CallContext,
    command: Command,
) -> Result<Value> {
    if !matches!(command, Command::Health) {
        service
            .initialize(ctx)
            .await
            .wrap_err("Failed to initialize text vector service")?;
    }

    let output = match command {
        Command::Health => {
            if let Err(err) = service.initialize(ctx).await {
                warn!(error = %err, "Initialization failed");
            }
            if !service.health_check(ctx).await {
                bail!("Text vector service is unhealthy");
            }
            json!({ "healthy": true })
        }

        Command::Stats => serde_json::to_value(service.stats(ctx).await?)?,

        Command::Store { text, id, metadata } => {
            let mut request = StoreRequest::new(text);
            if let Some(id) = id {
                request = request.with_id(id);
            }
            if let Some(metadata) = metadata {
                request = request.with_metadata(metadata);
            }

            let id = service.store(ctx, request).await?;
            info!(%id, "Stored record");
            json!({ "id": id })
        }

        Command::Get { id } => {
            let record = service
                .get(ctx, &id)
                .await?
                .ok_or_else(|| VectorError::NotFound(id.clone()))?;
            serde_json::to_value(record)?
        }

        Command::Delete { id } => {
            let deleted = service.delete(ctx, &id).await?;
            json!({ "id": id, "deleted": deleted })
        }

        Command::Search { text, params } => {
            let hits = service.search(ctx, &text, params.into()).await?;
            serde_json::to_value(hits)?
        }

        Command::Similar { id, params } => {
            let hits = service
                .search_similar_to(ctx, &id, params.into())
                .await?
                .ok_or_else(|| VectorError::NotFound(id.clone()))?;
            serde_json::to_value(hits)?
        }
    };

    Ok(output)
}
