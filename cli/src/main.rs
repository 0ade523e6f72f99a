//! geobatch CLI: resolve place names to coordinates from the terminal.
//!
//! # Commands
//! ```text
//! geobatch lookup    <QUERY>
//! geobatch suggest   <QUERY> [--limit N]
//! geobatch batch     --input <FILE|-> [--input-format lines|csv] [--column NAME]
//!                    [--output FILE] [--format table|json|csv]
//! geobatch providers
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use geobatch_core::{normalize_query, ChainOutcome, FallbackChain};
use geobatch_providers::nominatim::{self, Nominatim};
use geobatch_providers::{build_chain, ProviderKind};

mod cmd_batch;
mod config;
mod input;
mod logging;
mod render;

use config::AppConfig;
use input::InputFormat;
use render::Format;

#[derive(Parser)]
#[command(
    name = "geobatch",
    about = "Batch geocoding through an ordered chain of providers",
    long_about = "
geobatch resolves institute names and addresses to coordinates. Each query
walks the configured backends in order, retrying transient failures, and
results always come back in input order.

ENVIRONMENT VARIABLES:
  GEOBATCH_CONFIG        Path to a JSON config file
  GOOGLE_MAPS_API_KEY    Google Geocoding API key
  GEOCODIO_API_KEY       Geocodio API key
  ARCGIS_API_KEY         ArcGIS token (optional)
  RUST_LOG               Overrides the log filter
",
    version
)]
struct Cli {
    /// JSON config file (backends, batch, http, log)
    #[arg(long, global = true, env = "GEOBATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Backend to use; repeat to build a chain (overrides the config file)
    #[arg(long = "backend", value_name = "KIND", global = true)]
    backends: Vec<ProviderKind>,

    /// Log level: trace | debug | info | warn | error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON structured logs on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single query through the chain
    Lookup {
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List Nominatim candidates for a query, universities first
    Suggest {
        query: String,
        /// Maximum candidates to request
        #[arg(long, default_value_t = nominatim::SUGGEST_LIMIT)]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Geocode a query list or CSV sheet, preserving input order
    Batch {
        /// Input file, or `-` for stdin
        #[arg(short, long)]
        input: String,
        #[arg(long, value_enum, default_value_t = InputFormat::Lines)]
        input_format: InputFormat,
        /// CSV column holding the queries
        #[arg(long, default_value = crate::input::DEFAULT_COLUMN)]
        column: String,
        /// Write results here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format [default: csv for CSV input, table otherwise]
        #[arg(long, value_enum)]
        format: Option<Format>,
        /// Queries in flight at once
        #[arg(long)]
        max_parallel: Option<usize>,
        /// Retries per backend on transient failures
        #[arg(long)]
        retry_limit: Option<u32>,
        /// Pause after every backend call, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// List built-in provider profiles
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    cfg.override_backends(&cli.backends);
    if let Some(level) = cli.log_level {
        cfg.log.level = level;
    }
    if cli.json_logs {
        cfg.log.json = true;
    }
    logging::init_tracing(&cfg.log)?;

    match cli.command {
        Commands::Lookup { query, json } => cmd_lookup(&cfg, &query, json).await,
        Commands::Suggest { query, limit, json } => cmd_suggest(&cfg, &query, limit, json).await,
        Commands::Batch {
            input,
            input_format,
            column,
            output,
            format,
            max_parallel,
            retry_limit,
            delay_ms,
        } => {
            let opts = cmd_batch::BatchOptions {
                input,
                input_format,
                column,
                output,
                format,
                max_parallel,
                retry_limit,
                delay_ms,
            };
            cmd_batch::run(cfg, opts).await
        }
        Commands::Providers => {
            cmd_providers();
            Ok(())
        }
    }
}

// ─── Command implementations ─────────────────────────────────────────────────

async fn cmd_lookup(cfg: &AppConfig, query: &str, as_json: bool) -> Result<()> {
    let Some(query) = normalize_query(query) else {
        bail!("query is empty");
    };
    let backends = build_chain(&cfg.backends, &cfg.http).context("invalid backend chain")?;
    let chain = FallbackChain::from_config(backends, &cfg.batch)?;

    let outcome = chain.resolve(query).await;
    if as_json {
        let value = match &outcome {
            ChainOutcome::Resolved {
                coordinate,
                backend,
                attempts,
            } => serde_json::json!({
                "query": query,
                "coordinate": coordinate,
                "backend": backend,
                "attempts": attempts,
            }),
            ChainOutcome::Exhausted { attempts } => serde_json::json!({
                "query": query,
                "coordinate": null,
                "attempts": attempts,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match outcome {
        ChainOutcome::Resolved {
            coordinate,
            backend,
            attempts,
        } => {
            println!("{query}");
            println!("  coordinate: {coordinate}");
            println!("  backend:    {backend}");
            println!("  attempts:   {attempts}");
        }
        ChainOutcome::Exhausted { attempts } => {
            println!(
                "{query}: not found ({attempts} attempts across {})",
                chain.backend_names().join(", ")
            );
        }
    }
    Ok(())
}

async fn cmd_suggest(cfg: &AppConfig, query: &str, limit: u32, as_json: bool) -> Result<()> {
    let Some(query) = normalize_query(query) else {
        bail!("query is empty");
    };

    let mut api = Nominatim::new().with_limit(limit);
    if let Some(base) = cfg.nominatim().and_then(|s| s.base_url.as_deref()) {
        api = api.with_base_url(base);
    }
    let geocoder = nominatim::http_client(api, &cfg.http)?;
    let candidates = nominatim::suggest(&geocoder, query)
        .await
        .with_context(|| format!("nominatim lookup for '{query}' failed"))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else if candidates.is_empty() {
        println!("No suggestions for '{query}'");
    } else {
        print!("{}", render::candidates(&candidates));
    }
    Ok(())
}

fn cmd_providers() {
    println!("Built-in provider profiles:\n");
    for kind in ProviderKind::ALL {
        let key = match (kind.requires_key(), kind.key_env()) {
            (true, Some(var)) => format!("key required ({var})"),
            (false, Some(var)) => format!("key optional ({var})"),
            _ => "no key".to_string(),
        };
        println!("  {:<10} {:<38} {}", kind.as_str(), key, kind.description());
    }
}
