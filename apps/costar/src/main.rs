//! # costar
//!
//! Finds the shortest chain of shared cast members between two films.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                apps/costar (THE BINARY)                │
//! │                                                        │
//! │  ┌───────────┐   ┌────────────┐   ┌────────────────┐  │
//! │  │   CLI     │   │  HTTP API  │   │  TMDB client   │  │
//! │  │  (clap)   │   │  (axum)    │   │  (reqwest)     │  │
//! │  └─────┬─────┘   └─────┬──────┘   └───────┬────────┘  │
//! │        └───────────────┼──────────────────┘           │
//! │                        ▼                              │
//! │                ┌──────────────┐                       │
//! │                │ costar-core  │                       │
//! │                │ (THE LOGIC)  │                       │
//! │                └──────────────┘                       │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! costar server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! costar ingest --id 603 --id 604
//! costar path --from 603 --to 13
//! costar migrate --to backup.redb --to-backend redb
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // COSTAR_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("COSTAR_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "costar=info,costar_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = costar::cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = costar::cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
   ___  ___  ___ | |_  __ _  _ __
  / __|/ _ \/ __|| __|/ _` || '__|
 | (__| (_) \__ \| |_| (_| || |
  \___|\___/|___/ \__|\__,_||_|

  co-star path finder v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
