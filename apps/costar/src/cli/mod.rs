//! # costar CLI
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show graph counts
//! - `ingest` - Ingest works by id, or a whole offline catalog
//! - `populate` - Ingest pages of popular works from TMDB
//! - `path` - Shortest chain between two works
//! - `migrate` - Replicate the store into another store
//! - `export` - Write a snapshot file
//! - `import` - Load a snapshot file into the store
//! - `init` - Initialize a new empty store

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use costar_core::{BackendKind, CostarError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// costar - shortest chain of shared cast members between two films
#[derive(Parser, Debug)]
#[command(name = "costar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ./costar.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the graph store
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: memory, file (snapshot file) or redb (ACID database)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<BackendKind>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Serve metadata from a local TMDB-shaped JSON catalog instead of TMDB
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Show graph counts
    Status,

    /// Ingest works and their credits
    Ingest {
        /// Work id to ingest (repeatable)
        #[arg(long = "id")]
        ids: Vec<String>,

        /// TMDB-shaped JSON catalog; without --id every entry is ingested
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Ingest pages of popular works from TMDB
    Populate {
        /// Number of discover pages (20 works each)
        #[arg(long, default_value = "1")]
        pages: u32,
    },

    /// Shortest chain of shared contributors between two works
    Path {
        /// Source work id
        #[arg(long)]
        from: String,

        /// Target work id
        #[arg(long)]
        to: String,

        /// Fetch from a local TMDB-shaped JSON catalog instead of TMDB
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Replicate the store into another store and verify counts
    Migrate {
        /// Destination path
        #[arg(long)]
        to: PathBuf,

        /// Destination backend
        #[arg(long, default_value = "redb")]
        to_backend: BackendKind,
    },

    /// Export the graph as a snapshot file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (canonical, json)
        #[arg(short = 't', long, default_value = "canonical")]
        format: String,
    },

    /// Import a snapshot file (binary or JSON) into the store
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new empty store
    Init {
        /// Overwrite an existing store
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration: file and environment, then global flags.
pub fn resolve_config(cli: &Cli) -> Result<AppConfig, CostarError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        config.store.path = database.clone();
    }
    if let Some(backend) = cli.backend {
        config.store.backend = backend;
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CostarError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server {
            host,
            port,
            catalog,
        }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config, catalog.as_deref()).await
        }
        Some(Commands::Status) => cmd_status(&config, json_mode),
        Some(Commands::Ingest { ids, catalog }) => {
            cmd_ingest(&config, json_mode, ids, catalog.as_deref()).await
        }
        Some(Commands::Populate { pages }) => cmd_populate(&config, json_mode, pages).await,
        Some(Commands::Path { from, to, catalog }) => {
            cmd_path(&config, json_mode, &from, &to, catalog.as_deref()).await
        }
        Some(Commands::Migrate { to, to_backend }) => {
            cmd_migrate(&config, json_mode, &to, to_backend)
        }
        Some(Commands::Export { output, format }) => cmd_export(&config, &output, &format),
        Some(Commands::Import { input }) => cmd_import(&config, json_mode, &input),
        Some(Commands::Init { force }) => cmd_init(&config, force),
        None => cmd_status(&config, json_mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "costar", "path", "--from", "603", "--to", "13", "-B", "memory", "--json-mode",
        ])
        .expect("parse");
        assert_eq!(cli.backend, Some(BackendKind::Memory));
        assert!(cli.json_mode);
        assert!(matches!(
            cli.command,
            Some(Commands::Path { ref from, ref to, .. }) if from == "603" && to == "13"
        ));
    }

    #[test]
    fn repeated_ids() {
        let cli = Cli::try_parse_from(["costar", "ingest", "--id", "1", "--id", "2"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Ingest { ref ids, catalog: None }) if ids == &["1", "2"]
        ));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["costar", "-B", "sqlite", "status"]).is_err());
    }

    #[test]
    fn migrate_defaults_to_redb() {
        let cli = Cli::try_parse_from(["costar", "migrate", "--to", "copy.redb"]).expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Migrate { to_backend: BackendKind::Redb, .. })
        ));
    }
}
