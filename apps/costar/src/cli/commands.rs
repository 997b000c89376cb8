//! # CLI Command Implementations

use crate::api::{self, AppState};
use crate::config::AppConfig;
use crate::tmdb::TmdbProvider;
use costar_core::{
    BackendKind, BatchReport, CostarError, FindPathResponse, GraphHandle, GraphSnapshot,
    MetadataProvider, Migrator, PathQuery, StaticProvider, UpsertEngine, export_snapshot,
    export_snapshot_json, import_into, import_snapshot, import_snapshot_json,
    primitives::MAX_SNAPSHOT_BYTES, snapshot_checksum,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Maximum size of an offline catalog (100 MB).
const MAX_CATALOG_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Read a regular file, refusing anything above `max_size`.
fn read_bounded(path: &Path, max_size: u64) -> Result<Vec<u8>, CostarError> {
    let canonical = path.canonicalize().map_err(|e| {
        CostarError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| CostarError::Io(format!("Cannot read file metadata: {}", e)))?;
    if !metadata.is_file() {
        return Err(CostarError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > max_size {
        return Err(CostarError::Validation(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    std::fs::read(&canonical)
        .map_err(|e| CostarError::Io(format!("Read {}: {}", path.display(), e)))
}

/// Output path with its parent directory resolved.
fn validate_output_path(path: &Path) -> Result<PathBuf, CostarError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize().map_err(|e| {
        CostarError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    let filename = path
        .file_name()
        .ok_or_else(|| CostarError::Io("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

fn print_json(value: &impl serde::Serialize) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// WIRING
// =============================================================================

/// Open the configured store.
pub fn open_store(config: &AppConfig) -> Result<GraphHandle, CostarError> {
    GraphHandle::open(config.store.backend, &config.store.path)
}

/// Offline catalog when given, TMDB otherwise.
pub fn build_provider(
    config: &AppConfig,
    catalog: Option<&Path>,
) -> Result<Arc<dyn MetadataProvider>, CostarError> {
    match catalog {
        Some(path) => {
            let data = read_bounded(path, MAX_CATALOG_FILE_SIZE)?;
            Ok(Arc::new(StaticProvider::from_tmdb_json(&data)?))
        }
        None => Ok(Arc::new(TmdbProvider::from_config(&config.provider)?)),
    }
}

fn build_engine(
    graph: GraphHandle,
    provider: Arc<dyn MetadataProvider>,
    config: &AppConfig,
) -> UpsertEngine {
    UpsertEngine::new(graph, provider).with_fetch_timeout(config.provider.timeout())
}

/// Print a batch outcome, save the store, and fail if any work failed.
fn finish_batch(
    graph: &GraphHandle,
    report: &BatchReport,
    json_mode: bool,
) -> Result<(), CostarError> {
    graph.save()?;
    if json_mode {
        print_json(report);
    } else {
        println!("Ingested {} works", report.ingested.len());
        for ingested in &report.ingested {
            println!(
                "  {} {} ({} credits, {} new edges)",
                ingested.work_id, ingested.title, ingested.credits, ingested.new_edges
            );
        }
        for (id, error) in &report.failed {
            println!("  FAILED {}: {}", id, error);
        }
    }
    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(CostarError::UpstreamFetch(format!(
            "{} of {} works failed",
            report.failed.len(),
            report.failed.len().saturating_add(report.ingested.len())
        )))
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig, catalog: Option<&Path>) -> Result<(), CostarError> {
    let graph = open_store(config)?;
    let provider = build_provider(config, catalog)?;
    let state = AppState::new(build_engine(graph, provider, config))
        .with_security(config.security.clone());

    println!("costar server starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", config.server.host);
    println!("  Port:     {}", config.server.port);
    println!("  Backend:  {}", config.store.backend);
    println!("  Database: {}", config.store.path.display());
    match catalog {
        Some(path) => println!("  Provider: catalog {}", path.display()),
        None => println!("  Provider: {}", config.provider.base_url),
    }
    println!();
    println!("Endpoints:");
    println!("  GET  /api/path?fromMovieId=&toMovieId= - Shortest chain");
    println!("  POST /works/{{id}}                       - Ingest one work");
    println!("  GET  /status                           - Graph counts");
    println!("  GET  /export                           - Snapshot");
    println!("  GET  /health                           - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    api::run_server(&addr, state).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show graph counts.
pub fn cmd_status(config: &AppConfig, json_mode: bool) -> Result<(), CostarError> {
    let graph = open_store(config)?;
    let counts = graph.counts()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": config.store.path.to_string_lossy(),
            "backend": config.store.backend,
            "works": counts.works,
            "contributors": counts.contributors,
            "edges": counts.edges,
        }));
        return Ok(());
    }

    println!("costar Graph Status");
    println!("===================");
    println!("Database:     {}", config.store.path.display());
    println!("Backend:      {}", config.store.backend);
    println!();
    println!("Works:        {}", counts.works);
    println!("Contributors: {}", counts.contributors);
    println!("Edges:        {}", counts.edges);
    Ok(())
}

// =============================================================================
// INGEST / POPULATE COMMANDS
// =============================================================================

/// Ingest the given ids, or the whole catalog when no id is given.
pub async fn cmd_ingest(
    config: &AppConfig,
    json_mode: bool,
    mut ids: Vec<String>,
    catalog: Option<&Path>,
) -> Result<(), CostarError> {
    if ids.is_empty() {
        let Some(path) = catalog else {
            return Err(CostarError::Validation(
                "nothing to ingest: pass --id or --catalog".to_string(),
            ));
        };
        let data = read_bounded(path, MAX_CATALOG_FILE_SIZE)?;
        ids = StaticProvider::from_tmdb_json(&data)?
            .ids()
            .map(str::to_string)
            .collect();
    }

    let graph = open_store(config)?;
    let provider = build_provider(config, catalog)?;
    let engine = build_engine(graph.clone(), provider, config);
    let report = engine.ensure_all(ids, config.provider.concurrency).await;
    finish_batch(&graph, &report, json_mode)
}

/// Ingest `pages` pages of popular works from TMDB.
pub async fn cmd_populate(
    config: &AppConfig,
    json_mode: bool,
    pages: u32,
) -> Result<(), CostarError> {
    let tmdb = TmdbProvider::from_config(&config.provider)?;

    let mut ids = Vec::new();
    for page in 1..=pages.max(1) {
        let found = tmdb.discover_popular(page).await?;
        tracing::info!(page, works = found.len(), "discovered popular works");
        ids.extend(found);
    }
    ids.sort();
    ids.dedup();

    let graph = open_store(config)?;
    let engine = build_engine(graph.clone(), Arc::new(tmdb), config);
    let report = engine.ensure_all(ids, config.provider.concurrency).await;
    finish_batch(&graph, &report, json_mode)
}

// =============================================================================
// PATH COMMAND
// =============================================================================

/// Fetch both works if needed and print the shortest chain.
pub async fn cmd_path(
    config: &AppConfig,
    json_mode: bool,
    from: &str,
    to: &str,
    catalog: Option<&Path>,
) -> Result<(), CostarError> {
    let graph = open_store(config)?;
    let provider = build_provider(config, catalog)?;
    let query = PathQuery::new(build_engine(graph.clone(), provider, config));

    let result = query.find_path(Some(from), Some(to)).await;
    graph.save()?;

    if json_mode {
        print_json(&FindPathResponse::from_result(&result));
        return result.map(|_| ());
    }

    let chain = result?;
    let degrees = chain.len().saturating_sub(1) / 2;
    println!("{} -> {}: {} degree(s)", from, to, degrees);
    for step in &chain {
        println!("  [{}] {} {}", step.kind, step.id, step.label);
    }
    Ok(())
}

// =============================================================================
// MIGRATE COMMAND
// =============================================================================

/// Replicate the configured store into `to`.
pub fn cmd_migrate(
    config: &AppConfig,
    json_mode: bool,
    to: &Path,
    to_backend: BackendKind,
) -> Result<(), CostarError> {
    if to_backend == config.store.backend && to == config.store.path.as_path() {
        return Err(CostarError::Validation(
            "destination is the source store".to_string(),
        ));
    }

    let source = open_store(config)?;
    let destination = GraphHandle::open(to_backend, to)?;
    let report = Migrator::migrate(&source, &destination)?;
    destination.save()?;

    if json_mode {
        print_json(&report);
    } else {
        println!(
            "Migrated {} works, {} contributors, {} edges to {} ({})",
            report.work_count,
            report.contributor_count,
            report.edge_count,
            to.display(),
            to_backend
        );
        if report.verified {
            println!("Destination counts verified");
        } else {
            println!(
                "WARNING: destination now holds {} works, {} contributors, {} edges",
                report.destination.works, report.destination.contributors, report.destination.edges
            );
        }
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write the graph as a snapshot file.
pub fn cmd_export(config: &AppConfig, output: &Path, format: &str) -> Result<(), CostarError> {
    let validated_output = validate_output_path(output)?;
    let snapshot = open_store(config)?.snapshot()?;

    let data = match format {
        "canonical" => {
            let data = export_snapshot(&snapshot)?;
            println!("Checksum: {}", snapshot_checksum(&snapshot));
            data
        }
        "json" => export_snapshot_json(&snapshot)?.into_bytes(),
        _ => {
            return Err(CostarError::Validation(format!(
                "Unknown format: {}. Use: canonical, json",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| CostarError::Io(format!("Write file: {}", e)))?;
    println!(
        "Exported {} bytes to {}",
        data.len(),
        validated_output.display()
    );
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Decode a snapshot file: binary first, JSON second.
pub fn decode_snapshot_file(data: &[u8]) -> Result<GraphSnapshot, CostarError> {
    match import_snapshot(data) {
        Ok(snapshot) => Ok(snapshot),
        Err(binary_err) => import_snapshot_json(data).map_err(|_| binary_err),
    }
}

/// Upsert every record of a snapshot file into the configured store.
pub fn cmd_import(config: &AppConfig, json_mode: bool, input: &Path) -> Result<(), CostarError> {
    let data = read_bounded(input, MAX_SNAPSHOT_BYTES as u64)?;
    let snapshot = decode_snapshot_file(&data)?;

    let graph = open_store(config)?;
    let report = import_into(&graph, &snapshot)?;
    graph.save()?;

    if json_mode {
        print_json(&report);
    } else {
        println!(
            "Imported {} works, {} contributors, {} new edges",
            report.works, report.contributors, report.new_edges
        );
    }
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create an empty store at the configured path.
pub fn cmd_init(config: &AppConfig, force: bool) -> Result<(), CostarError> {
    let path = &config.store.path;
    if config.store.backend == BackendKind::Memory {
        return Err(CostarError::Validation(
            "memory backend has nothing to initialize".to_string(),
        ));
    }
    if path.exists() {
        if !force {
            return Err(CostarError::Validation(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path)
            .map_err(|e| CostarError::Io(format!("Remove {}: {}", path.display(), e)))?;
    }

    let graph = open_store(config)?;
    graph.save()?;
    println!(
        "Initialized new {} store at {}",
        config.store.backend,
        path.display()
    );
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
