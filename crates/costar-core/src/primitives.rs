//! # Fixed Limits
//!
//! Compile-time constants shared by the store, the ingestion engine and the
//! snapshot codec. None of these are tunable at runtime except the fetch
//! timeout default, which callers may override.

/// Maximum byte length of a work or contributor identifier.
pub const MAX_ID_LENGTH: usize = 256;

/// Maximum byte length of a title, name or image path.
pub const MAX_LABEL_LENGTH: usize = 4096;

/// Maximum number of credits accepted from a single metadata response.
///
/// Larger casts are truncated after sorting by billing order.
pub const MAX_CREDITS_PER_WORK: usize = 2000;

/// Default upper bound on a single metadata fetch, in milliseconds.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes at the start of every binary snapshot.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"CSTR";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot layout.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Upper bound on snapshot size accepted by import (500 MB).
pub const MAX_SNAPSHOT_BYTES: usize = 500 * 1024 * 1024;

/// Upper bound on nodes accepted by import.
pub const MAX_IMPORT_NODES: usize = 10_000_000;

/// Upper bound on edges accepted by import.
pub const MAX_IMPORT_EDGES: usize = 50_000_000;
