//! Rainfall error types.

use std::sync::Arc;

/// Errors from retrieving or decoding a rainfall snapshot.
#[derive(Debug, thiserror::Error)]
pub enum RainfallError {
    /// HTTP request failed (connection refused, DNS, body read, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The source did not answer within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// The source answered with a non-success status
    #[error("source returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// The body is not a rectangular grid of integers
    #[error("malformed rainfall grid at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// Local cache file could not be read or written
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// No rainfall snapshot is available for the requested time.
///
/// Non-fatal: the route planner falls back to distance-only weighting.
#[derive(Debug, Clone, thiserror::Error)]
#[error("rainfall snapshot {key} not available: {cause}")]
pub struct NotAvailable {
    pub key: String,
    #[source]
    pub cause: Arc<RainfallError>,
}

/// A coordinate maps to a cell outside the rainfall matrix.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("({lat}, {lon}) falls outside the {rows}x{cols} rainfall grid")]
pub struct OutOfBoundsError {
    pub lat: f64,
    pub lon: f64,
    pub rows: usize,
    pub cols: usize,
}
