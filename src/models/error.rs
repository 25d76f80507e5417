//! Error types for bias-probe.
//!
//! Failures fall into three groups:
//! - Setup failures (config, credentials, input directory): fatal before any query
//! - Input failures (unreadable or malformed tables): fatal for the run
//! - Query failures (network, timeout, API): retried, then recorded as data

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for bias-probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    // ═══════════════════════════════════════════════════════════════════
    // SETUP — the run cannot start
    // ═══════════════════════════════════════════════════════════════════
    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Cannot read input directory {path}: {source}")]
    InputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // INPUT — a question table is unusable
    // ═══════════════════════════════════════════════════════════════════
    #[error("Malformed table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Table {path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Table {path} line {line}: {found} fields, header has {expected}")]
    ExtraFields {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    // ═══════════════════════════════════════════════════════════════════
    // QUERY — remote call failed (retryable)
    // ═══════════════════════════════════════════════════════════════════
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Parse error: {0}")]
    Parse(String),

    // ═══════════════════════════════════════════════════════════════════
    // OUTPUT
    // ═══════════════════════════════════════════════════════════════════
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Report rendering failed: {0}")]
    Report(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Chat-completion API specific errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Response contained no choices")]
    EmptyChoices,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProbeError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias for bias-probe.
pub type Result<T> = std::result::Result<T, ProbeError>;
