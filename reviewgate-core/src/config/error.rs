//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors.
///
/// Construction of any component with an invalid configuration fails fast
/// with one of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    // ─────────────────────────────────────────────────────────────────────────
    // Human review
    // ─────────────────────────────────────────────────────────────────────────
    /// Review timeout must be positive.
    #[error("invalid review timeout {timeout:?}: must be > 0")]
    InvalidTimeout { timeout: std::time::Duration },

    /// Queue must hold at least one request.
    #[error("invalid max_queue_size {size}: must be > 0")]
    InvalidQueueSize { size: usize },

    /// Poll interval must be positive.
    #[error("invalid poll_interval {interval:?}: must be > 0")]
    InvalidPollInterval { interval: std::time::Duration },

    /// Sweep interval must be positive.
    #[error("invalid sweep_interval {interval:?}: must be > 0")]
    InvalidSweepInterval { interval: std::time::Duration },

    // ─────────────────────────────────────────────────────────────────────────
    // Filters
    // ─────────────────────────────────────────────────────────────────────────
    /// Toxicity threshold must be a finite, non-negative number.
    #[error("invalid toxicity threshold {value}: must be finite and >= 0.0")]
    InvalidThreshold { value: f64 },

    /// Content length bounds are inverted.
    #[error("invalid content length bounds: min {min} > max {max}")]
    InvalidLengthBounds { min: usize, max: usize },

    /// A business rule pattern failed to compile.
    #[error("invalid pattern in rule '{rule}': {message}")]
    InvalidPattern { rule: String, message: String },

    /// A keyword list that drives a check is empty.
    #[error("keyword list '{list}' must not be empty")]
    EmptyKeywords { list: &'static str },

    // ─────────────────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────────────────
    /// Explicit config path does not exist.
    #[error("config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    /// Config file has no content.
    #[error("config file is empty")]
    EmptyConfigFile,

    /// IO error while reading the config file.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
