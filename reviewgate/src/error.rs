//! Error types for the `reviewgate` CLI.

use reviewgate_core::ConfigError;

/// Failures that end a CLI command with a non-zero exit code.
///
/// Guardrail failures are not errors; they are reported in the command output.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A verdict could not be rendered as JSON.
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),

    /// A background task panicked or was aborted.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
