//! Error types for the migration engine.

use crate::orchestrator::MigrationResult;
use thiserror::Error;

/// Main error type for migration operations.
///
/// Only fatal conditions surface through this type. Record-level transform
/// failures ([`crate::mapping::TransformError`]) and batch-level commit
/// failures are absorbed by the orchestrator and counted in the result.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, out of range values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source store unreachable or refusing our credentials
    #[error("Source unavailable: {message}")]
    SourceUnavailable { message: String },

    /// Target store unreachable or refusing our credentials
    #[error("Target unavailable: {message}")]
    TargetUnavailable { message: String },

    /// A fatal error terminated the run; the partial result is attached.
    #[error("Migration aborted: {cause}")]
    Aborted {
        #[source]
        cause: Box<MigrateError>,
        partial: Box<MigrationResult>,
    },

    /// A per-kind task panicked or was torn down by the runtime
    #[error("Task failed: {0}")]
    Task(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a SourceUnavailable error
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        MigrateError::SourceUnavailable {
            message: message.into(),
        }
    }

    /// Create a TargetUnavailable error
    pub fn target_unavailable(message: impl Into<String>) -> Self {
        MigrateError::TargetUnavailable {
            message: message.into(),
        }
    }

    /// Whether this error terminates a run.
    pub fn is_fatal(&self) -> bool {
        match self {
            MigrateError::SourceUnavailable { .. }
            | MigrateError::TargetUnavailable { .. }
            | MigrateError::Aborted { .. }
            | MigrateError::Task(_) => true,
            MigrateError::Config(_)
            | MigrateError::Io(_)
            | MigrateError::Yaml(_)
            | MigrateError::Json(_) => false,
        }
    }

    /// The partial result accumulated before a fatal abort, if any.
    pub fn partial_result(&self) -> Option<&MigrationResult> {
        match self {
            MigrateError::Aborted { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
