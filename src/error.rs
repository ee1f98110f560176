//! Error taxonomy for discovery, synthesis, and persisted state.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CartographError>;

/// Every failure the pipeline can name.
///
/// Only the variants returned from [`crate::scan::scan`] and the command
/// handlers abort a run. `Extraction`, `Cycle`, and `Conflict` are recovered
/// locally and surface as data (an `incomplete` component, a broken edge, a
/// topology conflict); they exist so those conditions render consistently
/// when logged.
#[derive(Debug, Error)]
pub enum CartographError {
    /// A single path could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An extractor claimed the file but could only recover part of it.
    #[error("partial extraction of {}: {reason}", path.display())]
    Extraction {
        /// File that was partially extracted.
        path: PathBuf,
        /// What made the extraction partial.
        reason: String,
    },

    /// A dependency cycle among services (broken automatically).
    #[error("dependency cycle among services: {}", members.join(" -> "))]
    Cycle {
        /// Service names along the cycle.
        members: Vec<String>,
    },

    /// More than one service claims a port.
    #[error("port {port} claimed by {}", claimants.join(", "))]
    Conflict {
        /// The contested port.
        port: u16,
        /// Component paths claiming it.
        claimants: Vec<String>,
    },

    /// The scan root is missing or unreadable; the only condition that aborts a scan.
    #[error("scan root {} is not readable: {reason}", path.display())]
    FatalRoot {
        /// The requested root.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid configuration (config file, environment, or flags).
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure serializing or parsing a persisted document.
    #[error("serialization error in {context}: {message}")]
    Serialization {
        /// What was being (de)serialized.
        context: String,
        /// Underlying message.
        message: String,
    },

    /// Persisted generation state is missing or unusable.
    #[error("state error: {0}")]
    State(String),

    /// A generation reference did not resolve.
    #[error("unknown generation '{0}'")]
    UnknownGeneration(String),
}

impl CartographError {
    /// Wraps a port-level error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a serialization error from any displayable cause.
    pub fn serialization(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Serialization {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Process exit code for an error that escaped to the top level.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_root_mentions_path() {
        let err = CartographError::FatalRoot {
            path: PathBuf::from("/nope"),
            reason: "not found".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/nope"));
        assert!(msg.contains("not found"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn cycle_joins_members() {
        let err = CartographError::Cycle {
            members: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle among services: a -> b -> a");
    }

    #[test]
    fn io_keeps_source() {
        let err = CartographError::io("/x", "boom".into());
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("boom"));
    }
}
