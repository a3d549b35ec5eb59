//! Pipeline error taxonomy
//!
//! Faults are isolated per extension and per phase; nothing below the
//! orchestrator is permitted to abort a whole pipeline run. Timeouts and
//! cancellations are absorbed silently, everything else is surfaced as a
//! labeled, non-fatal diagnostic.

use thiserror::Error;

use crate::types::ExtensionKind;

/// Pipeline result type
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// A lifecycle call exceeded its deadline
    #[error("operation timed out")]
    Timeout,

    /// A lifecycle call was superseded by a newer request
    #[error("operation cancelled")]
    Cancelled,

    /// An extension lifecycle call failed
    #[error("{kind} {name} failed during {phase}: {message}")]
    ExtensionFault {
        kind: ExtensionKind,
        name: String,
        phase: &'static str,
        message: String,
    },

    /// A configured extension name has no registered implementation
    #[error("no {kind} named {name} is registered")]
    Resolution { kind: ExtensionKind, name: String },

    /// Malformed merge input; a programming error, not user-recoverable
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A host round-trip failed
    #[error("host error: {0}")]
    Host(String),
}

impl PipelineError {
    /// Whether this error is absorbed without a user-visible diagnostic.
    ///
    /// Only timeouts and cancellations qualify; every other variant is
    /// reported through the host's messaging channel.
    pub fn is_silent(&self) -> bool {
        matches!(self, PipelineError::Timeout | PipelineError::Cancelled)
    }

    /// Wrap an arbitrary extension failure, preserving silent variants.
    ///
    /// Timeouts and cancellations pass through unchanged so the orchestrator
    /// can keep absorbing them regardless of which phase produced them.
    pub fn extension_fault(
        kind: ExtensionKind,
        name: &str,
        phase: &'static str,
        source: PipelineError,
    ) -> PipelineError {
        if source.is_silent() {
            return source;
        }
        PipelineError::ExtensionFault {
            kind,
            name: name.to_string(),
            phase,
            message: source.to_string(),
        }
    }
}
