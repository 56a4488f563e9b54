//! Error types for the recovery procedure
//!
//! - [`EngineError`]: a collaborator call against the workflow engine failed
//! - [`HandlerError`]: the procedure stopped at a [`RecoveryStep`]
//!
//! Conditions under which the procedure simply does nothing (missing
//! parameters, unknown release, inapplicable topology, already handled)
//! are not errors; see [`Outcome`](crate::outcome::Outcome).

use std::fmt;

/// Workflow engine call failures
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Requested entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Engine answered with a non-success status
    #[error("{operation} rejected with status {status}: {message}")]
    Rejected {
        operation: String,
        status: u16,
        message: String,
    },

    /// Engine could not be reached
    #[error("transport error: {0}")]
    Transport(String),

    /// Engine response could not be understood
    #[error("malformed engine response: {0}")]
    Decode(String),

    /// An id or name cannot be addressed on the engine; nothing was sent
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Step of the recovery sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryStep {
    LookupRelease,
    CreateMarker,
    InsertPlaceholder,
    SkipFailed,
    SkipPending,
    SkipPlaceholder,
}

impl RecoveryStep {
    /// Whether earlier steps may already have changed the release
    #[inline]
    #[must_use]
    pub fn follows_mutation(self) -> bool {
        !matches!(self, Self::LookupRelease | Self::CreateMarker)
    }
}

impl fmt::Display for RecoveryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LookupRelease => "release lookup",
            Self::CreateMarker => "marker variable creation",
            Self::InsertPlaceholder => "placeholder insertion",
            Self::SkipFailed => "failed task skip",
            Self::SkipPending => "planned task skip",
            Self::SkipPlaceholder => "placeholder skip",
        };
        f.write_str(name)
    }
}

/// Recovery procedure failure
///
/// Every engine call is attempted once. A failure after
/// [`RecoveryStep::CreateMarker`] leaves the release partially drained.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{step} failed for release '{release_id}': {source}")]
    Engine {
        release_id: String,
        step: RecoveryStep,
        #[source]
        source: EngineError,
    },
}

impl HandlerError {
    #[inline]
    pub fn engine(release_id: impl Into<String>, step: RecoveryStep, source: EngineError) -> Self {
        Self::Engine {
            release_id: release_id.into(),
            step,
            source,
        }
    }

    /// Step the procedure stopped at
    #[inline]
    #[must_use]
    pub fn step(&self) -> RecoveryStep {
        match self {
            Self::Engine { step, .. } => *step,
        }
    }

    /// Whether the release may have been left partially mutated
    #[inline]
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.step().follows_mutation()
    }
}
