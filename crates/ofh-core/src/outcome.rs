//! Procedure outcomes
//!
//! Every invocation that does not hit a collaborator failure ends in an
//! [`Outcome`]. Callers only see [`Outcome::message`]; the structured
//! variants exist for logging and tests.

use crate::request::{ON_FAILURE_USER_PARAM, RELEASE_ID_PARAM};
use serde::Serialize;

/// What a successful recovery did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    pub release_id: String,
    pub placeholder_task_id: String,
    pub placeholder_phase_id: String,
    pub placeholder_position: usize,
    /// Failed tasks skipped without reassignment
    pub skipped_failed: Vec<String>,
    /// Planned or in-progress tasks assigned and skipped
    pub skipped_pending: Vec<String>,
}

/// Result of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A required parameter was absent; holds its name
    MissingParameter(&'static str),
    ReleaseNotFound { release_id: String },
    /// The release has no phase with the recovery title
    NoRecoveryPhase { phase_title: String },
    NoFailedPhase,
    AlreadyInvoked,
    /// The first failed phase holds no failed top-level task
    StructuralAnomaly {
        release_id: String,
        phase_title: String,
    },
    Recovered(RecoveryReport),
}

impl Outcome {
    #[inline]
    #[must_use]
    pub fn missing_release_id() -> Self {
        Self::MissingParameter(RELEASE_ID_PARAM)
    }

    #[inline]
    #[must_use]
    pub fn missing_user() -> Self {
        Self::MissingParameter(ON_FAILURE_USER_PARAM)
    }

    /// Human-readable status returned to the caller
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::MissingParameter(name) => {
                format!("Required parameter '{name}' missing. Doing nothing")
            }
            Self::ReleaseNotFound { release_id } => {
                format!("Release '{release_id}' not found. Doing nothing")
            }
            Self::NoRecoveryPhase { phase_title } => format!(
                "onFailure handler does not apply to this release as there is no phase named '{phase_title}'. Doing nothing"
            ),
            Self::NoFailedPhase => {
                "onFailure handler does not apply to this release as there is no failed phase. Doing nothing"
                    .to_string()
            }
            Self::AlreadyInvoked => {
                "onFailure handler already invoked for this release. Doing nothing".to_string()
            }
            Self::StructuralAnomaly {
                release_id,
                phase_title,
            } => format!(
                "onFailure handler cannot recover release '{release_id}': failed phase '{phase_title}' contains no failed task. Doing nothing"
            ),
            Self::Recovered(report) => format!(
                "Successfully executed onFailure handler for release '{}'",
                report.release_id
            ),
        }
    }

    /// Whether the release was changed
    #[inline]
    #[must_use]
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered(_))
    }

    #[inline]
    #[must_use]
    pub fn report(&self) -> Option<&RecoveryReport> {
        match self {
            Self::Recovered(report) => Some(report),
            _ => None,
        }
    }
}
