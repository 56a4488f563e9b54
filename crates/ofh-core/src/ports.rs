//! Collaborator interfaces
//!
//! The recovery procedure reads and mutates releases only through these
//! traits. Implement them to connect the procedure to a workflow engine.

use crate::error::EngineError;
use crate::model::{Comment, Release, Task, TaskDraft, Variable};

/// Release lookup
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ReleaseDirectory: Send + Sync {
    /// Load a release snapshot
    ///
    /// # Errors
    /// [`EngineError::NotFound`] when no release has this id.
    async fn get_release(&self, release_id: &str) -> Result<Release, EngineError>;
}

/// Phase mutations
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PhaseMutator: Send + Sync {
    /// Insert a task at a 0-based position in the phase's top-level tasks
    ///
    /// Returns the persisted task with its engine-assigned id.
    async fn add_task(
        &self,
        phase_id: &str,
        task: &TaskDraft,
        position: usize,
    ) -> Result<Task, EngineError>;
}

/// Task mutations
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TaskMutator: Send + Sync {
    async fn assign_task(&self, task_id: &str, user: &str) -> Result<(), EngineError>;

    async fn skip_task(&self, task_id: &str, comment: &Comment) -> Result<(), EngineError>;
}

/// Release variable registration
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VariableRegistrar: Send + Sync {
    async fn create_variable(&self, release_id: &str, variable: &Variable)
        -> Result<(), EngineError>;
}

/// A single client implementing every collaborator interface
pub trait ReleaseEngine: ReleaseDirectory + PhaseMutator + TaskMutator + VariableRegistrar {}

impl<T> ReleaseEngine for T where T: ReleaseDirectory + PhaseMutator + TaskMutator + VariableRegistrar {}
