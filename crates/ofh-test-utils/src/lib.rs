//! Testing utilities for the OFH workspace
//!
//! Shared fixtures and an in-memory release engine that applies and
//! records every collaborator call.

#![allow(missing_docs)]

use ofh_core::{
    Comment, EngineError, Phase, PhaseMutator, PhaseStatus, Release, ReleaseDirectory, Task,
    TaskDraft, TaskKind, TaskMutator, TaskStatus, Variable, VariableRegistrar,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// A collaborator call seen by [`InMemoryEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    GetRelease(String),
    CreateVariable {
        release_id: String,
        key: String,
    },
    AddTask {
        phase_id: String,
        position: usize,
        title: String,
        owner: Option<String>,
    },
    AssignTask {
        task_id: String,
        user: String,
    },
    SkipTask {
        task_id: String,
        comment: String,
    },
}

impl EngineCall {
    /// Whether the call changes engine state
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::GetRelease(_))
    }
}

#[derive(Debug, Default)]
struct EngineState {
    releases: HashMap<String, Release>,
    calls: Vec<EngineCall>,
    next_task: usize,
    failing_skips: Vec<String>,
    latency: Option<Duration>,
}

/// Release engine kept in memory
///
/// Mutations are applied to the stored releases, so a second invocation
/// observes the effects of the first.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: Mutex<EngineState>,
}

impl InMemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create engine holding the given releases
    #[must_use]
    pub fn with_releases(releases: impl IntoIterator<Item = Release>) -> Self {
        let engine = Self::new();
        for release in releases {
            engine.insert(release);
        }
        engine
    }

    pub fn insert(&self, release: Release) {
        self.state.lock().releases.insert(release.id.clone(), release);
    }

    /// Snapshot of a stored release
    #[must_use]
    pub fn release(&self, id: &str) -> Option<Release> {
        self.state.lock().releases.get(id).cloned()
    }

    /// Every call received so far
    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().calls.clone()
    }

    /// Calls that changed state
    #[must_use]
    pub fn mutations(&self) -> Vec<EngineCall> {
        self.calls().into_iter().filter(EngineCall::is_mutation).collect()
    }

    /// Make every skip of this task fail
    pub fn fail_skips_of(&self, task_id: impl Into<String>) {
        self.state.lock().failing_skips.push(task_id.into());
    }

    /// Delay every call, as a remote engine would
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = Some(latency);
    }

    async fn pause(&self) {
        let latency = self.state.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn with_task<R>(
        &self,
        task_id: &str,
        f: impl FnOnce(&mut Task) -> R,
    ) -> Result<R, EngineError> {
        let mut state = self.state.lock();
        state
            .releases
            .values_mut()
            .flat_map(|r| r.phases.iter_mut())
            .flat_map(|p| p.tasks.iter_mut())
            .find_map(|t| find_task_mut(t, task_id))
            .map(f)
            .ok_or_else(|| EngineError::NotFound(task_id.to_string()))
    }
}

fn find_task_mut<'a>(task: &'a mut Task, id: &str) -> Option<&'a mut Task> {
    if task.id == id {
        return Some(task);
    }
    task.children.iter_mut().find_map(|c| find_task_mut(c, id))
}

#[async_trait::async_trait]
impl ReleaseDirectory for InMemoryEngine {
    async fn get_release(&self, release_id: &str) -> Result<Release, EngineError> {
        self.pause().await;
        let mut state = self.state.lock();
        state.calls.push(EngineCall::GetRelease(release_id.to_string()));
        state
            .releases
            .get(release_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(release_id.to_string()))
    }
}

#[async_trait::async_trait]
impl PhaseMutator for InMemoryEngine {
    async fn add_task(
        &self,
        phase_id: &str,
        task: &TaskDraft,
        position: usize,
    ) -> Result<Task, EngineError> {
        self.pause().await;
        let mut state = self.state.lock();
        state.calls.push(EngineCall::AddTask {
            phase_id: phase_id.to_string(),
            position,
            title: task.title.clone(),
            owner: task.owner.clone(),
        });
        state.next_task += 1;
        let id = format!("{phase_id}/Task{}", 1000 + state.next_task);

        let phase = state
            .releases
            .values_mut()
            .flat_map(|r| r.phases.iter_mut())
            .find(|p| p.id == phase_id)
            .ok_or_else(|| EngineError::NotFound(phase_id.to_string()))?;

        let mut created = Task::new(id, task.title.clone(), task.kind, TaskStatus::Planned);
        created.owner = task.owner.clone();
        let index = position.min(phase.tasks.len());
        phase.tasks.insert(index, created.clone());
        Ok(created)
    }
}

#[async_trait::async_trait]
impl TaskMutator for InMemoryEngine {
    async fn assign_task(&self, task_id: &str, user: &str) -> Result<(), EngineError> {
        self.pause().await;
        self.state.lock().calls.push(EngineCall::AssignTask {
            task_id: task_id.to_string(),
            user: user.to_string(),
        });
        self.with_task(task_id, |t| t.owner = Some(user.to_string()))
    }

    async fn skip_task(&self, task_id: &str, comment: &Comment) -> Result<(), EngineError> {
        self.pause().await;
        {
            let mut state = self.state.lock();
            state.calls.push(EngineCall::SkipTask {
                task_id: task_id.to_string(),
                comment: comment.text.clone(),
            });
            if state.failing_skips.iter().any(|id| id == task_id) {
                return Err(EngineError::Rejected {
                    operation: "skip task".to_string(),
                    status: 500,
                    message: format!("injected failure for {task_id}"),
                });
            }
        }
        self.with_task(task_id, |t| t.status = TaskStatus::Skipped)
    }
}

#[async_trait::async_trait]
impl VariableRegistrar for InMemoryEngine {
    async fn create_variable(
        &self,
        release_id: &str,
        variable: &Variable,
    ) -> Result<(), EngineError> {
        self.pause().await;
        let mut state = self.state.lock();
        state.calls.push(EngineCall::CreateVariable {
            release_id: release_id.to_string(),
            key: variable.key.clone(),
        });
        let release = state
            .releases
            .get_mut(release_id)
            .ok_or_else(|| EngineError::NotFound(release_id.to_string()))?;
        if release.has_variable(&variable.key) {
            return Err(EngineError::Rejected {
                operation: "create variable".to_string(),
                status: 400,
                message: format!("variable {} already exists", variable.key),
            });
        }
        release.variables.push(variable.clone());
        Ok(())
    }
}

pub fn task(id: &str, status: TaskStatus) -> Task {
    Task::new(id, id, TaskKind::Other, status)
}

pub fn parallel_group(id: &str, status: TaskStatus, children: Vec<Task>) -> Task {
    Task::new(id, id, TaskKind::ParallelGroup, status).with_children(children)
}

pub fn phase(id: &str, title: &str, status: PhaseStatus, tasks: Vec<Task>) -> Phase {
    Phase::new(id, title, status).with_tasks(tasks)
}

/// `Applications/Rel1`: Deploy(failed: A failed), Verify(planned: B planned),
/// onFailure(empty)
pub fn failed_release() -> Release {
    Release::new("Applications/Rel1", "Rel1").with_phases(vec![
        phase(
            "Applications/Rel1/Phase1",
            "Deploy",
            PhaseStatus::Failed,
            vec![task("Applications/Rel1/Phase1/Task1", TaskStatus::Failed)],
        ),
        phase(
            "Applications/Rel1/Phase2",
            "Verify",
            PhaseStatus::Planned,
            vec![task("Applications/Rel1/Phase2/Task1", TaskStatus::Planned)],
        ),
        phase(
            "Applications/Rel1/Phase3",
            "onFailure",
            PhaseStatus::Planned,
            vec![],
        ),
    ])
}
