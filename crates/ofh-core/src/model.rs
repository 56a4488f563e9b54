//! Release domain model
//!
//! Read model of a release as the recovery procedure sees it:
//! - [`Release`] with its ordered [`Phase`]s and [`Variable`]s
//! - [`Task`] trees, where group containers own their children
//! - [`TaskDraft`] and [`Comment`] values handed to the mutation ports
//!
//! Persistence belongs to the workflow engine. These types are snapshots
//! populated by a [`ReleaseDirectory`](crate::ports::ReleaseDirectory).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Task lifecycle status as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Planned,
    Pending,
    InProgress,
    Queued,
    Completed,
    CompletedInAdvance,
    Skipped,
    SkippedInAdvance,
    Failed,
    Failing,
    WaitingForInput,
    Aborted,
    /// Any status this crate does not act on
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Check if the task has failed
    #[inline]
    #[must_use]
    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Check if the task is still planned
    #[inline]
    #[must_use]
    pub fn is_planned(self) -> bool {
        matches!(self, Self::Planned)
    }

    /// Check if the task is running
    #[inline]
    #[must_use]
    pub fn is_in_progress(self) -> bool {
        matches!(self, Self::InProgress)
    }
}

/// Phase status as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseStatus {
    Planned,
    InProgress,
    Completed,
    Failing,
    Failed,
    Skipped,
    Aborted,
    #[serde(other)]
    Unknown,
}

impl PhaseStatus {
    /// Check if the phase has failed
    #[inline]
    #[must_use]
    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Task type tag
///
/// Set by the read model of the collaborator that loaded the release.
/// Only the distinctions the recovery procedure acts on are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// Manual task, waits for a human
    Manual,
    /// Container whose children run in parallel
    ParallelGroup,
    /// Any other task type
    Other,
}

/// A unit of work inside a phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub owner: Option<String>,
    /// Nested tasks, only populated for group containers
    #[serde(default)]
    pub children: Vec<Task>,
}

impl Task {
    /// Create new task without owner or children
    #[inline]
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        kind: TaskKind,
        status: TaskStatus,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            status,
            owner: None,
            children: Vec::new(),
        }
    }

    /// With owner
    #[inline]
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// With nested tasks
    #[inline]
    #[must_use]
    pub fn with_children(mut self, children: Vec<Task>) -> Self {
        self.children = children;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status.is_failed()
    }

    #[inline]
    #[must_use]
    pub fn is_planned(&self) -> bool {
        self.status.is_planned()
    }

    #[inline]
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.status.is_in_progress()
    }

    /// Parallel groups are structural and never transitioned directly
    #[inline]
    #[must_use]
    pub fn is_parallel_group(&self) -> bool {
        self.kind == TaskKind::ParallelGroup
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Task>) {
        out.push(self);
        for child in &self.children {
            child.collect_into(out);
        }
    }
}

/// An ordered stage of a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub title: String,
    pub status: PhaseStatus,
    /// Top-level tasks in execution order
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Phase {
    /// Create new empty phase
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, status: PhaseStatus) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status,
            tasks: Vec::new(),
        }
    }

    /// With top-level tasks
    #[inline]
    #[must_use]
    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status.is_failed()
    }

    /// Every task in the phase, containers before their children
    #[must_use]
    pub fn all_tasks(&self) -> Vec<&Task> {
        let mut out = Vec::new();
        for task in &self.tasks {
            task.collect_into(&mut out);
        }
        out
    }

    /// Index of the first failed top-level task
    #[must_use]
    pub fn first_failed_task(&self) -> Option<(usize, &Task)> {
        self.tasks.iter().enumerate().find(|(_, task)| task.is_failed())
    }
}

/// Variable value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    Boolean,
    String,
    Integer,
}

/// A release variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub kind: VariableKind,
    pub value: serde_json::Value,
    pub required: bool,
    pub label: Option<String>,
    pub description: Option<String>,
}

impl Variable {
    /// Create optional boolean variable
    #[inline]
    #[must_use]
    pub fn boolean(key: impl Into<String>, value: bool) -> Self {
        Self {
            key: key.into(),
            kind: VariableKind::Boolean,
            value: serde_json::Value::Bool(value),
            required: false,
            label: None,
            description: None,
        }
    }

    /// Mark whether a value is required
    #[inline]
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// With label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A single run of a multi-phase workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl Release {
    /// Create new release without phases or variables
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            phases: Vec::new(),
            variables: Vec::new(),
        }
    }

    /// With phases
    #[inline]
    #[must_use]
    pub fn with_phases(mut self, phases: Vec<Phase>) -> Self {
        self.phases = phases;
        self
    }

    /// With variables
    #[inline]
    #[must_use]
    pub fn with_variables(mut self, variables: Vec<Variable>) -> Self {
        self.variables = variables;
        self
    }

    /// Phases in sequence order
    #[inline]
    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Every task of every phase, in phase order
    #[must_use]
    pub fn all_tasks(&self) -> Vec<&Task> {
        self.phases.iter().flat_map(Phase::all_tasks).collect()
    }

    /// Names of the variables already attached
    #[must_use]
    pub fn variable_keys(&self) -> BTreeSet<&str> {
        self.variables.iter().map(|v| v.key.as_str()).collect()
    }

    #[inline]
    #[must_use]
    pub fn has_variable(&self, key: &str) -> bool {
        self.variables.iter().any(|v| v.key == key)
    }

    /// First phase whose title matches exactly
    #[must_use]
    pub fn phase_titled(&self, title: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.title == title)
    }

    #[must_use]
    pub fn has_failed_phase(&self) -> bool {
        self.phases.iter().any(Phase::is_failed)
    }

    #[must_use]
    pub fn first_failed_phase(&self) -> Option<&Phase> {
        self.phases.iter().find(|p| p.is_failed())
    }
}

/// A task not yet persisted by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub kind: TaskKind,
    pub title: String,
    pub description: Option<String>,
    pub owner: Option<String>,
}

impl TaskDraft {
    /// Create manual task draft
    #[inline]
    #[must_use]
    pub fn manual(title: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::Manual,
            title: title.into(),
            description: None,
            owner: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// Annotation attached to a task transition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

impl Comment {
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
