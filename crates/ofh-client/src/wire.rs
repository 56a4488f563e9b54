//! Engine JSON representation
//!
//! Field names follow the engine's v1 REST API. Type names are resolved to
//! [`TaskKind`] / [`VariableKind`] here and nowhere else.

use ofh_core::{
    Phase, PhaseStatus, Release, Task, TaskDraft, TaskKind, TaskStatus, Variable, VariableKind,
};
use serde::{Deserialize, Serialize};

pub(crate) const MANUAL_TASK_TYPE: &str = "xlrelease.Task";
pub(crate) const PARALLEL_GROUP_TYPE: &str = "xlrelease.ParallelGroup";
pub(crate) const GENERIC_TASK_TYPE: &str = "xlrelease.CustomScriptTask";
pub(crate) const BOOLEAN_VARIABLE_TYPE: &str = "xlrelease.BooleanVariable";
pub(crate) const STRING_VARIABLE_TYPE: &str = "xlrelease.StringVariable";
pub(crate) const INTEGER_VARIABLE_TYPE: &str = "xlrelease.IntegerVariable";

pub(crate) fn task_kind(type_name: &str) -> TaskKind {
    match type_name {
        MANUAL_TASK_TYPE => TaskKind::Manual,
        PARALLEL_GROUP_TYPE => TaskKind::ParallelGroup,
        _ => TaskKind::Other,
    }
}

pub(crate) fn task_type_name(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Manual => MANUAL_TASK_TYPE,
        TaskKind::ParallelGroup => PARALLEL_GROUP_TYPE,
        TaskKind::Other => GENERIC_TASK_TYPE,
    }
}

fn variable_kind(type_name: &str) -> VariableKind {
    match type_name {
        BOOLEAN_VARIABLE_TYPE => VariableKind::Boolean,
        INTEGER_VARIABLE_TYPE => VariableKind::Integer,
        _ => VariableKind::String,
    }
}

fn variable_type_name(kind: VariableKind) -> &'static str {
    match kind {
        VariableKind::Boolean => BOOLEAN_VARIABLE_TYPE,
        VariableKind::String => STRING_VARIABLE_TYPE,
        VariableKind::Integer => INTEGER_VARIABLE_TYPE,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReleaseDto {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    phases: Vec<PhaseDto>,
    #[serde(default)]
    variables: Vec<VariableDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhaseDto {
    id: String,
    #[serde(default)]
    title: String,
    status: PhaseStatus,
    #[serde(default)]
    tasks: Vec<TaskDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskDto {
    id: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    title: String,
    status: TaskStatus,
    #[serde(default)]
    owner: Option<String>,
    /// Children of group containers
    #[serde(default)]
    tasks: Vec<TaskDto>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariableDto {
    key: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    requires_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewTaskDto<'a> {
    #[serde(rename = "type")]
    type_name: &'static str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommentDto<'a> {
    pub(crate) comment: &'a str,
}

impl From<ReleaseDto> for Release {
    fn from(dto: ReleaseDto) -> Self {
        Release::new(dto.id, dto.title)
            .with_phases(dto.phases.into_iter().map(Phase::from).collect())
            .with_variables(dto.variables.into_iter().map(Variable::from).collect())
    }
}

impl From<PhaseDto> for Phase {
    fn from(dto: PhaseDto) -> Self {
        Phase::new(dto.id, dto.title, dto.status)
            .with_tasks(dto.tasks.into_iter().map(Task::from).collect())
    }
}

impl From<TaskDto> for Task {
    fn from(dto: TaskDto) -> Self {
        Task {
            id: dto.id,
            title: dto.title,
            kind: task_kind(&dto.type_name),
            status: dto.status,
            owner: dto.owner,
            children: dto.tasks.into_iter().map(Task::from).collect(),
        }
    }
}

impl From<VariableDto> for Variable {
    fn from(dto: VariableDto) -> Self {
        Variable {
            key: dto.key,
            kind: variable_kind(&dto.type_name),
            value: dto.value,
            required: dto.requires_value,
            label: dto.label,
            description: dto.description,
        }
    }
}

impl From<&Variable> for VariableDto {
    fn from(variable: &Variable) -> Self {
        Self {
            key: variable.key.clone(),
            type_name: variable_type_name(variable.kind).to_string(),
            value: variable.value.clone(),
            requires_value: variable.required,
            label: variable.label.clone(),
            description: variable.description.clone(),
        }
    }
}

impl<'a> From<&'a TaskDraft> for NewTaskDto<'a> {
    fn from(draft: &'a TaskDraft) -> Self {
        Self {
            type_name: task_type_name(draft.kind),
            title: &draft.title,
            description: draft.description.as_deref(),
            owner: draft.owner.as_deref(),
        }
    }
}
