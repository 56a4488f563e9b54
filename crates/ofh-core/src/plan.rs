//! Recovery planning
//!
//! Evaluates a release snapshot against the applicability rules and, when
//! they all hold, lists the transitions the procedure will apply. Planning
//! never talks to the engine, so a plan can be inspected as a dry run.

use crate::config::HandlerConfig;
use crate::model::{Phase, Release, Task};
use crate::outcome::Outcome;
use serde::Serialize;
use tracing::{debug, warn};

/// Where the placeholder task goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailurePoint {
    pub phase_id: String,
    pub phase_title: String,
    /// First failed top-level task of the phase
    pub anchor_task_id: String,
    /// Insertion index, one past the anchor
    pub position: usize,
}

/// Transitions to apply to a recoverable release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryPlan {
    pub release_id: String,
    pub user: String,
    pub failure_point: FailurePoint,
    /// Failed tasks of every phase, parallel groups excluded
    pub failed_task_ids: Vec<String>,
    /// Planned or in-progress tasks outside the recovery phase,
    /// parallel groups excluded
    pub pending_task_ids: Vec<String>,
}

/// Verdict on a release snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assessment {
    /// Nothing will be done; holds the reason
    Inapplicable(Outcome),
    Recoverable(RecoveryPlan),
}

impl RecoveryPlan {
    /// Check applicability in order and plan the recovery
    ///
    /// # Rules
    /// 1. A phase titled like the recovery phase exists
    /// 2. At least one phase failed
    /// 3. The marker variable is not yet present
    /// 4. The first failed phase has a failed top-level task
    #[must_use]
    pub fn assess(
        config: &HandlerConfig,
        release_id: &str,
        user: &str,
        release: &Release,
    ) -> Assessment {
        if release.phase_titled(&config.recovery_phase).is_none() {
            debug!("No phase {} found. Doing nothing", config.recovery_phase);
            return Assessment::Inapplicable(Outcome::NoRecoveryPhase {
                phase_title: config.recovery_phase.clone(),
            });
        }

        if !release.has_failed_phase() {
            debug!("No failed phase found. Doing nothing");
            return Assessment::Inapplicable(Outcome::NoFailedPhase);
        }

        if release.has_variable(&config.marker_variable) {
            debug!(
                "Variable \"{}\" already present. Doing nothing",
                config.marker_variable
            );
            return Assessment::Inapplicable(Outcome::AlreadyInvoked);
        }

        let Some(failure_point) = locate_failure_point(release) else {
            let phase_title = release
                .first_failed_phase()
                .map(|p| p.title.clone())
                .unwrap_or_default();
            warn!(
                release_id,
                phase = %phase_title,
                "Failed phase holds no failed task, refusing to recover"
            );
            return Assessment::Inapplicable(Outcome::StructuralAnomaly {
                release_id: release_id.to_string(),
                phase_title,
            });
        };

        let failed_task_ids = release
            .all_tasks()
            .into_iter()
            .filter(|t| t.is_failed() && !t.is_parallel_group())
            .map(|t| t.id.clone())
            .collect();

        let pending_task_ids = release
            .phases()
            .iter()
            .filter(|p| p.title != config.recovery_phase)
            .flat_map(Phase::all_tasks)
            .filter(|t| is_pending(t))
            .map(|t| t.id.clone())
            .collect();

        Assessment::Recoverable(Self {
            release_id: release_id.to_string(),
            user: user.to_string(),
            failure_point,
            failed_task_ids,
            pending_task_ids,
        })
    }
}

fn is_pending(task: &Task) -> bool {
    (task.is_planned() || task.is_in_progress()) && !task.is_parallel_group()
}

/// Locate the first failed task of the first failed phase
///
/// `None` when no phase failed or the first failed phase has no failed
/// top-level task.
#[must_use]
pub fn locate_failure_point(release: &Release) -> Option<FailurePoint> {
    let phase = release.first_failed_phase()?;
    let (index, anchor) = phase.first_failed_task()?;
    Some(FailurePoint {
        phase_id: phase.id.clone(),
        phase_title: phase.title.clone(),
        anchor_task_id: anchor.id.clone(),
        position: index + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PhaseStatus, TaskKind, TaskStatus, Variable};
    use proptest::prelude::*;

    fn task(id: &str, kind: TaskKind, status: TaskStatus) -> Task {
        Task::new(id, id, kind, status)
    }

    fn recoverable(release: &Release) -> RecoveryPlan {
        match RecoveryPlan::assess(&HandlerConfig::new(), &release.id, "ops1", release) {
            Assessment::Recoverable(plan) => plan,
            Assessment::Inapplicable(outcome) => panic!("unexpected: {}", outcome.message()),
        }
    }

    fn release_with(phases: Vec<Phase>) -> Release {
        Release::new("Applications/Rel1", "Rel1").with_phases(phases)
    }

    #[test]
    fn placeholder_goes_after_first_failed_task() {
        let release = release_with(vec![
            Phase::new("P1", "Deploy", PhaseStatus::Failed).with_tasks(vec![
                task("T0", TaskKind::Other, TaskStatus::Failed),
                task("T1", TaskKind::Other, TaskStatus::Planned),
                task("T2", TaskKind::Other, TaskStatus::Failed),
            ]),
            Phase::new("P9", "onFailure", PhaseStatus::Planned),
        ]);

        let plan = recoverable(&release);
        assert_eq!(plan.failure_point.position, 1);
        assert_eq!(plan.failure_point.anchor_task_id, "T0");
        assert_eq!(plan.failed_task_ids, vec!["T0", "T2"]);
        assert_eq!(plan.pending_task_ids, vec!["T1"]);
    }

    #[test]
    fn groups_and_recovery_phase_excluded() {
        let release = release_with(vec![
            Phase::new("P1", "Deploy", PhaseStatus::Failed).with_tasks(vec![
                task("A", TaskKind::Other, TaskStatus::Failed),
                task("G", TaskKind::ParallelGroup, TaskStatus::Failed).with_children(vec![
                    task("G1", TaskKind::Other, TaskStatus::Failed),
                    task("G2", TaskKind::Other, TaskStatus::InProgress),
                ]),
                task("H", TaskKind::ParallelGroup, TaskStatus::Planned),
            ]),
            Phase::new("P9", "onFailure", PhaseStatus::Planned).with_tasks(vec![task(
                "R1",
                TaskKind::Manual,
                TaskStatus::Planned,
            )]),
        ]);

        let plan = recoverable(&release);
        assert_eq!(plan.failed_task_ids, vec!["A", "G1"]);
        assert_eq!(plan.pending_task_ids, vec!["G2"]);
    }

    #[test]
    fn rules_apply_in_order() {
        let config = HandlerConfig::new();
        let no_recovery = release_with(vec![Phase::new("P1", "Deploy", PhaseStatus::Failed)]);
        assert!(matches!(
            RecoveryPlan::assess(&config, "id", "ops1", &no_recovery),
            Assessment::Inapplicable(Outcome::NoRecoveryPhase { .. })
        ));

        // Marker present but nothing failed: the failed-phase rule wins
        let healthy = release_with(vec![
            Phase::new("P1", "Deploy", PhaseStatus::Completed),
            Phase::new("P9", "onFailure", PhaseStatus::Planned),
        ])
        .with_variables(vec![Variable::boolean("releaseFailed", true)]);
        assert_eq!(
            RecoveryPlan::assess(&config, "id", "ops1", &healthy),
            Assessment::Inapplicable(Outcome::NoFailedPhase)
        );
    }

    #[test]
    fn failed_phase_without_failed_task_is_anomaly() {
        let release = release_with(vec![
            Phase::new("P1", "Deploy", PhaseStatus::Failed).with_tasks(vec![task(
                "A",
                TaskKind::Other,
                TaskStatus::Skipped,
            )]),
            Phase::new("P2", "Verify", PhaseStatus::Failed).with_tasks(vec![task(
                "B",
                TaskKind::Other,
                TaskStatus::Failed,
            )]),
            Phase::new("P9", "onFailure", PhaseStatus::Planned),
        ]);

        assert!(locate_failure_point(&release).is_none());
        assert_eq!(
            RecoveryPlan::assess(&HandlerConfig::new(), &release.id, "ops1", &release),
            Assessment::Inapplicable(Outcome::StructuralAnomaly {
                release_id: "Applications/Rel1".into(),
                phase_title: "Deploy".into(),
            })
        );
    }

    proptest! {
        #[test]
        fn position_is_first_failed_index_plus_one(
            statuses in proptest::collection::vec(
                prop_oneof![
                    Just(TaskStatus::Completed),
                    Just(TaskStatus::Planned),
                    Just(TaskStatus::Failed),
                    Just(TaskStatus::Skipped),
                ],
                1..12,
            )
        ) {
            let tasks: Vec<Task> = statuses
                .iter()
                .enumerate()
                .map(|(i, s)| task(&format!("T{i}"), TaskKind::Other, *s))
                .collect();
            let release = release_with(vec![
                Phase::new("P1", "Deploy", PhaseStatus::Failed).with_tasks(tasks),
            ]);

            let expected = statuses.iter().position(|s| *s == TaskStatus::Failed);
            let point = locate_failure_point(&release);
            prop_assert_eq!(point.map(|p| p.position), expected.map(|i| i + 1));
        }
    }
}
