//! Failure recovery procedure
//!
//! Drains a failed release into a state a human can resume:
//! - marks the release with a boolean marker variable
//! - inserts a manual placeholder right after the first failed task
//! - skips failed tasks, then planned and in-progress tasks outside the
//!   recovery phase
//! - skips the placeholder last
//!
//! Collaborator calls are awaited one at a time in that order. Nothing is
//! retried or rolled back; see [`HandlerError::is_partial`].

use crate::config::HandlerConfig;
use crate::error::{EngineError, HandlerError, RecoveryStep};
use crate::model::{Comment, TaskDraft, Variable};
use crate::outcome::{Outcome, RecoveryReport};
use crate::plan::{Assessment, RecoveryPlan};
use crate::ports::{PhaseMutator, ReleaseDirectory, ReleaseEngine, TaskMutator, VariableRegistrar};
use crate::request::{normalize_release_id, RecoveryRequest};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// The failure recovery procedure
///
/// Owns no state besides its configuration and collaborators, so one
/// instance can serve any number of releases.
#[derive(Clone)]
pub struct FailureRecoveryProcedure {
    config: HandlerConfig,
    releases: Arc<dyn ReleaseDirectory>,
    phases: Arc<dyn PhaseMutator>,
    tasks: Arc<dyn TaskMutator>,
    variables: Arc<dyn VariableRegistrar>,
}

impl FailureRecoveryProcedure {
    /// Create procedure from individual collaborators
    #[must_use]
    pub fn new(
        config: HandlerConfig,
        releases: Arc<dyn ReleaseDirectory>,
        phases: Arc<dyn PhaseMutator>,
        tasks: Arc<dyn TaskMutator>,
        variables: Arc<dyn VariableRegistrar>,
    ) -> Self {
        Self {
            config,
            releases,
            phases,
            tasks,
            variables,
        }
    }

    /// Create procedure backed by a single engine client
    #[must_use]
    pub fn with_engine<E>(config: HandlerConfig, engine: Arc<E>) -> Self
    where
        E: ReleaseEngine + 'static,
    {
        Self {
            config,
            releases: engine.clone(),
            phases: engine.clone(),
            tasks: engine.clone(),
            variables: engine,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Run the procedure for one invocation
    ///
    /// # Errors
    /// [`HandlerError`] when a collaborator call fails. A release that
    /// cannot be found is an [`Outcome`], not an error.
    pub async fn run(&self, request: &RecoveryRequest) -> Result<Outcome, HandlerError> {
        let outcome = match self.prepare(request).await? {
            Assessment::Inapplicable(outcome) => outcome,
            Assessment::Recoverable(plan) => Outcome::Recovered(self.apply(&plan).await?),
        };
        info!("{}", outcome.message());
        Ok(outcome)
    }

    /// Evaluate an invocation without mutating anything
    ///
    /// # Errors
    /// [`HandlerError`] when the release lookup fails for a reason other
    /// than the release being absent.
    pub async fn prepare(&self, request: &RecoveryRequest) -> Result<Assessment, HandlerError> {
        let Some(raw_id) = request.release_id() else {
            return Ok(Assessment::Inapplicable(Outcome::missing_release_id()));
        };
        let Some(user) = request.on_failure_user() else {
            return Ok(Assessment::Inapplicable(Outcome::missing_user()));
        };

        let release_id = normalize_release_id(raw_id, &self.config.namespace_prefix);
        info!(
            "Invoking onFailure handler for releaseId {} with tracking user {}",
            release_id, user
        );

        let release = match self.releases.get_release(&release_id).await {
            Ok(release) => release,
            Err(EngineError::NotFound(_)) => {
                debug!("No release '{}' found. Doing nothing", release_id);
                return Ok(Assessment::Inapplicable(Outcome::ReleaseNotFound {
                    release_id,
                }));
            }
            Err(source) => {
                return Err(HandlerError::engine(
                    release_id,
                    RecoveryStep::LookupRelease,
                    source,
                ))
            }
        };

        Ok(RecoveryPlan::assess(&self.config, &release_id, user, &release))
    }

    /// Apply a plan produced by [`prepare`](Self::prepare)
    ///
    /// # Errors
    /// [`HandlerError`] naming the step whose engine call failed.
    pub async fn apply(&self, plan: &RecoveryPlan) -> Result<RecoveryReport, HandlerError> {
        let release_id = plan.release_id.as_str();
        let fail = |step: RecoveryStep| {
            move |source: EngineError| HandlerError::engine(release_id, step, source)
        };

        debug!("Adding \"{}\" variable", self.config.marker_variable);
        let marker = Variable::boolean(&self.config.marker_variable, true)
            .required(false)
            .with_label(&self.config.marker_label)
            .with_description(&self.config.marker_description);
        self.variables
            .create_variable(release_id, &marker)
            .await
            .map_err(fail(RecoveryStep::CreateMarker))?;

        // Manual pause point right after the failure so the release can be
        // activated again.
        let point = &plan.failure_point;
        debug!("Adding placeholder task");
        trace!(
            "Adding manual task in phase {} at position {}",
            point.phase_title,
            point.position
        );
        let draft = TaskDraft::manual(&self.config.placeholder_title)
            .with_description(&self.config.placeholder_description)
            .with_owner(&plan.user);
        let placeholder = self
            .phases
            .add_task(&point.phase_id, &draft, point.position)
            .await
            .map_err(fail(RecoveryStep::InsertPlaceholder))?;

        let comment = Comment::new(&self.config.skip_comment);

        debug!("Skipping failed tasks");
        for task_id in &plan.failed_task_ids {
            trace!("Skipping failed task {}", task_id);
            self.tasks
                .skip_task(task_id, &comment)
                .await
                .map_err(fail(RecoveryStep::SkipFailed))?;
        }

        debug!("Skipping planned tasks");
        let mut skipped_pending = Vec::with_capacity(plan.pending_task_ids.len());
        for task_id in &plan.pending_task_ids {
            // the placeholder stays actionable until the very end
            if *task_id == placeholder.id {
                continue;
            }
            trace!("Skipping planned or in progress task {}", task_id);
            self.assign_and_skip(task_id, &plan.user, &comment)
                .await
                .map_err(fail(RecoveryStep::SkipPending))?;
            skipped_pending.push(task_id.clone());
        }

        debug!("Skipping placeholder task");
        self.assign_and_skip(&placeholder.id, &plan.user, &comment)
            .await
            .map_err(fail(RecoveryStep::SkipPlaceholder))?;

        Ok(RecoveryReport {
            release_id: plan.release_id.clone(),
            placeholder_task_id: placeholder.id,
            placeholder_phase_id: point.phase_id.clone(),
            placeholder_position: point.position,
            skipped_failed: plan.failed_task_ids.clone(),
            skipped_pending,
        })
    }

    async fn assign_and_skip(
        &self,
        task_id: &str,
        user: &str,
        comment: &Comment,
    ) -> Result<(), EngineError> {
        self.tasks.assign_task(task_id, user).await?;
        self.tasks.skip_task(task_id, comment).await
    }
}

impl std::fmt::Debug for FailureRecoveryProcedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureRecoveryProcedure")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
