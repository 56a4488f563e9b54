//! OFH Core - failure recovery for multi-phase releases
//!
//! Turns a failed release into one a human can resume:
//! - Checks the release has a recovery phase and a failed phase
//! - Refuses to run twice on the same release
//! - Inserts a manual placeholder right after the first failed task
//! - Skips failed, planned and in-progress work outside the recovery phase
//!
//! # Example
//!
//! ```rust,ignore
//! use ofh_core::{FailureRecoveryProcedure, HandlerConfig, RecoveryRequest};
//!
//! # async fn example(engine: std::sync::Arc<impl ofh_core::ReleaseEngine + 'static>)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let procedure = FailureRecoveryProcedure::with_engine(HandlerConfig::new(), engine);
//!
//! let outcome = procedure.run(&RecoveryRequest::new("Rel1", "ops1")).await?;
//! println!("{}", outcome.message());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod model;
pub mod outcome;
pub mod plan;
pub mod ports;
pub mod procedure;
pub mod request;

// Re-exports for convenience
pub use config::HandlerConfig;
pub use error::{EngineError, HandlerError, RecoveryStep};
pub use model::{
    Comment, Phase, PhaseStatus, Release, Task, TaskDraft, TaskKind, TaskStatus, Variable,
    VariableKind,
};
pub use outcome::{Outcome, RecoveryReport};
pub use plan::{locate_failure_point, Assessment, FailurePoint, RecoveryPlan};
pub use ports::{PhaseMutator, ReleaseDirectory, ReleaseEngine, TaskMutator, VariableRegistrar};
pub use procedure::FailureRecoveryProcedure;
pub use request::{normalize_release_id, RecoveryRequest, ON_FAILURE_USER_PARAM, RELEASE_ID_PARAM};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with OFH Core
    pub use crate::{
        Assessment, FailureRecoveryProcedure, HandlerConfig, HandlerError, Outcome,
        RecoveryRequest, Release, ReleaseEngine,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
