//! Procedure configuration
//!
//! Names and texts the procedure uses when inspecting and annotating a
//! release. Defaults match the conventions of the release templates the
//! handler was written for.

use serde::{Deserialize, Serialize};

pub const DEFAULT_RECOVERY_PHASE: &str = "onFailure";
pub const DEFAULT_MARKER_VARIABLE: &str = "releaseFailed";
pub const DEFAULT_NAMESPACE_PREFIX: &str = "Applications/";
pub const DEFAULT_PLACEHOLDER_TITLE: &str = "Skip to Fallback";
pub const DEFAULT_PLACEHOLDER_DESCRIPTION: &str = "Automatically added by onFailure handler";
pub const DEFAULT_SKIP_COMMENT: &str = "Skipped by onFailure handler";
pub const DEFAULT_MARKER_LABEL: &str = "Has this release failed?";
pub const DEFAULT_MARKER_DESCRIPTION: &str = "Automatically set by onFailure handler";

/// Recovery procedure configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Title of the phase used to resume a failed release
    pub recovery_phase: String,
    /// Variable whose presence marks a release as already handled
    pub marker_variable: String,
    /// Prefix prepended to bare release ids
    pub namespace_prefix: String,
    pub placeholder_title: String,
    pub placeholder_description: String,
    /// Comment attached to every skipped task
    pub skip_comment: String,
    pub marker_label: String,
    pub marker_description: String,
}

impl HandlerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With recovery phase title
    #[inline]
    #[must_use]
    pub fn with_recovery_phase(mut self, title: impl Into<String>) -> Self {
        self.recovery_phase = title.into();
        self
    }

    /// With namespace prefix
    #[inline]
    #[must_use]
    pub fn with_namespace_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.namespace_prefix = prefix.into();
        self
    }

    /// Names of settings that must not be empty but are
    #[must_use]
    pub fn blank_fields(&self) -> Vec<&'static str> {
        [
            ("recovery_phase", &self.recovery_phase),
            ("marker_variable", &self.marker_variable),
            ("placeholder_title", &self.placeholder_title),
            ("skip_comment", &self.skip_comment),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            recovery_phase: DEFAULT_RECOVERY_PHASE.to_string(),
            marker_variable: DEFAULT_MARKER_VARIABLE.to_string(),
            namespace_prefix: DEFAULT_NAMESPACE_PREFIX.to_string(),
            placeholder_title: DEFAULT_PLACEHOLDER_TITLE.to_string(),
            placeholder_description: DEFAULT_PLACEHOLDER_DESCRIPTION.to_string(),
            skip_comment: DEFAULT_SKIP_COMMENT.to_string(),
            marker_label: DEFAULT_MARKER_LABEL.to_string(),
            marker_description: DEFAULT_MARKER_DESCRIPTION.to_string(),
        }
    }
}
