//! Invocation parameters

use serde::{Deserialize, Serialize};

/// Query parameter naming the release to recover
pub const RELEASE_ID_PARAM: &str = "releaseId";
/// Query parameter naming the user that owns recovery actions
pub const ON_FAILURE_USER_PARAM: &str = "onFailureUser";

/// Parameters of one recovery invocation
///
/// Both values are required by the procedure, but their absence is an
/// ordinary outcome rather than a construction error. Blank values are
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryRequest {
    #[serde(rename = "releaseId")]
    release_id: Option<String>,
    #[serde(rename = "onFailureUser")]
    on_failure_user: Option<String>,
}

impl RecoveryRequest {
    /// Create request with both parameters present
    #[inline]
    #[must_use]
    pub fn new(release_id: impl Into<String>, on_failure_user: impl Into<String>) -> Self {
        Self {
            release_id: Some(release_id.into()),
            on_failure_user: Some(on_failure_user.into()),
        }
    }

    /// Build from raw key/value query pairs; unknown keys are ignored
    pub fn from_query<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut request = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                RELEASE_ID_PARAM => request.release_id = Some(value.into()),
                ON_FAILURE_USER_PARAM => request.on_failure_user = Some(value.into()),
                _ => {}
            }
        }
        request
    }

    #[inline]
    #[must_use]
    pub fn release_id(&self) -> Option<&str> {
        non_blank(self.release_id.as_deref())
    }

    #[inline]
    #[must_use]
    pub fn on_failure_user(&self) -> Option<&str> {
        non_blank(self.on_failure_user.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Prepend the namespace prefix unless the id already carries it
#[must_use]
pub fn normalize_release_id(raw: &str, prefix: &str) -> String {
    if raw.starts_with(prefix) {
        raw.to_string()
    } else {
        format!("{prefix}{raw}")
    }
}
