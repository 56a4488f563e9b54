//! Service configuration
//!
//! Loaded from an optional TOML file, then overridden from the command line
//! or environment. Every section has defaults, so an empty file is valid.

use ofh_client::ClientConfig;
use ofh_core::HandlerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:5517";
pub const DEFAULT_ENDPOINT_PATH: &str = "onFailure";
pub const DEFAULT_ENGINE_URL: &str = "http://localhost:5516";
pub const DEFAULT_SERVICE_USER: &str = "onFailure_user";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    /// Path segment of the invocation endpoint
    pub path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5517)),
            path: DEFAULT_ENDPOINT_PATH.to_string(),
        }
    }
}

/// Release engine connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub base_url: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENGINE_URL.to_string(),
            username: DEFAULT_SERVICE_USER.to_string(),
            password: None,
            timeout_secs: 30,
        }
    }
}

/// Failed-release listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerSettings {
    pub enabled: bool,
    /// User recorded as owner of recovery actions
    pub user: String,
    pub dedup_capacity: u64,
    pub dedup_ttl_secs: u64,
    pub queue_depth: usize,
    /// How long shutdown waits for queued releases
    pub shutdown_grace_secs: u64,
}

impl ListenerSettings {
    #[inline]
    #[must_use]
    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.dedup_ttl_secs)
    }

    #[inline]
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            user: DEFAULT_SERVICE_USER.to_string(),
            dedup_capacity: 1000,
            dedup_ttl_secs: 10,
            queue_depth: 64,
            shutdown_grace_secs: 30,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub engine: EngineSettings,
    pub handler: HandlerConfig,
    pub listener: ListenerSettings,
}

/// Values given on the command line or in the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub engine_url: Option<String>,
    pub engine_password: Option<String>,
}

impl ServiceConfig {
    /// Load from `path`, or defaults when no file is given
    ///
    /// # Errors
    /// [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns the parser error unchanged.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }
        if let Some(url) = overrides.engine_url {
            self.engine.base_url = url;
        }
        if let Some(password) = overrides.engine_password {
            self.engine.password = Some(password);
        }
        self
    }

    /// Reject settings the service cannot run with
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("engine.base_url is empty".to_string()));
        }
        if self.server.path.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid("server.path is empty".to_string()));
        }
        if let Some(field) = self.handler.blank_fields().first() {
            return Err(ConfigError::Invalid(format!("handler.{field} is empty")));
        }
        if self.listener.user.trim().is_empty() {
            return Err(ConfigError::Invalid("listener.user is empty".to_string()));
        }
        if self.listener.dedup_capacity == 0 {
            return Err(ConfigError::Invalid(
                "listener.dedup_capacity must be positive".to_string(),
            ));
        }
        if self.listener.queue_depth == 0 {
            return Err(ConfigError::Invalid(
                "listener.queue_depth must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Endpoint path without surrounding slashes
    #[must_use]
    pub fn endpoint_path(&self) -> &str {
        self.server.path.trim_matches('/')
    }

    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(&self.engine.base_url, &self.engine.username)
            .with_timeout(Duration::from_secs(self.engine.timeout_secs));
        match &self.engine.password {
            Some(password) => config.with_password(password),
            None => config,
        }
    }

    /// Render as TOML with the password masked
    ///
    /// # Errors
    /// [`ConfigError::Render`] if serialization fails.
    pub fn to_masked_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.engine.password.is_some() {
            shown.engine.password = Some("********".to_string());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.engine.base_url, DEFAULT_ENGINE_URL);
        assert_eq!(config.engine.username, "onFailure_user");
        assert_eq!(config.listener.user, "onFailure_user");
        assert_eq!(config.listener.dedup_capacity, 1000);
        assert_eq!(config.listener.dedup_ttl(), Duration::from_secs(10));
        assert_eq!(config.listener.shutdown_grace(), Duration::from_secs(30));
        assert_eq!(config.handler, HandlerConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ServiceConfig::from_toml(
            r#"
            [engine]
            base_url = "https://xlr.example.com"

            [handler]
            recovery_phase = "Rollback"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.base_url, "https://xlr.example.com");
        assert_eq!(config.engine.username, DEFAULT_SERVICE_USER);
        assert_eq!(config.handler.recovery_phase, "Rollback");
        assert_eq!(config.handler.marker_variable, "releaseFailed");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\npath = \"/hooks/onFailure/\"").unwrap();

        let config = ServiceConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.endpoint_path(), "hooks/onFailure");
    }

    #[test]
    fn load_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine\nbase_url = 1").unwrap();

        let err = ServiceConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ServiceConfig::load(Some(Path::new("/nonexistent/ofh.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn overrides_win() {
        let config = ServiceConfig::default().with_overrides(Overrides {
            bind: Some("0.0.0.0:8080".parse().unwrap()),
            engine_url: Some("http://engine:5516".to_string()),
            engine_password: Some("s3cret".to_string()),
        });
        assert_eq!(config.server.bind.port(), 8080);
        assert_eq!(config.engine.base_url, "http://engine:5516");
        assert_eq!(config.engine.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn validation_rejects_unusable_settings() {
        let mut config = ServiceConfig::default();
        config.engine.base_url = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.handler.recovery_phase = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("handler.recovery_phase"));

        let mut config = ServiceConfig::default();
        config.listener.dedup_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rendered_config_masks_password() {
        let mut config = ServiceConfig::default();
        config.engine.password = Some("s3cret".to_string());
        let text = config.to_masked_toml().unwrap();
        assert!(!text.contains("s3cret"));
        assert!(text.contains("********"));
    }
}
