//! HTTP adapter for the release engine's REST API

use crate::wire::{CommentDto, NewTaskDto, ReleaseDto, TaskDto, VariableDto};
use crate::ClientError;
use ofh_core::{
    Comment, EngineError, PhaseMutator, Release, ReleaseDirectory, Task, TaskDraft, TaskMutator,
    Variable, VariableRegistrar,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`XlReleaseClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub username: String,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create new config for the given server
    #[must_use]
    pub fn new(base_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Release engine reached over HTTP
///
/// Every request carries basic credentials. Each trait method is a single
/// request; nothing is retried. Ids and user names become percent-encoded
/// path segments, so they can never alter the endpoint or add a query.
#[derive(Debug, Clone)]
pub struct XlReleaseClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: Option<String>,
}

impl XlReleaseClient {
    /// Create new client
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the base URL is not http(s) or the HTTP
    /// client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(config.base_url.trim())
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidBaseUrl(config.base_url.clone()))?;
        if config.password.is_none() {
            warn!(
                username = %config.username,
                "No engine password configured, requests will be sent without one"
            );
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            username: config.username,
            password: config.password,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Endpoint URL below `/api/v1` of the engine
    fn endpoint<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, EngineError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| EngineError::InvalidInput(format!("{} has no path", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "Engine request");
        self.http
            .request(method, url)
            .basic_auth(&self.username, self.password.as_deref())
    }

    async fn send(
        &self,
        operation: &str,
        target: &str,
        request: RequestBuilder,
    ) -> Result<Response, EngineError> {
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Transport(format!("{operation}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(EngineError::NotFound(target.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EngineError::Rejected {
                operation: operation.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        operation: &str,
        response: Response,
    ) -> Result<T, EngineError> {
        response
            .json::<T>()
            .await
            .map_err(|e| EngineError::Decode(format!("{operation}: {e}")))
    }
}

/// Split a hierarchical engine id (`Applications/Rel1/Phase1`) into path
/// segments
fn id_segments(id: &str) -> Result<Vec<&str>, EngineError> {
    id.split('/').map(|segment| single_segment(id, segment)).collect()
}

/// A value that must stay one path segment, such as a user name
fn name_segment(name: &str) -> Result<&str, EngineError> {
    single_segment(name, name)
}

fn single_segment<'a>(whole: &str, segment: &'a str) -> Result<&'a str, EngineError> {
    // empty, `.` and `..` segments would be dropped or resolved by the URL
    // serializer and address a different resource
    if matches!(segment, "" | "." | "..") {
        return Err(EngineError::InvalidInput(format!(
            "{whole:?} is not a valid engine path element"
        )));
    }
    Ok(segment)
}

#[async_trait::async_trait]
impl ReleaseDirectory for XlReleaseClient {
    async fn get_release(&self, release_id: &str) -> Result<Release, EngineError> {
        const OP: &str = "get release";
        let url = self.endpoint(std::iter::once("releases").chain(id_segments(release_id)?))?;
        let response = self
            .send(OP, release_id, self.request(Method::GET, url))
            .await?;
        let dto: ReleaseDto = Self::decode(OP, response).await?;
        Ok(dto.into())
    }
}

#[async_trait::async_trait]
impl PhaseMutator for XlReleaseClient {
    async fn add_task(
        &self,
        phase_id: &str,
        task: &TaskDraft,
        position: usize,
    ) -> Result<Task, EngineError> {
        const OP: &str = "add task";
        let url = self.endpoint(
            std::iter::once("phases")
                .chain(id_segments(phase_id)?)
                .chain(["tasks"]),
        )?;
        let request = self
            .request(Method::POST, url)
            .query(&[("position", position)])
            .json(&NewTaskDto::from(task));
        let response = self.send(OP, phase_id, request).await?;
        let dto: TaskDto = Self::decode(OP, response).await?;
        Ok(dto.into())
    }
}

#[async_trait::async_trait]
impl TaskMutator for XlReleaseClient {
    async fn assign_task(&self, task_id: &str, user: &str) -> Result<(), EngineError> {
        let url = self.endpoint(
            std::iter::once("tasks")
                .chain(id_segments(task_id)?)
                .chain(["assign", name_segment(user)?]),
        )?;
        self.send("assign task", task_id, self.request(Method::POST, url))
            .await?;
        Ok(())
    }

    async fn skip_task(&self, task_id: &str, comment: &Comment) -> Result<(), EngineError> {
        let url = self.endpoint(
            std::iter::once("tasks")
                .chain(id_segments(task_id)?)
                .chain(["skip"]),
        )?;
        let request = self.request(Method::POST, url).json(&CommentDto {
            comment: &comment.text,
        });
        self.send("skip task", task_id, request).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl VariableRegistrar for XlReleaseClient {
    async fn create_variable(
        &self,
        release_id: &str,
        variable: &Variable,
    ) -> Result<(), EngineError> {
        let url = self.endpoint(
            std::iter::once("releases")
                .chain(id_segments(release_id)?)
                .chain(["variables"]),
        )?;
        let request = self
            .request(Method::POST, url)
            .json(&VariableDto::from(variable));
        self.send("create variable", release_id, request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_base_url() {
        let err = XlReleaseClient::new(ClientConfig::new("localhost:5516", "admin")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidBaseUrl(_)));
    }

    fn client(base_url: &str) -> XlReleaseClient {
        XlReleaseClient::new(ClientConfig::new(base_url, "admin")).unwrap()
    }

    #[test]
    fn endpoints_live_below_api_v1() {
        let url = client("http://localhost:5516")
            .endpoint(["releases", "Applications", "Rel1"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:5516/api/v1/releases/Applications/Rel1");

        let url = client("http://engine/xlr/").endpoint(["tasks"]).unwrap();
        assert_eq!(url.as_str(), "http://engine/xlr/api/v1/tasks");
    }

    #[test]
    fn reserved_characters_stay_inside_their_segment() {
        let url = client("http://localhost:5516")
            .endpoint(["assign", name_segment("../ops#1?x=1").unwrap()])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5516/api/v1/assign/..%2Fops%231%3Fx=1"
        );
        assert_eq!(url.query(), None);
    }

    #[test]
    fn dot_segments_are_refused() {
        assert!(id_segments("Applications/Rel1/Phase1").is_ok());
        for id in ["Applications/../Other", "Applications//Rel1", "./Rel1", ""] {
            assert!(
                matches!(id_segments(id), Err(EngineError::InvalidInput(_))),
                "{id}"
            );
        }
        assert!(name_segment("..").is_err());
    }
}
