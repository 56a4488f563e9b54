//! OFH Client - release engine REST adapter
//!
//! Implements the collaborator traits of `ofh-core` over HTTP:
//! - `GET  /api/v1/releases/{releaseId}`
//! - `POST /api/v1/releases/{releaseId}/variables`
//! - `POST /api/v1/phases/{phaseId}/tasks?position={n}`
//! - `POST /api/v1/tasks/{taskId}/assign/{username}`
//! - `POST /api/v1/tasks/{taskId}/skip`

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod client;
mod wire;

pub use client::{ClientConfig, XlReleaseClient, DEFAULT_TIMEOUT};

/// Client construction errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("engine base URL must be http(s): {0:?}")]
    InvalidBaseUrl(String),

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}
