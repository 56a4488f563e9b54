//! HTTP routes
//!
//! - `GET /{path}?releaseId=..&onFailureUser=..` runs the procedure and
//!   answers `{"message": ..}`
//! - `POST /events/releases` feeds release notifications to the listener

use crate::listener::{FailureListener, ReleaseEvent};
use ofh_core::{FailureRecoveryProcedure, RecoveryRequest};
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::error;
use warp::http::StatusCode;
use warp::path::FullPath;
use warp::{Filter, Rejection, Reply};

const MAX_EVENT_BODY: u64 = 256 * 1024;

#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct AcceptedBody {
    accepted: usize,
}

/// All routes of the service
pub fn routes(
    path: &str,
    procedure: Arc<FailureRecoveryProcedure>,
    listener: Option<FailureListener>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    invoke_route(path, procedure)
        .or(events_route(listener))
        .with(warp::trace::request())
}

fn invoke_route(
    path: &str,
    procedure: Arc<FailureRecoveryProcedure>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    exact_path(path)
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(procedure))
        .and_then(invoke)
}

fn events_route(
    listener: Option<FailureListener>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("events" / "releases")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_EVENT_BODY))
        .and(warp::body::json::<Vec<ReleaseEvent>>())
        .and(with_state(listener))
        .and_then(notify)
}

/// Match a configured path that may span several segments
fn exact_path(path: &str) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    let expected = format!("/{}", path.trim_matches('/'));
    warp::path::full()
        .and_then(move |full: FullPath| {
            let matches = full.as_str().trim_end_matches('/') == expected;
            async move {
                if matches {
                    Ok(())
                } else {
                    Err(warp::reject::not_found())
                }
            }
        })
        .untuple_one()
}

fn with_state<T: Clone + Send>(state: T) -> impl Filter<Extract = (T,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

async fn invoke(
    query: HashMap<String, String>,
    procedure: Arc<FailureRecoveryProcedure>,
) -> Result<impl Reply, Infallible> {
    let request = RecoveryRequest::from_query(query);
    let (status, message) = match procedure.run(&request).await {
        Ok(outcome) => (StatusCode::OK, outcome.message()),
        Err(e) => {
            error!(step = %e.step(), partial = e.is_partial(), "onFailure handler failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&MessageBody { message }),
        status,
    ))
}

async fn notify(
    events: Vec<ReleaseEvent>,
    listener: Option<FailureListener>,
) -> Result<impl Reply, Infallible> {
    let Some(listener) = listener else {
        return Ok(warp::reply::with_status(
            warp::reply::json(&MessageBody {
                message: "Release listener is disabled".to_string(),
            }),
            StatusCode::SERVICE_UNAVAILABLE,
        ));
    };
    let accepted = listener.observe(&events).await;
    Ok(warp::reply::with_status(
        warp::reply::json(&AcceptedBody { accepted }),
        StatusCode::ACCEPTED,
    ))
}
