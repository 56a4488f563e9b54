//! OFH Server - HTTP endpoint and release listener for the onFailure handler
//!
//! Wires the recovery procedure to the engine REST client and exposes it:
//! - synchronously over HTTP (`GET /{path}?releaseId=..&onFailureUser=..`)
//! - asynchronously from release failure notifications

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod listener;
pub mod routes;

pub use config::{ConfigError, Overrides, ServiceConfig};
pub use listener::{FailureListener, ListenerWorker, ReleaseEvent, ReleaseStatus};
pub use routes::routes;

use ofh_client::{ClientError, XlReleaseClient};
use ofh_core::FailureRecoveryProcedure;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Build the procedure backed by the configured engine
///
/// # Errors
/// [`ClientError`] if the engine client cannot be created.
pub fn build_procedure(config: &ServiceConfig) -> Result<FailureRecoveryProcedure, ClientError> {
    let client = XlReleaseClient::new(config.client_config())?;
    Ok(FailureRecoveryProcedure::with_engine(
        config.handler.clone(),
        Arc::new(client),
    ))
}

/// Bind the service and return the future that runs it
///
/// The future serves until `shutdown` resolves, then lets the listener
/// worker finish the releases it already accepted, bounded by
/// `listener.shutdown_grace_secs`.
///
/// # Errors
/// Returns the bind error if the address is unavailable.
pub fn bind(
    config: &ServiceConfig,
    procedure: FailureRecoveryProcedure,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = ()>), warp::Error> {
    let (listener, worker) = if config.listener.enabled {
        let (listener, worker) = FailureListener::spawn(procedure.clone(), &config.listener);
        (Some(listener), Some(worker))
    } else {
        (None, None)
    };

    let routes = routes(config.endpoint_path(), Arc::new(procedure), listener);
    let (addr, server) =
        warp::serve(routes).try_bind_with_graceful_shutdown(config.server.bind, shutdown)?;

    let grace = config.listener.shutdown_grace();
    let run = async move {
        server.await;
        if let Some(worker) = worker {
            info!("Waiting for queued releases");
            if !worker.finish(grace).await {
                warn!("Some accepted releases may not have been handled");
            }
        }
        info!("onFailure handler stopped");
    };
    Ok((addr, run))
}

/// Serve until `shutdown` resolves
///
/// # Errors
/// Returns the bind error if the address is unavailable.
pub async fn serve(
    config: &ServiceConfig,
    procedure: FailureRecoveryProcedure,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), warp::Error> {
    let (addr, run) = bind(config, procedure, shutdown)?;
    info!(
        %addr,
        path = config.endpoint_path(),
        listener = config.listener.enabled,
        "onFailure handler listening"
    );
    run.await;
    Ok(())
}
