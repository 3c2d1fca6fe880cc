//! HTTP surface built on warp
//!
//! `POST /screen-order` runs the screening pipeline; `GET /health` and
//! `GET /metrics` expose service status.

pub mod handlers;

use crate::config::{ConfigError, ServerSection};
use crate::error::ScreeningError;
use crate::screening::{AgentRegistry, PipelineRunner};
use std::convert::Infallible;
use std::future::Future;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use warp::{Filter, Reply};

pub use handlers::{HealthResponse, RequestState, ScreeningResponse, ANALYSIS_COMPLETE};

/// State shared by every request
pub struct AppState {
    pub registry: Arc<AgentRegistry>,
    pub runner: Arc<dyn PipelineRunner>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(registry: Arc<AgentRegistry>, runner: Arc<dyn PipelineRunner>) -> Self {
        Self {
            registry,
            runner,
            started_at: Instant::now(),
        }
    }
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// All routes, with rejections rendered as JSON error envelopes
///
/// Order bodies are read as a stream, so chunked uploads are accepted; the
/// size limit applies to the bytes actually received.
pub fn routes(
    state: Arc<AppState>,
    max_body_bytes: u64,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let screen_order = warp::path("screen-order")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::stream())
        .and(warp::any().map(move || max_body_bytes))
        .and(with_state(state.clone()))
        .and_then(handlers::handle_screen_order);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .and_then(handlers::handle_health);

    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handlers::handle_metrics);

    screen_order
        .or(health)
        .or(metrics)
        .recover(handlers::handle_rejection)
}

/// Resolve `host:port` from the server section
pub fn resolve_bind_address(server: &ServerSection) -> Result<SocketAddr, ConfigError> {
    (server.host.as_str(), server.port)
        .to_socket_addrs()
        .map_err(|e| {
            ConfigError::InvalidConfig(format!(
                "cannot resolve server address {}:{}: {e}",
                server.host, server.port
            ))
        })?
        .next()
        .ok_or_else(|| {
            ConfigError::InvalidConfig(format!(
                "server address {}:{} resolved to nothing",
                server.host, server.port
            ))
        })
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(
    state: Arc<AppState>,
    server: &ServerSection,
    shutdown: F,
) -> Result<(), ScreeningError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = resolve_bind_address(server)?;
    let filter = routes(state, server.max_body_bytes);

    let (bound, running) = warp::serve(filter)
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .map_err(|e| ScreeningError::internal_error(format!("failed to bind {addr}: {e}")))?;

    info!(address = %bound, "Screening service listening");
    running.await;
    info!("Screening service stopped");
    Ok(())
}
