//! Request handlers for the screening HTTP surface

use crate::error::{ErrorResponse, ScreeningError, ScreeningResult};
use crate::observability::metrics::metrics;
use crate::screening::{build_screening_tasks, Order};
use crate::screening_span;
use crate::server::AppState;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

pub const ANALYSIS_COMPLETE: &str = "Analysis Complete";

/// Lifecycle of one screening request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestState::Received => "RECEIVED",
            RequestState::Running => "RUNNING",
            RequestState::Completed => "COMPLETED",
            RequestState::Failed => "FAILED",
        })
    }
}

/// Success body for `POST /screen-order`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResponse {
    pub status: String,
    pub report: String,
}

impl ScreeningResponse {
    pub fn complete(report: String) -> Self {
        Self {
            status: ANALYSIS_COMPLETE.to_string(),
            report,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub service: String,
    pub status: String,
    pub model: String,
    pub uptime_seconds: u64,
}

/// Validate the body and run the pipeline, returning the report
pub async fn screen_order(state: &AppState, body: &[u8]) -> ScreeningResult<String> {
    metrics().screening_received();
    info!(state = %RequestState::Received, bytes = body.len(), "Screening request received");

    let order = Order::from_slice(body).map_err(|e| {
        metrics().screening_rejected();
        warn!(state = %RequestState::Failed, error = %e, "Order rejected by schema validation");
        e
    })?;

    let tasks = build_screening_tasks(&order, &state.registry);
    info!(
        state = %RequestState::Running,
        order_id = %order.order_id,
        country = %order.country,
        "Running screening pipeline"
    );

    metrics().screening_started();
    let started = Instant::now();

    match state.runner.run(tasks).await {
        Ok(result) => {
            metrics().screening_completed(started.elapsed());
            info!(
                state = %RequestState::Completed,
                order_id = %order.order_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                total_tokens = result.total_tokens(),
                "Screening completed"
            );
            Ok(result.report)
        }
        Err(e) => {
            metrics().screening_failed(started.elapsed());
            error!(
                state = %RequestState::Failed,
                order_id = %order.order_id,
                error = %e,
                "Screening pipeline failed"
            );
            Err(ScreeningError::from(e))
        }
    }
}

/// Collect the request body, failing as soon as it grows past `limit` bytes
pub async fn read_body_limited<S, B>(mut body: S, limit: u64) -> ScreeningResult<Bytes>
where
    S: Stream<Item = Result<B, warp::Error>> + Unpin,
    B: Buf,
{
    let mut collected = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| {
            ScreeningError::malformed_body(format!("failed to read request body: {e}"))
        })?;
        if (collected.len() + chunk.remaining()) as u64 > limit {
            return Err(ScreeningError::payload_too_large(limit));
        }
        collected.put(chunk);
    }
    Ok(collected.freeze())
}

pub async fn handle_screen_order(
    body: impl Stream<Item = Result<impl Buf, warp::Error>> + Unpin + Send + Sync,
    max_body_bytes: u64,
    state: Arc<AppState>,
) -> Result<impl Reply, Infallible> {
    let span = screening_span!(screening_id = %Uuid::new_v4());

    let reply = async move {
        let outcome = match read_body_limited(body, max_body_bytes).await {
            Ok(bytes) => screen_order(&state, &bytes).await,
            Err(e) => {
                metrics().screening_received();
                metrics().screening_rejected();
                warn!(state = %RequestState::Failed, error = %e, "Request body rejected");
                Err(e)
            }
        };

        match outcome {
            Ok(report) => warp::reply::with_status(
                warp::reply::json(&ScreeningResponse::complete(report)),
                StatusCode::OK,
            ),
            Err(e) => warp::reply::with_status(
                warp::reply::json(&e.to_error_response()),
                e.status_code(),
            ),
        }
    }
    .instrument(span)
    .await;

    Ok(reply)
}

pub async fn handle_health(state: Arc<AppState>) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&HealthResponse {
        service: env!("CARGO_PKG_NAME").to_string(),
        status: "healthy".to_string(),
        model: state.registry.model().to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

pub async fn handle_metrics() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&metrics().get_metrics()))
}

/// Map framework rejections onto the same error envelope as handler errors
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed".to_string(),
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorResponse { detail }),
        status,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_state_display() {
        assert_eq!(RequestState::Received.to_string(), "RECEIVED");
        assert_eq!(RequestState::Running.to_string(), "RUNNING");
        assert_eq!(RequestState::Completed.to_string(), "COMPLETED");
        assert_eq!(RequestState::Failed.to_string(), "FAILED");
    }

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, warp::Error>> + Unpin {
        futures::stream::iter(
            parts
                .iter()
                .map(|part| Ok(Bytes::from_static(part.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_read_body_joins_chunks_up_to_limit() {
        let body = read_body_limited(chunks(&["{\"order", "_id\":", "1}"]), 15)
            .await
            .unwrap();
        assert_eq!(&body[..], b"{\"order_id\":1}");
    }

    #[tokio::test]
    async fn test_read_body_stops_past_limit() {
        let result = read_body_limited(chunks(&["0123456789", "0123456789", "x"]), 20).await;
        assert!(matches!(
            result,
            Err(ScreeningError::PayloadTooLarge { limit: 20 })
        ));
    }

    #[tokio::test]
    async fn test_read_body_accepts_empty_stream() {
        let body = read_body_limited(chunks(&[]), 8).await.unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_success_body_shape() {
        let body = serde_json::to_value(ScreeningResponse::complete("ok".to_string())).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "Analysis Complete", "report": "ok"})
        );
    }
}
