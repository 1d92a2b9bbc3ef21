use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::embed::EmbedTokenService;
use crate::powerbi::PbiClient;

/// Message returned to clients when embed-parameter resolution fails. The
/// actual error is only logged; upstream detail never leaves the process.
const EMBED_INFO_ERROR: &str = "failed to resolve embed parameters";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
}

/// Shared state of the HTTP surface: the embed service plus the statically
/// configured workspace/report pair it serves.
pub struct AppState<P> {
    pub service: EmbedTokenService<P>,
    pub workspace_id: Uuid,
    pub report_id: Uuid,
}

pub fn router<P>(state: Arc<AppState<P>>) -> Router
where
    P: PbiClient + Send + Sync + 'static,
{
    Router::new()
        .route("/EmbedInfo", get(embed_info::<P>))
        .route("/health", get(health))
        .with_state(state)
}

/// Resolves embed parameters for the configured workspace/report pair; the
/// caller supplies no inputs.
async fn embed_info<P>(State(state): State<Arc<AppState<P>>>) -> Response
where
    P: PbiClient + Send + Sync + 'static,
{
    // The whole client stack is blocking, so the sequential upstream round
    // trips run off the async workers.
    let result = tokio::task::spawn_blocking(move || {
        state
            .service
            .embed_params(state.workspace_id, state.report_id, None)
    })
    .await;

    match result {
        Ok(Ok(params)) => (StatusCode::OK, Json(params)).into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "resolving embed parameters");
            internal_error()
        }
        Err(e) => {
            error!(error = %e, "embed parameter task failed");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: EMBED_INFO_ERROR.to_string(),
        }),
    )
        .into_response()
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok".to_string(),
    })
}

/// Serves the router until ctrl-c.
pub async fn serve<P>(address: SocketAddr, state: Arc<AppState<P>>) -> std::io::Result<()>
where
    P: PbiClient + Send + Sync + 'static,
{
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(address = %address, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "installing the shutdown signal handler");
    }
}
