// HTTP API routes: the Discord interactions webhook plus health and metrics.

use axum::{
    extract::{FromRef, Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use ed25519_dalek::VerifyingKey;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::VerifiedBody;
use crate::clash::StatsSource;
use crate::commands::Dispatcher;
use crate::interaction::{self, Inbound};
use crate::metrics;
use crate::store::Store;

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub public_key: VerifyingKey,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(public_key: VerifyingKey, store: Arc<Store>, stats: Arc<dyn StatsSource>) -> Self {
        Self {
            public_key,
            dispatcher: Arc::new(Dispatcher::new(store, stats)),
        }
    }
}

impl FromRef<AppState> for VerifyingKey {
    fn from_ref(state: &AppState) -> Self {
        state.public_key
    }
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "error": msg })))
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .route("/interactions", post(handle_interaction))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "royale-bot" }))
}

async fn get_metrics() -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

// ── Interactions webhook ──────────────────────────────────────────────

async fn handle_interaction(
    State(state): State<AppState>,
    VerifiedBody(body): VerifiedBody,
) -> impl IntoResponse {
    let inbound = match interaction::parse(&body) {
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::warn!("Rejected interaction payload: {e}");
            return json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response();
        }
    };

    match inbound {
        Inbound::Ping => (StatusCode::OK, Json(interaction::pong())).into_response(),
        Inbound::Command(invocation) => {
            let content = state.dispatcher.dispatch(&invocation).await;
            (
                StatusCode::OK,
                Json(interaction::channel_message(&content)),
            )
                .into_response()
        }
    }
}
