//! HTTP surface: the index as JSON, diagnostics, and the channel over SSE

use crate::cache::IndexCache;
use crate::channel::{ChannelEvent, ServerChannel};
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use storyloom_index::{IndexDiagnostic, StoryIndex};
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<IndexCache>,
    pub channel: ServerChannel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResponse {
    pub version: u64,
    pub degraded: bool,
    pub updated_at: String,
    pub diagnostics: Vec<IndexDiagnostic>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/index.json", get(index_handler))
        .route("/diagnostics", get(diagnostics_handler))
        .route("/events", get(events_handler))
        .route("/channel", post(channel_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(address) = listener.local_addr() {
        tracing::info!(%address, "serving story index");
    }
    axum::serve(listener, router(state)).await
}

async fn index_handler(State(state): State<AppState>) -> Json<StoryIndex> {
    Json(StoryIndex::clone(&state.cache.get()))
}

async fn diagnostics_handler(State(state): State<AppState>) -> Json<DiagnosticsResponse> {
    let snapshot = state.cache.snapshot();
    Json(DiagnosticsResponse {
        version: snapshot.version,
        degraded: snapshot.degraded,
        updated_at: snapshot.updated_at.to_rfc3339(),
        diagnostics: snapshot.diagnostics.clone(),
    })
}

/// Channel events for one browser, starting with the index snapshot
async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(subscribers = state.channel.subscriber_count() + 1, "channel client connected");

    let events = state.channel.connect().into_stream().map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(Event::default().event(event.event_type).data(data))
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}

async fn channel_handler(State(state): State<AppState>, Json(event): Json<ChannelEvent>) -> StatusCode {
    state.channel.receive(event);
    StatusCode::ACCEPTED
}
