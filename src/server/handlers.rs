//! Route handlers
//!
//! Generation endpoints always answer 200: the body is a plan, a degraded
//! plan or an error object, all renderable by the client.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use super::SharedState;
use super::client_class::detect;
use super::sink::{ChannelSink, streaming_response};
use crate::ai::open_event_stream;
use crate::constants::server::STREAM_BUFFER;
use crate::types::{GenerationOutcome, GenerationRequest, RequestKind};

pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

pub async fn ping() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "API is reachable",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn workout(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<GenerationRequest>,
) -> Json<GenerationOutcome> {
    let client = detect(&headers, request.is_mobile);
    let span = info_span!("request", id = %Uuid::new_v4(), kind = %RequestKind::Workout);

    let outcome = async {
        info!(client = %client, "Workout plan requested");
        state.workout.generate(request, client).await
    }
    .instrument(span)
    .await;
    Json(outcome)
}

pub async fn nutrition(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<GenerationRequest>,
) -> Json<GenerationOutcome> {
    let client = detect(&headers, request.is_mobile);
    let span = info_span!("request", id = %Uuid::new_v4(), kind = %RequestKind::Nutrition);

    let outcome = async {
        info!(client = %client, "Nutrition plan requested");
        state.nutrition.generate(request, client).await
    }
    .instrument(span)
    .await;
    Json(outcome)
}

pub async fn workout_stream(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<GenerationRequest>,
) -> Response {
    spawn_stream(state, RequestKind::Workout, headers, request)
}

pub async fn nutrition_stream(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<GenerationRequest>,
) -> Response {
    spawn_stream(state, RequestKind::Nutrition, headers, request)
}

/// Commit event-stream headers, then run the pipeline in its own task so
/// the body can start flowing immediately
fn spawn_stream(
    state: SharedState,
    kind: RequestKind,
    headers: HeaderMap,
    request: GenerationRequest,
) -> Response {
    let client = detect(&headers, request.is_mobile);
    let request_id = Uuid::new_v4();
    let span = info_span!("request", id = %request_id, kind = %kind, stream = true);

    let (sink, rx) = ChannelSink::channel(STREAM_BUFFER);
    open_event_stream(&sink);
    let mut response_headers = sink.commit_headers();
    response_headers.push(("x-request-id".to_string(), request_id.to_string()));

    tokio::spawn(
        async move {
            info!(client = %client, "Streaming plan requested");
            match kind {
                RequestKind::Workout => {
                    state.workout.generate_stream(request, client, &sink).await;
                }
                RequestKind::Nutrition => {
                    state.nutrition.generate_stream(request, client, &sink).await;
                }
            }
        }
        .instrument(span),
    );

    streaming_response(response_headers, rx).into_response()
}
