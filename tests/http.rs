//! Loopback HTTP round trips through the axum router

mod common;

use std::sync::Arc;

use common::{ScriptedProvider, WORKOUT_JSON};
use fitplan::Config;
use fitplan::server::{AppState, router};
use serde_json::{Value, json};

async fn serve(provider: Arc<ScriptedProvider>) -> String {
    let state = Arc::new(AppState::new(provider, &Config::default()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn health_reports_status_and_uptime() {
    let base = serve(Arc::new(ScriptedProvider::always(WORKOUT_JSON))).await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
    assert!(body["uptime_secs"].is_u64());

    let ping: Value = reqwest::get(format!("{base}/api/diagnostics/ping"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ping["success"], true);
}

#[tokio::test]
async fn mobile_user_agent_gets_mobile_token_budget() {
    let provider = Arc::new(ScriptedProvider::always(WORKOUT_JSON));
    let base = serve(provider.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/workout"))
        .header("user-agent", "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)")
        .json(&json!({"level": "beginner", "duration": 20}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["duration"], 20);
    assert_eq!(provider.requests()[0].max_tokens, 1000);
}

#[tokio::test]
async fn workout_stream_is_an_event_stream() {
    let base = serve(Arc::new(ScriptedProvider::always(WORKOUT_JSON))).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/workout/stream"))
        .json(&json!({"level": "advanced", "duration": 50}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    assert!(response.headers().contains_key("x-request-id"));

    let text = response.text().await.unwrap();
    assert!(text.starts_with("data: {\"type\":\"delta\""));
    assert!(text.contains("\"type\":\"complete\""));
    assert!(text.contains("\"difficultyLevel\":\"advanced\""));
    assert!(text.ends_with("data: [DONE]\n\n"));
}
