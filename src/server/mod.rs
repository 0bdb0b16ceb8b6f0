//! HTTP Surface
//!
//! Thin axum layer over the plan controllers. All shared services are built
//! once in `AppState` and handed to handlers by `Arc`.

pub mod client_class;
pub mod handlers;
pub mod sink;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::ai::{ModelGateway, SharedProvider};
use crate::config::Config;
use crate::plans::{NutritionController, WorkoutController, WorkoutHistory};

pub use client_class::detect;
pub use sink::ChannelSink;

pub struct AppState {
    pub workout: Arc<WorkoutController>,
    pub nutrition: Arc<NutritionController>,
    pub started_at: Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire one gateway (and so one cache) shared by both controllers
    pub fn new(provider: SharedProvider, config: &Config) -> Self {
        let gateway = Arc::new(ModelGateway::new(provider, config));
        let history = Arc::new(WorkoutHistory::from_config(&config.history));

        Self {
            workout: Arc::new(WorkoutController::new(gateway.clone(), history)),
            nutrition: Arc::new(NutritionController::new(gateway, &config.nutrition)),
            started_at: Instant::now(),
        }
    }
}

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/diagnostics/ping", get(handlers::ping))
        .route("/api/workout", post(handlers::workout))
        .route("/api/workout/stream", post(handlers::workout_stream))
        .route("/api/nutrition", post(handlers::nutrition))
        .route("/api/nutrition/stream", post(handlers::nutrition_stream))
        .layer(cors)
        .with_state(state)
}
