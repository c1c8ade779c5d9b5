use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Gemini model every generation call goes to. No call is made here.
    pub model: String,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        service: "prep-api",
        version: env!("CARGO_PKG_VERSION"),
        model: state.config.gemini_model.clone(),
    })
}
