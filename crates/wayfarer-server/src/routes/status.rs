use axum::{extract::State, routing::get, Json, Router};
use chrono::Timelike;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct StatusResponse {
    message: String,
    greeting: &'static str,
    status: &'static str,
    tools: Vec<String>,
    /// Tools that will answer "not configured" until their key is set
    unconfigured: Vec<String>,
}

fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good morning",
        12..=16 => "Good afternoon",
        _ => "Good evening",
    }
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let greeting = greeting(chrono::Local::now().hour());
    let registry = state.agent.registry();

    Json(StatusResponse {
        message: format!(
            "{}! I'm Wayfarer, your travel companion. Where would you like to go?",
            greeting
        ),
        greeting,
        status: "running",
        tools: registry.tools().into_iter().map(|t| t.name).collect(),
        unconfigured: registry
            .unconfigured()
            .into_iter()
            .map(|(kind, _)| kind.to_string())
            .collect(),
    })
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .with_state(state)
}
