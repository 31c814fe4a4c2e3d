use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use wayfarer::models::conversation::Conversation;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    state
        .store
        .load_conversation(&session_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Session '{}' not found", session_id)))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions/:session_id", get(get_session))
        .with_state(state)
}
