use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use wayfarer::models::contact::UserLocation;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

async fn save_location(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<UserLocation>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(location) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    location
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.store.save_location(&user_id, location.clone()).await?;
    tracing::debug!(user_id = %user_id, "location updated");
    Ok(Json(json!({ "status": "saved", "location": location })))
}

async fn get_location(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserLocation>> {
    state
        .store
        .get_location(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No location saved for '{}'", user_id)))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/location/:user_id",
            post(save_location).get(get_location),
        )
        .with_state(state)
}
