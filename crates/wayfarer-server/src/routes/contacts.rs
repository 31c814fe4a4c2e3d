use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use wayfarer::models::contact::Contact;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ContactsResponse {
    contacts: Vec<Contact>,
}

async fn add_contact(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<Contact>, JsonRejection>,
) -> ApiResult<Json<ContactsResponse>> {
    let Json(contact) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if contact.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Contact name is required".to_string()));
    }
    if contact.number.chars().filter(|c| c.is_ascii_digit()).count() < 7 {
        return Err(ApiError::BadRequest(format!(
            "'{}' is not a valid phone number",
            contact.number
        )));
    }

    let contacts = state.store.add_contact(&user_id, contact).await?;
    tracing::info!(user_id = %user_id, contacts = contacts.len(), "emergency contact saved");
    Ok(Json(ContactsResponse { contacts }))
}

async fn list_contacts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ContactsResponse>> {
    let contacts = state.store.list_contacts(&user_id).await?;
    Ok(Json(ContactsResponse { contacts }))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/contacts/:user_id",
            post(add_contact).get(list_contacts),
        )
        .with_state(state)
}
