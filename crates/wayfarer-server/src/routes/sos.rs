use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use wayfarer::errors::AgentError;
use wayfarer::models::contact::UserLocation;
use wayfarer::tools::sos::SosAlert;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
struct SosRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    location: Option<UserLocation>,
}

#[derive(Debug, Serialize)]
struct SosResponse {
    delivered: bool,
    contacts_notified: usize,
    location: Option<String>,
    sent_at: String,
}

/// The panic button: alerts the user's saved contacts without going through the model.
/// The body is optional; without a location the last saved one is used.
async fn send_sos(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<SosResponse>> {
    let request: SosRequest = if body.is_empty() {
        SosRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let contacts = state
        .sos
        .contacts_for(Some(user_id.as_str()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if contacts.is_empty() {
        return Err(ApiError::BadRequest(
            "No emergency contacts saved. Add one before using SOS.".to_string(),
        ));
    }

    let location = match request.location {
        Some(location) => {
            location
                .validate()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            state
                .store
                .save_location(&user_id, location.clone())
                .await?;
            Some(location)
        }
        None => state.store.get_location(&user_id).await?,
    };

    let alert = SosAlert::new(
        request.message.as_deref(),
        location.map(|l| l.describe()),
        contacts,
    );
    tracing::warn!(user_id = %user_id, contacts = alert.contacts.len(), "sending sos alert");

    state.sos.send_alert(&alert).await.map_err(|e| match e {
        AgentError::NotConfigured(_) => ApiError::Internal(format!(
            "{}; set WAYFARER_TOOLS__SOS__WEBHOOK_URL",
            e
        )),
        other => ApiError::Internal(other.to_string()),
    })?;

    Ok(Json(SosResponse {
        delivered: true,
        contacts_notified: alert.contacts.len(),
        location: alert.location,
        sent_at: alert.sent_at,
    }))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/sos/:user_id", post(send_sos))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, json_request, state, state_with};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;
    use wayfarer::models::contact::Contact;
    use wayfarer::tools::configs::SosConfig;
    use wayfarer::tools::ToolsConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn empty_post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_sos_requires_contacts() {
        let response = routes(state(vec![]))
            .oneshot(empty_post("/api/sos/meera"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sos_uses_saved_location() {
        let webhook = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/alerts"))
            .and(body_partial_json(json!({
                "location": "Lat: 9.93, Lon: 76.26, Near: Kochi",
                "contacts": [{"name": "Asha", "number": "+919876543210"}]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&webhook)
            .await;

        let tools = ToolsConfig {
            sos: SosConfig {
                webhook_url: Some(format!("{}/alerts", webhook.uri())),
                ..SosConfig::default()
            },
            ..ToolsConfig::default()
        };
        let state = state_with(vec![], tools);
        state
            .store
            .add_contact("meera", Contact::new("Asha", "9876543210", "sister"))
            .await
            .unwrap();
        state
            .store
            .save_location(
                "meera",
                UserLocation {
                    lat: 9.93,
                    lon: 76.26,
                    city_hint: Some("Kochi".to_string()),
                },
            )
            .await
            .unwrap();

        let response = routes(state)
            .oneshot(empty_post("/api/sos/meera"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["delivered"], true);
        assert_eq!(body["contacts_notified"], 1);
        assert_eq!(body["location"], "Lat: 9.93, Lon: 76.26, Near: Kochi");
    }

    #[tokio::test]
    async fn test_sos_without_webhook_is_server_error() {
        let state = state(vec![]);
        state
            .store
            .add_contact("meera", Contact::new("Asha", "9876543210", "sister"))
            .await
            .unwrap();

        let response = routes(state)
            .oneshot(json_request(
                "POST",
                "/api/sos/meera",
                json!({"location": {"lat": 12.97, "lon": 77.59}}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("SOS alert channel is not configured"));
    }
}
