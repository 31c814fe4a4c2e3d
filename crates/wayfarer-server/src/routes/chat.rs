use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use wayfarer::agent::Attachment;
use wayfarer::models::contact::UserLocation;
use wayfarer::models::conversation::{validate_session_id, Conversation};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default, alias = "sessionId")]
    session_id: Option<String>,
    #[serde(default, alias = "text")]
    message: Option<String>,
    /// Position reported by the browser with this message
    #[serde(default)]
    location: Option<UserLocation>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    reply: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<Attachment>,
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let session_id = request
        .session_id
        .ok_or_else(|| ApiError::BadRequest("session_id is required".to_string()))?;
    validate_session_id(&session_id).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let message = request
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::BadRequest("message is required".to_string()))?;

    let location = match request.location {
        Some(location) => {
            location
                .validate()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            state
                .store
                .save_location(&session_id, location.clone())
                .await?;
            Some(location)
        }
        None => state.store.get_location(&session_id).await?,
    };
    let location = location.map(|l| l.describe());

    let mut conversation = state
        .store
        .load_conversation(&session_id)
        .await?
        .unwrap_or_else(|| Conversation::new(session_id.clone()));

    tracing::info!(session_id = %session_id, history = conversation.len(), "received chat message");
    let reply = state
        .agent
        .handle_message(&mut conversation, &message, location.as_deref())
        .await;

    // History is a convenience; a failed save must not cost the user their answer
    if let Err(e) = state.store.save_conversation(&conversation).await {
        tracing::warn!(session_id = %session_id, error = %e, "failed to save session");
    }

    Ok(Json(ChatResponse {
        session_id,
        reply: reply.text,
        attachments: reply.attachments,
    }))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, json_request, state, state_with};
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;
    use wayfarer::models::contact::Contact;
    use wayfarer::models::message::Message;
    use wayfarer::models::tool::ToolCall;
    use wayfarer::tools::configs::{ServiceConfig, SosConfig};
    use wayfarer::tools::ToolsConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_chat_returns_reply_and_saves_history() {
        let state = state(vec![Message::assistant().with_text("Namaste! Where to?")]);
        let store = state.store.clone();
        let app = routes(state);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({"sessionId": "s1", "message": "Hello"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["reply"], "Namaste! Where to?");
        assert_eq!(body["session_id"], "s1");
        assert!(body.get("attachments").is_none());

        let saved = store.load_conversation("s1").await.unwrap().unwrap();
        assert_eq!(saved.len(), 2);
    }

    #[tokio::test]
    async fn test_chat_accepts_text_field() {
        let app = routes(state(vec![Message::assistant().with_text("Hello again!")]));

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({"sessionId": "s2", "text": "Hi there"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["reply"], "Hello again!");
    }

    #[tokio::test]
    async fn test_chat_with_local_tool() {
        let app = routes(state(vec![
            Message::assistant().with_tool_request(
                "1",
                Ok(ToolCall::new(
                    "budget",
                    json!({"destination": "Goa", "days": 4, "traveler_type": "mid-range"}),
                )),
            ),
            Message::assistant().with_text("Plan on about ₹26,400 for four days in Goa."),
        ]));

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({"session_id": "goa", "message": "Budget for 4 days in Goa?"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["reply"].as_str().unwrap().contains("26,400"));
    }

    #[tokio::test]
    async fn test_chat_weather_attachment() {
        let weather = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Mumbai",
                "sys": {"country": "IN"},
                "main": {"temp": 29.0, "feels_like": 31.0, "humidity": 60},
                "weather": [{"description": "sunny"}],
                "wind": {"speed": 2.0}
            })))
            .mount(&weather)
            .await;

        let tools = ToolsConfig {
            weather: ServiceConfig::new(weather.uri()).with_api_key("key"),
            ..ToolsConfig::default()
        };
        let app = routes(state_with(
            vec![
                Message::assistant().with_tool_request(
                    "1",
                    Ok(ToolCall::new("weather", json!({"location": "Mumbai"}))),
                ),
                Message::assistant().with_text("29°C and sunny."),
            ],
            tools,
        ));

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({"session_id": "m1", "message": "Weather in Mumbai tomorrow"}),
            ))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["attachments"][0]["type"], "weather");
        assert_eq!(body["attachments"][0]["data"]["temp"], 29.0);
    }

    #[tokio::test]
    async fn test_chat_sos_reaches_saved_contacts() {
        let webhook = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/alerts"))
            .and(body_partial_json(json!({
                "location": "Lat: 9.93, Lon: 76.26",
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
        let state = state_with(
            vec![
                Message::assistant().with_tool_request(
                    "1",
                    Ok(ToolCall::new("sos", json!({"message": "help"}))),
                ),
                Message::assistant().with_text("Asha has been alerted."),
            ],
            tools,
        );
        state
            .store
            .add_contact("meera", Contact::new("Asha", "9876543210", "sister"))
            .await
            .unwrap();

        let response = routes(state)
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({
                    "session_id": "meera",
                    "message": "Help!",
                    "location": {"lat": 9.93, "lon": 76.26}
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["reply"], "Asha has been alerted.");
    }

    #[tokio::test]
    async fn test_model_outage_is_still_a_reply() {
        let app = routes(state(vec![]));

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({"session_id": "s1", "message": "Hello"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["reply"]
            .as_str()
            .unwrap()
            .starts_with("I couldn't complete that request"));
    }

    #[tokio::test]
    async fn test_chat_rejects_bad_input() {
        let cases = vec![
            json!({"session_id": "s1"}),
            json!({"session_id": "s1", "message": "   "}),
            json!({"message": "Hello"}),
            json!({"session_id": "../etc", "message": "Hello"}),
            json!({"session_id": "s1", "message": "Hello", "location": {"lat": 95.0, "lon": 76.26}}),
        ];

        for body in cases {
            let app = routes(state(vec![]));
            let response = app
                .oneshot(json_request("POST", "/api/chat", body.clone()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
            assert!(body_json(response).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_json() {
        let app = routes(state(vec![]));
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
