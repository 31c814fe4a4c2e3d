// Export route modules
pub mod chat;
pub mod contacts;
pub mod location;
pub mod session;
pub mod sos;
pub mod status;

use axum::Router;
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

use crate::state::AppState;

// Function to configure all routes
pub fn configure(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .merge(chat::routes(state.clone()))
        .merge(session::routes(state.clone()))
        .merge(status::routes(state.clone()))
        .merge(location::routes(state.clone()))
        .merge(contacts::routes(state.clone()))
        .merge(sos::routes(state))
        .nest_service("/static", ServeDir::new(static_dir))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use wayfarer::agent::{Agent, AgentConfig};
    use wayfarer::models::message::Message;
    use wayfarer::models::tool::Tool;
    use wayfarer::providers::base::{Provider, Usage};
    use wayfarer::store::{MemoryStore, SessionStore};
    use wayfarer::tools::sos::SosAdapter;
    use wayfarer::tools::{ToolRegistry, ToolsConfig};

    use crate::state::AppState;

    /// Replays canned model messages; an exhausted script behaves like an outage
    pub struct ScriptedProvider {
        responses: Arc<Mutex<Vec<Message>>>,
    }

    impl ScriptedProvider {
        pub fn new(responses: Vec<Message>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses)),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn complete(
            &self,
            _system: &str,
            _messages: &[Message],
            _tools: &[Tool],
        ) -> Result<(Message, Usage)> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(anyhow!("Server error: 503 Service Unavailable"));
            }
            Ok((responses.remove(0), Usage::default()))
        }
    }

    pub fn state_with(responses: Vec<Message>, tools: ToolsConfig) -> AppState {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let agent = Agent::new(
            Box::new(ScriptedProvider::new(responses)),
            ToolRegistry::from_config_with_store(&tools, store.clone()).unwrap(),
            AgentConfig::default(),
        );
        AppState::with_parts(
            agent,
            store.clone(),
            SosAdapter::new(&tools).unwrap().with_store(store),
        )
    }

    pub fn state(responses: Vec<Message>) -> AppState {
        state_with(responses, ToolsConfig::default())
    }

    pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub async fn body_json(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
