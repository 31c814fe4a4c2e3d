use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::configs::ToolsConfig;
use crate::errors::{AgentError, AgentResult};

/// Build the client an adapter uses for every outbound call
pub fn build_client(config: &ToolsConfig) -> AgentResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| AgentError::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// Map a non-success status to a dependency error naming the service
pub fn check_status(service: &str, response: Response) -> AgentResult<Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AgentError::Dependency(format!(
            "{} authentication failed",
            service
        ))),
        StatusCode::TOO_MANY_REQUESTS => Err(AgentError::Dependency(format!(
            "{} rate limit exceeded, try again later",
            service
        ))),
        status => Err(AgentError::Dependency(format!(
            "{} returned status {}",
            service,
            status.as_u16()
        ))),
    }
}

/// Send a request and decode its JSON body
pub async fn fetch_json(service: &str, request: reqwest::RequestBuilder) -> AgentResult<Value> {
    let response = request
        .send()
        .await
        .map_err(|e| AgentError::dependency(service, transport_message(&e)))?;
    let response = check_status(service, response)?;
    read_json(service, response).await
}

pub async fn read_json(service: &str, response: Response) -> AgentResult<Value> {
    response
        .json::<Value>()
        .await
        .map_err(|e| AgentError::Dependency(format!("{} sent a malformed response: {}", service, e)))
}

pub fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "could not connect".to_string()
    } else {
        err.to_string()
    }
}

/// Truncate to `max` characters, marking the cut with an ellipsis
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
