use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a settings field path such as `provider.api_key` to the variable that sets it
pub fn to_env_var(field_path: &str) -> String {
    format!("WAYFARER_{}", field_path.to_uppercase().replace('.', "__"))
}

/// Errors returned by request handlers, rendered as `{"error": "..."}`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Bad ids surface from the store as validation failures
        match err.downcast_ref::<wayfarer::errors::AgentError>() {
            Some(wayfarer::errors::AgentError::InvalidParameters(message)) => {
                ApiError::BadRequest(message.clone())
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "rejected request");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer::errors::AgentError;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider.api_key"), "WAYFARER_PROVIDER__API_KEY");
        assert_eq!(to_env_var("server.port"), "WAYFARER_SERVER__PORT");
    }

    #[test]
    fn test_invalid_id_is_bad_request() {
        let err: ApiError =
            anyhow::Error::new(AgentError::InvalidParameters("bad id".to_string())).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
