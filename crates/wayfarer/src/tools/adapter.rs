use async_trait::async_trait;
use serde_json::Value;

use super::schema::ToolSpec;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolKind, ToolResult};

/// Core trait for a tool the agent can call.
///
/// Implementors only describe themselves and perform the call; argument validation,
/// the configuration check and the conversion of errors into failed results happen in
/// [`Adapter::invoke`].
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Which tool of the closed set this adapter serves
    fn kind(&self) -> ToolKind;

    /// The tool description advertised to the model, with its compiled argument schema
    fn spec(&self) -> &ToolSpec;

    fn tool(&self) -> &Tool {
        self.spec().tool()
    }

    /// Describe what is missing when the adapter cannot run, e.g. an absent API key
    fn missing_configuration(&self) -> Option<String> {
        None
    }

    /// Perform the call with arguments that already passed validation
    async fn run(&self, arguments: &Value) -> AgentResult<Value>;

    /// Validate, run and normalize one call. Never fails: errors become failed results.
    async fn invoke(&self, arguments: &Value) -> ToolResult {
        let name = self.kind().to_string();

        let outcome = match self.spec().validate(arguments) {
            Err(e) => Err(e),
            Ok(()) => match self.missing_configuration() {
                Some(missing) => Err(AgentError::NotConfigured(missing)),
                None => self.run(arguments).await,
            },
        };

        match outcome {
            Ok(payload) => ToolResult::success(name, payload),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool call failed");
                ToolResult::failure(name, &e)
            }
        }
    }
}
