use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::AgentError;

/// Name recorded for tool requests the model produced but that could not be parsed
pub const INVALID_TOOL_CALL: &str = "invalid_tool_call";

/// The closed set of capabilities the agent can ask for.
///
/// The string form of each variant is the tool name advertised to the model, and lookups
/// are case-sensitive exact matches against it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Weather,
    Places,
    Booking,
    Directions,
    News,
    Images,
    Sos,
    Budget,
}

/// A tool that can be used by a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// A JSON Schema object defining the expected parameters for the tool
    pub input_schema: Value,
}

impl Tool {
    /// Create a new tool with the given name and description
    pub fn new<N, D>(name: N, description: D, input_schema: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A tool call request that an adapter can execute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// The name of the tool to execute
    pub name: String,
    /// The parameters for the execution
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new ToolCall with the given name and parameters
    pub fn new<S: Into<String>>(name: S, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// The normalized outcome of one adapter invocation.
///
/// Failures are carried as data so the conversation can continue: the payload then holds
/// a single human-readable `error` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub name: String,
    pub payload: Value,
    pub success: bool,
}

impl ToolResult {
    pub fn success<S: Into<String>>(name: S, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            success: true,
        }
    }

    pub fn failure<S: Into<String>>(name: S, error: &AgentError) -> Self {
        Self {
            name: name.into(),
            payload: json!({ "error": error.to_string() }),
            success: false,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        self.payload.get("error").and_then(|e| e.as_str())
    }
}
