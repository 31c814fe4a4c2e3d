use jsonschema::JSONSchema;
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;

/// A tool description together with its argument schema, compiled once when the
/// adapter is built
pub struct ToolSpec {
    tool: Tool,
    validator: JSONSchema,
}

impl ToolSpec {
    pub fn new(tool: Tool) -> AgentResult<Self> {
        let validator = JSONSchema::compile(&tool.input_schema).map_err(|e| {
            AgentError::Internal(format!("Invalid schema for {}: {}", tool.name, e))
        })?;
        Ok(Self { tool, validator })
    }

    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    /// Check tool arguments against the input schema before any network call
    pub fn validate(&self, arguments: &Value) -> AgentResult<()> {
        if !arguments.is_object() {
            return Err(AgentError::InvalidParameters(format!(
                "Arguments for {} must be an object",
                self.tool.name
            )));
        }

        let messages = match self.validator.validate(arguments) {
            Ok(()) => None,
            Err(errors) => Some(
                errors
                    .map(|e| {
                        let path = e.instance_path.to_string();
                        if path.is_empty() {
                            e.to_string()
                        } else {
                            format!("{}: {}", path, e)
                        }
                    })
                    .collect::<Vec<String>>(),
            ),
        };

        match messages {
            Some(messages) => Err(AgentError::InvalidParameters(messages.join("; "))),
            None => Ok(()),
        }
    }
}

/// Read an optional string argument, treating blank values as absent
pub fn optional_str<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Read a string argument the schema already marked as required
pub fn required_str<'a>(arguments: &'a Value, key: &str) -> AgentResult<&'a str> {
    optional_str(arguments, key)
        .ok_or_else(|| AgentError::InvalidParameters(format!("'{}' must not be empty", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_tool() -> ToolSpec {
        ToolSpec::new(Tool::new(
            "weather",
            "Weather",
            json!({
                "type": "object",
                "required": ["location"],
                "properties": {
                    "location": {"type": "string"},
                    "units": {"enum": ["metric", "imperial"]}
                }
            }),
        ))
        .unwrap()
    }

    #[test]
    fn test_valid_arguments() {
        assert!(weather_tool().validate(&json!({"location": "Pune"})).is_ok());
    }

    #[test]
    fn test_missing_required_key() {
        let err = weather_tool().validate(&json!({})).unwrap_err();
        match err {
            AgentError::InvalidParameters(msg) => assert!(msg.contains("location")),
            other => panic!("Expected InvalidParameters, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_type_and_enum() {
        let err = weather_tool().validate(&json!({"location": 42})).unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameters(_)));

        let err = weather_tool()
            .validate(&json!({"location": "Pune", "units": "kelvin"}))
            .unwrap_err();
        assert!(err.to_string().contains("/units"));
    }

    #[test]
    fn test_invalid_schema_rejected_at_build() {
        let err = ToolSpec::new(Tool::new(
            "weather",
            "Weather",
            json!({"type": "objekt"}),
        ))
        .err()
        .unwrap();
        assert!(err.to_string().starts_with("Internal error: Invalid schema for weather"));
    }

    #[test]
    fn test_non_object_arguments() {
        let err = weather_tool().validate(&json!("Pune")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameters: Arguments for weather must be an object"
        );
    }

    #[test]
    fn test_string_helpers() {
        let args = json!({"location": "  Goa ", "blank": " "});
        assert_eq!(optional_str(&args, "location"), Some("Goa"));
        assert_eq!(optional_str(&args, "blank"), None);
        assert!(required_str(&args, "blank").is_err());
    }
}
