use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use strum::IntoEnumIterator;

use super::adapter::Adapter;
use super::booking::BookingAdapter;
use super::budget::BudgetAdapter;
use super::configs::ToolsConfig;
use super::directions::DirectionsAdapter;
use super::images::ImagesAdapter;
use super::news::NewsAdapter;
use super::places::PlacesAdapter;
use super::sos::SosAdapter;
use super::weather::WeatherAdapter;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall, ToolKind, ToolResult};
use crate::store::SessionStore;

/// Static mapping from every [`ToolKind`] to its adapter
pub struct ToolRegistry {
    adapters: HashMap<ToolKind, Box<dyn Adapter>>,
}

impl ToolRegistry {
    /// Build the production adapters from configuration
    pub fn from_config(config: &ToolsConfig) -> AgentResult<Self> {
        Self::build(config, SosAdapter::new(config)?)
    }

    /// Like [`ToolRegistry::from_config`], with SOS alerts resolving the user's saved
    /// contacts and location through `store`
    pub fn from_config_with_store(
        config: &ToolsConfig,
        store: Arc<dyn SessionStore>,
    ) -> AgentResult<Self> {
        Self::build(config, SosAdapter::new(config)?.with_store(store))
    }

    fn build(config: &ToolsConfig, sos: SosAdapter) -> AgentResult<Self> {
        Self::with_adapters(vec![
            Box::new(WeatherAdapter::new(config)?),
            Box::new(PlacesAdapter::new(config)?),
            Box::new(BookingAdapter::new(config)?),
            Box::new(DirectionsAdapter::new(config)?),
            Box::new(NewsAdapter::new(config)?),
            Box::new(ImagesAdapter::new(config)?),
            Box::new(sos),
            Box::new(BudgetAdapter::new()?),
        ])
    }

    /// Build a registry from explicit adapters, checking that every tool kind is served
    /// exactly once and under its own name
    pub fn with_adapters(adapters: Vec<Box<dyn Adapter>>) -> AgentResult<Self> {
        let mut map = HashMap::new();
        for adapter in adapters {
            let kind = adapter.kind();
            if adapter.tool().name != kind.as_ref() {
                return Err(AgentError::Internal(format!(
                    "Adapter for {} advertises the tool as '{}'",
                    kind,
                    adapter.tool().name
                )));
            }
            if map.insert(kind, adapter).is_some() {
                return Err(AgentError::Internal(format!(
                    "Duplicate adapter for {}",
                    kind
                )));
            }
        }

        let missing: Vec<String> = ToolKind::iter()
            .filter(|kind| !map.contains_key(kind))
            .map(|kind| kind.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AgentError::Internal(format!(
                "No adapter registered for: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { adapters: map })
    }

    /// Tool descriptions in a stable order, as sent to the model
    pub fn tools(&self) -> Vec<Tool> {
        ToolKind::iter()
            .filter_map(|kind| self.adapters.get(&kind))
            .map(|adapter| adapter.tool().clone())
            .collect()
    }

    /// Case-sensitive exact lookup by tool name
    pub fn get(&self, name: &str) -> Option<&dyn Adapter> {
        let kind = ToolKind::from_str(name).ok()?;
        self.adapters.get(&kind).map(|adapter| adapter.as_ref())
    }

    /// Adapters that will report "not configured", with the reason
    pub fn unconfigured(&self) -> Vec<(ToolKind, String)> {
        ToolKind::iter()
            .filter_map(|kind| {
                let adapter = self.adapters.get(&kind)?;
                adapter.missing_configuration().map(|reason| (kind, reason))
            })
            .collect()
    }

    /// Run one call. Unknown names fail closed without touching any adapter.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        match self.get(&call.name) {
            Some(adapter) => {
                tracing::info!(tool = %call.name, "dispatching tool call");
                adapter.invoke(&call.arguments).await
            }
            None => {
                tracing::warn!(tool = %call.name, "model requested an unknown tool");
                ToolResult::failure(
                    call.name.clone(),
                    &AgentError::ToolNotFound(call.name.clone()),
                )
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tools::schema::ToolSpec;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Adapter returning a canned payload and counting its calls
    pub struct StubAdapter {
        kind: ToolKind,
        tool: ToolSpec,
        payload: AgentResult<Value>,
        pub calls: Arc<AtomicUsize>,
    }

    impl StubAdapter {
        pub fn new(kind: ToolKind, payload: AgentResult<Value>) -> Self {
            Self {
                kind,
                tool: ToolSpec::new(Tool::new(
                    kind.as_ref(),
                    format!("Stub {}", kind),
                    json!({"type": "object", "properties": {}}),
                ))
                .unwrap(),
                payload,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Adapter for StubAdapter {
        fn kind(&self) -> ToolKind {
            self.kind
        }

        fn spec(&self) -> &ToolSpec {
            &self.tool
        }

        async fn run(&self, _arguments: &Value) -> AgentResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.payload.clone()
        }
    }

    /// A complete registry of stubs, with per-kind overrides and the shared call counter
    pub fn stub_registry(
        overrides: Vec<(ToolKind, AgentResult<Value>)>,
    ) -> (ToolRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let adapters = ToolKind::iter()
            .map(|kind| {
                let payload = overrides
                    .iter()
                    .find(|(k, _)| *k == kind)
                    .map(|(_, p)| p.clone())
                    .unwrap_or_else(|| Ok(json!({"ok": true})));
                let mut stub = StubAdapter::new(kind, payload);
                stub.calls = calls.clone();
                Box::new(stub) as Box<dyn Adapter>
            })
            .collect();
        (ToolRegistry::with_adapters(adapters).unwrap(), calls)
    }

    #[test]
    fn test_registry_requires_every_kind() {
        let adapters: Vec<Box<dyn Adapter>> = vec![Box::new(StubAdapter::new(
            ToolKind::Weather,
            Ok(json!({})),
        ))];
        let err = ToolRegistry::with_adapters(adapters).err().unwrap();
        assert!(err.to_string().contains("No adapter registered for: places"));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut adapters: Vec<Box<dyn Adapter>> = ToolKind::iter()
            .map(|kind| Box::new(StubAdapter::new(kind, Ok(json!({})))) as Box<dyn Adapter>)
            .collect();
        adapters.push(Box::new(StubAdapter::new(ToolKind::News, Ok(json!({})))));

        let err = ToolRegistry::with_adapters(adapters).err().unwrap();
        assert_eq!(err.to_string(), "Internal error: Duplicate adapter for news");
    }

    #[test]
    fn test_tools_follow_kind_order() {
        let (registry, _) = stub_registry(vec![]);
        let names: Vec<String> = registry.tools().into_iter().map(|t| t.name).collect();
        let expected: Vec<String> = ToolKind::iter().map(|k| k.to_string()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_production_registry_is_complete() {
        let registry = ToolRegistry::from_config(&ToolsConfig::default()).unwrap();
        assert_eq!(registry.tools().len(), ToolKind::iter().count());

        // Without keys every networked adapter reports itself, budget never does
        let unconfigured: Vec<ToolKind> =
            registry.unconfigured().into_iter().map(|(k, _)| k).collect();
        assert!(unconfigured.contains(&ToolKind::News));
        assert!(unconfigured.contains(&ToolKind::Sos));
        assert!(!unconfigured.contains(&ToolKind::Places));
        assert!(!unconfigured.contains(&ToolKind::Budget));
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_closed() {
        let (registry, calls) = stub_registry(vec![]);

        for name in ["flights", "Weather", "weather "] {
            let result = registry.dispatch(&ToolCall::new(name, json!({}))).await;
            assert!(!result.success);
            assert_eq!(result.name, name);
            assert_eq!(
                result.error_message(),
                Some(format!("Unknown tool: {}", name).as_str())
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatch_known_tool() {
        let (registry, calls) =
            stub_registry(vec![(ToolKind::Weather, Ok(json!({"temp": 29})))]);

        let result = registry
            .dispatch(&ToolCall::new("weather", json!({"location": "Mumbai"})))
            .await;
        assert!(result.success);
        assert_eq!(result.payload, json!({"temp": 29}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dependency_error_becomes_failed_result() {
        let (registry, _) = stub_registry(vec![(
            ToolKind::News,
            Err(AgentError::Dependency("NewsAPI returned status 500".into())),
        )]);

        let result = registry
            .dispatch(&ToolCall::new("news", json!({"location": "Goa"})))
            .await;
        assert!(!result.success);
        assert_eq!(result.error_message(), Some("NewsAPI returned status 500"));
    }

    #[tokio::test]
    async fn test_not_configured_adapter_reports_without_network() {
        let registry = ToolRegistry::from_config(&ToolsConfig::default()).unwrap();
        let result = registry
            .dispatch(&ToolCall::new("news", json!({"location": "Goa"})))
            .await;

        assert!(!result.success);
        assert!(result.error_message().unwrap().ends_with("is not configured"));
    }
}
