use anyhow::Result;
use std::sync::Arc;
use wayfarer::agent::{Agent, AgentConfig};
use wayfarer::providers::factory;
use wayfarer::store::{FileStore, MemoryStore, SessionStore};
use wayfarer::tools::sos::SosAdapter;
use wayfarer::tools::{ToolRegistry, ToolsConfig};

use crate::configuration::{ProviderSettings, StorageSettings};

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub store: Arc<dyn SessionStore>,
    /// Direct channel for the SOS button, which bypasses the model
    pub sos: Arc<SosAdapter>,
}

impl AppState {
    pub fn new(
        provider: ProviderSettings,
        tools: &ToolsConfig,
        agent: AgentConfig,
        storage: StorageSettings,
    ) -> Result<Self> {
        let provider = factory::get_provider(provider.into_config())?;

        let store: Arc<dyn SessionStore> = match storage {
            StorageSettings::File { path } => {
                let store = FileStore::new(&path)?;
                tracing::info!(root = %store.root().display(), "storing sessions on disk");
                Arc::new(store)
            }
            StorageSettings::Memory => Arc::new(MemoryStore::new()),
        };

        let registry = ToolRegistry::from_config_with_store(tools, store.clone())?;
        for (kind, service) in registry.unconfigured() {
            tracing::warn!(tool = %kind, "{} is not configured, the tool will report itself unavailable", service);
        }

        Ok(Self::with_parts(
            Agent::new(provider, registry, agent),
            store.clone(),
            SosAdapter::new(tools)?.with_store(store),
        ))
    }

    pub fn with_parts(agent: Agent, store: Arc<dyn SessionStore>, sos: SosAdapter) -> Self {
        Self {
            agent: Arc::new(agent),
            store,
            sos: Arc::new(sos),
        }
    }
}
