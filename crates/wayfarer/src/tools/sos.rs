use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::adapter::Adapter;
use super::configs::{SosConfig, ToolsConfig};
use super::http::{build_client, check_status, transport_message};
use super::schema::{optional_str, ToolSpec};
use crate::errors::{AgentError, AgentResult};
use crate::models::contact::Contact;
use crate::models::tool::{Tool, ToolKind};
use crate::store::SessionStore;

const SERVICE: &str = "SOS alert channel";
const NO_CONTACTS: &str =
    "No emergency contacts found. Ask the traveller to add one before using SOS.";
pub const DEFAULT_SOS_MESSAGE: &str =
    "EMERGENCY! I need immediate help. This is an automated SOS alert.";

/// The body posted to the alert webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosAlert {
    pub message: String,
    pub location: Option<String>,
    pub contacts: Vec<Contact>,
    pub sent_at: String,
}

impl SosAlert {
    pub fn new(message: Option<&str>, location: Option<String>, contacts: Vec<Contact>) -> Self {
        Self {
            message: message.unwrap_or(DEFAULT_SOS_MESSAGE).to_string(),
            location,
            contacts,
            sent_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Emergency alerts forwarded to a webhook that fans out to the traveller's contacts.
///
/// With a store attached, a call carrying `user_id` alerts that user's saved contacts and
/// falls back to their last saved location. The configured contacts are used only when
/// the user has saved none, and an alert with nobody to notify is never sent.
///
/// Delivery is fire-and-forget: once the webhook accepts an alert it cannot be recalled,
/// even if the request that triggered it is abandoned.
pub struct SosAdapter {
    tool: ToolSpec,
    client: Client,
    config: SosConfig,
    store: Option<Arc<dyn SessionStore>>,
}

impl SosAdapter {
    pub fn new(config: &ToolsConfig) -> AgentResult<Self> {
        let tool = Tool::new(
            ToolKind::Sos.as_ref(),
            "Send an emergency alert with the traveller's location to their emergency contacts. \
            Only use this when the traveller says they are in danger or asks for help.",
            json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "What is happening, in the traveller's words."
                    },
                    "location": {
                        "type": "string",
                        "description": "Where the traveller is, as precisely as known."
                    }
                }
            }),
        );

        Ok(Self {
            tool: ToolSpec::new(tool)?,
            client: build_client(config)?,
            config: config.sos.clone(),
            store: None,
        })
    }

    /// Resolve contacts and locations saved through the store
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// The user's saved contacts, or the configured defaults when there are none
    pub async fn contacts_for(&self, user_id: Option<&str>) -> AgentResult<Vec<Contact>> {
        if let (Some(store), Some(user_id)) = (&self.store, user_id) {
            let saved = store.list_contacts(user_id).await.map_err(|e| {
                AgentError::Internal(format!("Failed to load emergency contacts: {}", e))
            })?;
            if !saved.is_empty() {
                return Ok(saved);
            }
        }
        Ok(self.config.contacts.clone())
    }

    async fn saved_location(&self, user_id: Option<&str>) -> Option<String> {
        let (store, user_id) = (self.store.as_ref()?, user_id?);
        match store.get_location(user_id).await {
            Ok(location) => location.map(|l| l.describe()),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "failed to load saved location");
                None
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url().is_some()
    }

    fn webhook_url(&self) -> Option<&str> {
        self.config
            .webhook_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
    }

    /// Deliver an alert to the webhook. An alert without contacts is refused.
    pub async fn send_alert(&self, alert: &SosAlert) -> AgentResult<()> {
        let url = self
            .webhook_url()
            .ok_or_else(|| AgentError::NotConfigured(SERVICE.to_string()))?;
        if alert.contacts.is_empty() {
            return Err(AgentError::Dependency(NO_CONTACTS.to_string()));
        }

        let mut request = self.client.post(url).json(alert);
        if let Some(token) = self.config.token.as_deref().filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::dependency(SERVICE, transport_message(&e)))?;
        check_status(SERVICE, response)?;

        tracing::info!(
            contacts = alert.contacts.len(),
            has_location = alert.location.is_some(),
            "sos alert delivered"
        );
        Ok(())
    }
}

#[async_trait]
impl Adapter for SosAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Sos
    }

    fn spec(&self) -> &ToolSpec {
        &self.tool
    }

    fn missing_configuration(&self) -> Option<String> {
        if self.is_configured() {
            None
        } else {
            Some(SERVICE.to_string())
        }
    }

    async fn run(&self, arguments: &Value) -> AgentResult<Value> {
        let user_id = optional_str(arguments, "user_id");
        let contacts = self.contacts_for(user_id).await?;
        let location = match optional_str(arguments, "location") {
            Some(location) => Some(location.to_string()),
            None => self.saved_location(user_id).await,
        };

        let alert = SosAlert::new(optional_str(arguments, "message"), location, contacts);
        self.send_alert(&alert).await?;

        Ok(json!({
            "delivered": true,
            "location": alert.location,
            "contacts_notified": alert.contacts.len(),
            "sent_at": alert.sent_at,
        }))
    }
}
