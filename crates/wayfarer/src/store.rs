//! Persistence for conversations, emergency contacts and last known locations.
//!
//! Nothing here is needed to answer a single message; the store only carries state
//! between requests for the same session or user.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::models::contact::{Contact, UserLocation};
use crate::models::conversation::{validate_session_id, Conversation};
use crate::models::message::Message;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The stored conversation, or `None` when the session has never been saved
    async fn load_conversation(&self, session_id: &str) -> Result<Option<Conversation>>;

    async fn save_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Add a contact for the user, replacing any existing contact with the same number.
    /// Returns the full list after the change.
    async fn add_contact(&self, user_id: &str, contact: Contact) -> Result<Vec<Contact>>;

    async fn list_contacts(&self, user_id: &str) -> Result<Vec<Contact>>;

    async fn save_location(&self, user_id: &str, location: UserLocation) -> Result<()>;

    async fn get_location(&self, user_id: &str) -> Result<Option<UserLocation>>;
}

fn upsert_contact(contacts: &mut Vec<Contact>, contact: Contact) {
    let contact = contact.normalized();
    match contacts.iter_mut().find(|c| c.number == contact.number) {
        Some(existing) => *existing = contact,
        None => contacts.push(contact),
    }
}

/// Stores everything as plain files under one root directory:
///
/// ```text
/// <root>/sessions/<session_id>.jsonl   one message per line
/// <root>/contacts/<user_id>.json
/// <root>/locations/<user_id>.json
/// ```
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`; `~` and environment variables are expanded.
    pub fn new(root: &str) -> Result<Self> {
        let expanded = shellexpand::full(root)
            .with_context(|| format!("Could not expand storage path '{}'", root))?;
        Ok(Self {
            root: PathBuf::from(expanded.as_ref()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn path_for(&self, kind: &str, id: &str, extension: &str) -> Result<PathBuf> {
        validate_session_id(id)?;
        let dir = self.root.join(kind);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(dir.join(format!("{}.{}", id, extension)))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text).with_context(|| {
                format!("Corrupt document at {}", path.display())
            })?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
        let text = serde_json::to_string_pretty(value)?;
        fs::write(path, text).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn load_conversation(&self, session_id: &str) -> Result<Option<Conversation>> {
        let path = self.path_for("sessions", session_id, "jsonl").await?;
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut conversation = Conversation::new(session_id);
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let message: Message = serde_json::from_str(line).with_context(|| {
                format!("Corrupt message on line {} of {}", number + 1, path.display())
            })?;
            conversation.push(message);
        }
        Ok(Some(conversation))
    }

    async fn save_conversation(&self, conversation: &Conversation) -> Result<()> {
        let path = self
            .path_for("sessions", &conversation.session_id, "jsonl")
            .await?;

        let mut buffer = Vec::new();
        for message in conversation.messages() {
            serde_json::to_writer(&mut buffer, message)?;
            buffer.push(b'\n');
        }

        let mut file = fs::File::create(&path)
            .await
            .with_context(|| format!("Failed to open session file {}", path.display()))?;
        file.write_all(&buffer).await?;
        file.flush().await?;

        tracing::debug!(session_id = %conversation.session_id, messages = conversation.len(), "saved session");
        Ok(())
    }

    async fn add_contact(&self, user_id: &str, contact: Contact) -> Result<Vec<Contact>> {
        let path = self.path_for("contacts", user_id, "json").await?;
        let mut contacts: Vec<Contact> = Self::read_json(&path).await?.unwrap_or_default();
        upsert_contact(&mut contacts, contact);
        Self::write_json(&path, &contacts).await?;
        Ok(contacts)
    }

    async fn list_contacts(&self, user_id: &str) -> Result<Vec<Contact>> {
        let path = self.path_for("contacts", user_id, "json").await?;
        Ok(Self::read_json(&path).await?.unwrap_or_default())
    }

    async fn save_location(&self, user_id: &str, location: UserLocation) -> Result<()> {
        let path = self.path_for("locations", user_id, "json").await?;
        Self::write_json(&path, &location).await
    }

    async fn get_location(&self, user_id: &str) -> Result<Option<UserLocation>> {
        let path = self.path_for("locations", user_id, "json").await?;
        Self::read_json(&path).await
    }
}

/// Keeps everything in process memory; used in tests and when no storage path is set.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Conversation>>,
    contacts: RwLock<HashMap<String, Vec<Contact>>>,
    locations: RwLock<HashMap<String, UserLocation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_conversation(&self, session_id: &str) -> Result<Option<Conversation>> {
        validate_session_id(session_id)?;
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save_conversation(&self, conversation: &Conversation) -> Result<()> {
        validate_session_id(&conversation.session_id)?;
        self.sessions
            .write()
            .await
            .insert(conversation.session_id.clone(), conversation.clone());
        Ok(())
    }

    async fn add_contact(&self, user_id: &str, contact: Contact) -> Result<Vec<Contact>> {
        validate_session_id(user_id)?;
        let mut all = self.contacts.write().await;
        let contacts = all.entry(user_id.to_string()).or_default();
        upsert_contact(contacts, contact);
        Ok(contacts.clone())
    }

    async fn list_contacts(&self, user_id: &str) -> Result<Vec<Contact>> {
        validate_session_id(user_id)?;
        Ok(self
            .contacts
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_location(&self, user_id: &str, location: UserLocation) -> Result<()> {
        validate_session_id(user_id)?;
        self.locations
            .write()
            .await
            .insert(user_id.to_string(), location);
        Ok(())
    }

    async fn get_location(&self, user_id: &str) -> Result<Option<UserLocation>> {
        validate_session_id(user_id)?;
        Ok(self.locations.read().await.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tool::{ToolCall, ToolResult};
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_conversation() -> Conversation {
        let mut conversation = Conversation::new("trip-1");
        conversation.push(Message::user().with_text("Weather in Goa"));
        conversation.push(
            Message::assistant()
                .with_tool_request("1", Ok(ToolCall::new("weather", json!({"location": "Goa"})))),
        );
        conversation.push(
            Message::tool()
                .with_tool_response("1", ToolResult::success("weather", json!({"temp": 31}))),
        );
        conversation.push(Message::assistant().with_text("31°C and humid."));
        conversation
    }

    async fn exercise_store(store: &dyn SessionStore) -> Result<()> {
        assert!(store.load_conversation("trip-1").await?.is_none());

        let conversation = sample_conversation();
        store.save_conversation(&conversation).await?;
        assert_eq!(store.load_conversation("trip-1").await?, Some(conversation));

        assert!(store.list_contacts("meera").await?.is_empty());
        store
            .add_contact("meera", Contact::new("Asha", "98765 43210", "sister"))
            .await?;
        let contacts = store
            .add_contact(
                "meera",
                Contact {
                    name: "Asha K".to_string(),
                    number: "+919876543210".to_string(),
                    relation: "sister".to_string(),
                },
            )
            .await?;
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Asha K");
        assert_eq!(store.list_contacts("meera").await?, contacts);

        assert!(store.get_location("meera").await?.is_none());
        let location = UserLocation {
            lat: 15.49,
            lon: 73.82,
            city_hint: Some("Panaji".to_string()),
        };
        store.save_location("meera", location.clone()).await?;
        assert_eq!(store.get_location("meera").await?, Some(location));

        assert!(store.load_conversation("../escape").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_store() -> Result<()> {
        exercise_store(&MemoryStore::new()).await
    }

    #[tokio::test]
    async fn test_file_store() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(&dir.path().to_string_lossy())?;
        exercise_store(&store).await?;

        let session = fs::read_to_string(dir.path().join("sessions").join("trip-1.jsonl")).await?;
        assert_eq!(session.lines().count(), 4);
        assert!(dir.path().join("contacts").join("meera.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_session() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(&dir.path().to_string_lossy())?;
        std::fs::create_dir_all(dir.path().join("sessions"))?;
        std::fs::write(dir.path().join("sessions").join("bad.jsonl"), "not json\n")?;

        let err = store.load_conversation("bad").await.unwrap_err();
        assert!(err.to_string().contains("line 1"));
        Ok(())
    }

    #[test]
    fn test_file_store_expands_variables() -> Result<()> {
        std::env::set_var("WAYFARER_TEST_ROOT", "/tmp/wayfarer-root");
        let store = FileStore::new("$WAYFARER_TEST_ROOT/data")?;
        assert_eq!(store.root(), Path::new("/tmp/wayfarer-root/data"));
        Ok(())
    }
}
