use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::message::Message;
use super::role::Role;
use crate::errors::{AgentError, AgentResult};

lazy_static! {
    static ref SESSION_ID: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap();
}

/// Check that a session or user id is safe to use as a storage key.
pub fn validate_session_id(id: &str) -> AgentResult<()> {
    if SESSION_ID.is_match(id) {
        Ok(())
    } else {
        Err(AgentError::InvalidParameters(format!(
            "Session id '{}' must be 1-64 characters of letters, digits, '-' or '_'",
            id
        )))
    }
}

/// The ordered turns exchanged within one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub session_id: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new<S: Into<String>>(session_id: S) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop the oldest turns so at most `max_messages` remain.
    ///
    /// The cut always lands on a user turn, so a tool turn never survives without the
    /// assistant request that produced it. If no user turn fits inside the window the
    /// conversation keeps only its most recent user turn onwards.
    pub fn truncate_to(&mut self, max_messages: usize) {
        if self.messages.len() <= max_messages {
            return;
        }

        let earliest = self.messages.len() - max_messages;
        let cut = self.messages[earliest..]
            .iter()
            .position(|m| m.role == Role::User)
            .map(|offset| earliest + offset)
            .or_else(|| self.messages.iter().rposition(|m| m.role == Role::User));

        match cut {
            Some(index) => {
                self.messages.drain(..index);
            }
            None => self.messages.clear(),
        }
    }
}
