//! Session store trait — per-session conversation history.
//!
//! A session is an ordered list of [`Turn`]s keyed by an opaque session id.
//! Histories grow by whole exchanges (one user turn followed by one assistant
//! turn), so a stored history always has an even length and alternates
//! user/assistant starting with user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::StoreError;
use crate::message::{Message, Role};

/// Who produced a stored turn. System prompts are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for TurnRole {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            other => Err(StoreError::Storage(format!("unknown turn role '{other}'"))),
        }
    }
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// One stored turn of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: TurnRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: TurnRole::Assistant, content: content.into() }
    }

    /// Convert into a prompt message.
    pub fn to_message(&self) -> Message {
        Message { role: self.role.into(), content: self.content.clone() }
    }
}

/// The core SessionStore trait.
///
/// Implementations: JSON file, SQLite, in-memory. All of them must be safe
/// under concurrent access from multiple requests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "json", "sqlite", "memory").
    fn name(&self) -> &str;

    /// Ordered turns of a session. Unknown sessions have an empty history.
    async fn history(&self, session_id: &str) -> std::result::Result<Vec<Turn>, StoreError>;

    /// Append a single turn to a session, creating it if absent.
    async fn append(&self, session_id: &str, turn: Turn) -> std::result::Result<(), StoreError>;

    /// Append a user turn and its assistant reply as one unit.
    ///
    /// Either both turns become visible or neither does.
    async fn append_exchange(
        &self,
        session_id: &str,
        user: Turn,
        assistant: Turn,
    ) -> std::result::Result<(), StoreError>;

    /// Delete a session. Returns whether it existed.
    async fn reset(&self, session_id: &str) -> std::result::Result<bool, StoreError>;

    /// Ids of every session that currently has history.
    async fn session_ids(&self) -> std::result::Result<Vec<String>, StoreError>;
}
