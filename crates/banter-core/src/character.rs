//! Character records and the roster collaborator.
//!
//! Characters are owned by an external persistence service. The orchestrator
//! only reads them through [`CharacterRoster`] and never mutates them.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Opaque identifier issued by the character roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(String);

impl CharacterId {
    /// Wraps a roster-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CharacterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Whether a character is played by a person at the table or by the moderator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterRole {
    /// Player character.
    #[serde(rename = "PC")]
    Pc,
    /// Non-player character voiced by the generation service.
    #[serde(rename = "NPC")]
    Npc,
}

/// A character record as listed by the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Roster identifier.
    pub id: CharacterId,
    /// Display name, also used as the speaker of the character's lines.
    pub name: String,
    /// PC or NPC.
    pub role: CharacterRole,
}

impl Character {
    /// Creates a character record.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: CharacterRole) -> Self {
        Self {
            id: CharacterId::new(id),
            name: name.into(),
            role,
        }
    }

    /// Returns `true` for player characters.
    #[must_use]
    pub fn is_player_character(&self) -> bool {
        self.role == CharacterRole::Pc
    }
}

/// Read-only access to the externally owned character records.
#[async_trait]
pub trait CharacterRoster: Send + Sync {
    /// Lists every character known to the roster.
    async fn list_characters(&self) -> Result<Vec<Character>, DomainError>;
}
