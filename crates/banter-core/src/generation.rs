//! The text-generation collaborator contract.
//!
//! Two logical calls exist: one asks a character to react to the latest
//! event in the scene, the other performs a moderator action on behalf of a
//! character. The wire shape is owned by the implementation.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::character::CharacterId;

/// Moderator actions recognized by the generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Commit the most recent exchange to the character's long-term memory.
    SubmitMemory,
    /// Revert the last memory commit.
    UndoMemory,
    /// Advance the character to its next topic.
    NextTopic,
    /// Generate a fresh set of topics.
    RegenerateTopics,
    /// Suggest candidate next lines.
    #[serde(rename = "show_top5_options")]
    ShowTop5Options,
    /// Conversation tree view. Reserved.
    ShowTree,
}

impl ActionKind {
    /// All recognized action kinds.
    pub const ALL: [Self; 6] = [
        Self::SubmitMemory,
        Self::UndoMemory,
        Self::NextTopic,
        Self::RegenerateTopics,
        Self::ShowTop5Options,
        Self::ShowTree,
    ];

    /// The wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubmitMemory => "submit_memory",
            Self::UndoMemory => "undo_memory",
            Self::NextTopic => "next_topic",
            Self::RegenerateTopics => "regenerate_topics",
            Self::ShowTop5Options => "show_top5_options",
            Self::ShowTree => "show_tree",
        }
    }

    /// Returns `true` for actions whose reply carries topic strings.
    #[must_use]
    pub const fn yields_topics(self) -> bool {
        matches!(self, Self::NextTopic | Self::RegenerateTopics)
    }

    /// Returns `true` for actions whose reply surfaces a list of options.
    #[must_use]
    pub const fn surfaces_options(self) -> bool {
        self.yields_topics() || matches!(self, Self::ShowTop5Options)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of history as seen by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLine {
    /// Who said it.
    pub speaker: String,
    /// What was said.
    pub text: String,
}

/// Action-specific payload. Empty for every action except `submit_memory`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPayload {
    /// `"speaker: text"` lines of the exchange being committed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_exchange: Option<String>,
    /// Scene narration to store alongside the exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_context_for_memory: Option<String>,
}

impl ActionPayload {
    /// Payload for a memory commit.
    #[must_use]
    pub fn memory(dialogue_exchange: String, scene_context: String) -> Self {
        Self {
            dialogue_exchange: Some(dialogue_exchange),
            scene_context_for_memory: Some(scene_context),
        }
    }
}

/// Request for a character to react to the latest event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRequest {
    /// The reacting character.
    pub character_id: CharacterId,
    /// Its display name.
    pub character_name: String,
    /// Full accumulated scene narration.
    pub scene_narration: String,
    /// What the character is reacting to right now.
    pub latest_event: String,
    /// Bounded tail of the character's track, oldest first.
    pub history: Vec<HistoryLine>,
    /// Names of player characters present in the scene.
    pub present_player_characters: Vec<String>,
}

/// Request to perform a moderator action for a character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// The character the action targets.
    pub character_id: CharacterId,
    /// Which action.
    pub action: ActionKind,
    /// Action-specific payload.
    pub payload: ActionPayload,
    /// Full accumulated scene narration.
    pub scene_narration: String,
    /// Bounded tail of the character's track, oldest first.
    pub history: Vec<HistoryLine>,
}

/// A generated line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionReply {
    /// The raw generated line.
    pub line: String,
}

/// Acknowledgement of a moderator action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReply {
    /// Human-readable summary. May be blank.
    pub message: String,
    /// Topics or candidate lines, for actions that surface them.
    pub options: Option<Vec<String>>,
}

/// Failure reported by a generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The request never produced a response.
    #[error("network failure: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("service error (status {status}): {message}")]
    Service {
        /// HTTP-style status code.
        status: u16,
        /// Error detail reported by the service.
        message: String,
    },
}

/// The external text-generation service.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Asks a character to react to the latest event.
    async fn generate_reaction(
        &self,
        request: &ReactionRequest,
    ) -> Result<ReactionReply, GenerationError>;

    /// Performs a moderator action for a character.
    async fn perform_action(&self, request: &ActionRequest) -> Result<ActionReply, GenerationError>;
}
