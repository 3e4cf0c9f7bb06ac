//! JSON bodies exchanged with the game server.

use banter_core::character::{Character, CharacterId, CharacterRole};
use banter_core::generation::{
    ActionKind, ActionPayload, ActionReply, ActionRequest, HistoryLine, ReactionRequest,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct GenerateLineBody<'a> {
    npc_id: &'a CharacterId,
    npc_name: &'a str,
    scene_context: &'a str,
    latest_event: &'a str,
    history: &'a [HistoryLine],
    present_pcs: &'a [String],
}

impl<'a> From<&'a ReactionRequest> for GenerateLineBody<'a> {
    fn from(request: &'a ReactionRequest) -> Self {
        Self {
            npc_id: &request.character_id,
            npc_name: &request.character_name,
            scene_context: &request.scene_narration,
            latest_event: &request.latest_event,
            history: &request.history,
            present_pcs: &request.present_player_characters,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateLineResponse {
    #[serde(default)]
    pub dialogue_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NpcActionBody<'a> {
    npc_id: &'a CharacterId,
    action_type: ActionKind,
    payload: &'a ActionPayload,
    scene_description: &'a str,
    history: &'a [HistoryLine],
}

impl<'a> From<&'a ActionRequest> for NpcActionBody<'a> {
    fn from(request: &'a ActionRequest) -> Self {
        Self {
            npc_id: &request.character_id,
            action_type: request.action,
            payload: &request.payload,
            scene_description: &request.scene_narration,
            history: &request.history,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NpcActionData {
    #[serde(default)]
    new_topics: Option<Vec<String>>,
    #[serde(default)]
    dialogue_options: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NpcActionResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<NpcActionData>,
}

impl NpcActionResponse {
    /// Keeps the options that belong to `action`.
    pub(crate) fn into_reply(self, action: ActionKind) -> ActionReply {
        let data = self.data.unwrap_or_default();
        let options = if action.yields_topics() {
            data.new_topics
        } else if action.surfaces_options() {
            data.dialogue_options
        } else {
            None
        };
        ActionReply {
            message: self.message.unwrap_or_default(),
            options,
        }
    }
}

/// Failure body. Different routes fill different fields.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl ErrorBody {
    /// The most specific message in `raw`, or `raw` itself.
    pub(crate) fn describe(raw: &str) -> String {
        serde_json::from_str::<Self>(raw)
            .ok()
            .and_then(|body| body.error.or(body.message).or(body.detail))
            .unwrap_or_else(|| raw.trim().to_owned())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RosterRecord {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    character_type: Option<String>,
}

impl From<RosterRecord> for Character {
    fn from(record: RosterRecord) -> Self {
        let role = match record.character_type.as_deref() {
            Some(kind) if kind.eq_ignore_ascii_case("pc") => CharacterRole::Pc,
            _ => CharacterRole::Npc,
        };
        Character::new(record.id, record.name, role)
    }
}
