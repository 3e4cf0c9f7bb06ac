//! Shared scene context.

use std::collections::BTreeSet;

use banter_core::character::CharacterId;
use serde::Serialize;

/// Separator placed between accumulated narration updates.
pub const NARRATION_SEPARATOR: &str = "\n\n";

/// Read-mostly state shared by every participant of a scene.
///
/// Only the moderator changes it, through the scene session, and every change
/// produces a new value. Dispatches hold on to the value that was current when
/// they were issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SceneContext {
    narration_text: String,
    active_character_ids: BTreeSet<CharacterId>,
    present_player_character_names: BTreeSet<String>,
}

impl SceneContext {
    /// Creates the context a scene starts with.
    #[must_use]
    pub fn new(
        narration_text: impl Into<String>,
        active_character_ids: impl IntoIterator<Item = CharacterId>,
        present_player_character_names: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            narration_text: narration_text.into(),
            active_character_ids: active_character_ids.into_iter().collect(),
            present_player_character_names: present_player_character_names.into_iter().collect(),
        }
    }

    /// All narration so far.
    #[must_use]
    pub fn narration_text(&self) -> &str {
        &self.narration_text
    }

    /// Characters taking part in the scene.
    #[must_use]
    pub fn active_character_ids(&self) -> &BTreeSet<CharacterId> {
        &self.active_character_ids
    }

    /// Names of player characters present in the scene.
    #[must_use]
    pub fn present_player_character_names(&self) -> &BTreeSet<String> {
        &self.present_player_character_names
    }

    /// Returns a copy with `delta` appended to the narration.
    #[must_use]
    pub fn with_narration_appended(&self, delta: &str) -> Self {
        let narration_text = if self.narration_text.is_empty() {
            delta.to_owned()
        } else {
            format!("{}{NARRATION_SEPARATOR}{delta}", self.narration_text)
        };
        Self {
            narration_text,
            ..self.clone()
        }
    }
}
