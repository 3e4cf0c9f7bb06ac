//! Commands for the Scene context.

use banter_core::character::CharacterId;
use banter_core::command::Command;
use banter_core::generation::ActionKind;
use uuid::Uuid;

/// Command to start a scene.
#[derive(Debug, Clone)]
pub struct StartScene {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Opening narration.
    pub narration: String,
    /// Selected roster characters. NPCs become participants, PCs are
    /// recorded as present.
    pub character_ids: Vec<CharacterId>,
}

impl Command for StartScene {
    fn command_type(&self) -> &'static str {
        "scene.start_scene"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to add narration to a running scene.
#[derive(Debug, Clone)]
pub struct UpdateNarration {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The scene to update.
    pub scene_id: Uuid,
    /// The new narration.
    pub text: String,
}

impl Command for UpdateNarration {
    fn command_type(&self) -> &'static str {
        "scene.update_narration"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to trigger a moderator action for one character.
#[derive(Debug, Clone)]
pub struct TriggerAction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The scene the character is in.
    pub scene_id: Uuid,
    /// The target character.
    pub character_id: CharacterId,
    /// Which action.
    pub action: ActionKind,
}

impl Command for TriggerAction {
    fn command_type(&self) -> &'static str {
        "scene.trigger_action"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to pick one of the options last offered for a character.
#[derive(Debug, Clone)]
pub struct SelectOption {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The scene the character is in.
    pub scene_id: Uuid,
    /// The character the options were offered for.
    pub character_id: CharacterId,
    /// Zero-based index into the offered options.
    pub option_index: usize,
}

impl Command for SelectOption {
    fn command_type(&self) -> &'static str {
        "scene.select_option"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to address a line to a single character.
#[derive(Debug, Clone)]
pub struct AddressCharacter {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The scene the character is in.
    pub scene_id: Uuid,
    /// The addressed character.
    pub character_id: CharacterId,
    /// Who speaks. Defaults to the moderator.
    pub speaker: Option<String>,
    /// The line.
    pub text: String,
}

impl Command for AddressCharacter {
    fn command_type(&self) -> &'static str {
        "scene.address_character"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to end a scene and discard its state.
#[derive(Debug, Clone)]
pub struct EndScene {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The scene to end.
    pub scene_id: Uuid,
}

impl Command for EndScene {
    fn command_type(&self) -> &'static str {
        "scene.end_scene"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
