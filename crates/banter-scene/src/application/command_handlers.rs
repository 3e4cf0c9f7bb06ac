//! Command handlers for the Scene context.
//!
//! Each handler resolves the scene from the registry, runs the command against
//! it and hands back what the domain produced. Failures of a single
//! character's dispatch are not errors here; they come back inside the
//! returned outcome and are recorded on that character's track.

use banter_core::character::{CharacterId, CharacterRoster};
use banter_core::command::Command;
use banter_core::error::DomainError;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::application::registry::SceneRegistry;
use crate::domain::commands::{
    AddressCharacter, EndScene, SelectOption, StartScene, TriggerAction, UpdateNarration,
};
use crate::domain::outcome::{ActionResult, ReactionOutcome};
use crate::domain::session::{ReactionBatch, SceneCast, SceneServices, SceneSession};

/// Result of a successfully started scene.
#[derive(Debug)]
pub struct SceneStarted {
    /// The new scene identifier.
    pub scene_id: Uuid,
    /// Characters with a conversation track, in cast order.
    pub participants: Vec<CharacterId>,
    /// The opening reactions, still running.
    pub reactions: ReactionBatch,
}

/// Handles the `StartScene` command: resolves the cast from the roster,
/// starts the scene and registers it.
///
/// This is a CREATION command: the handler generates the `scene_id`.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the roster cannot be loaded and
/// `DomainError::Validation` for an unknown character, blank narration or a
/// cast without NPCs.
#[instrument(skip_all, fields(command_type = command.command_type(), correlation_id = %command.correlation_id()))]
pub async fn handle_start_scene(
    command: &StartScene,
    roster: &dyn CharacterRoster,
    services: &SceneServices,
    registry: &SceneRegistry,
) -> Result<SceneStarted, DomainError> {
    let characters = roster.list_characters().await?;
    let cast = SceneCast::select(characters, &command.character_ids)?;

    let scene_id = Uuid::now_v7();
    let (session, reactions) = SceneSession::start(scene_id, &command.narration, cast, services)?;
    let participants = session.participants().map(|npc| npc.id.clone()).collect();
    registry.insert(session);

    info!(%scene_id, "scene registered");
    Ok(SceneStarted {
        scene_id,
        participants,
        reactions,
    })
}

/// Handles the `UpdateNarration` command.
///
/// # Errors
///
/// Returns `DomainError::SceneNotFound` for an unknown scene and
/// `DomainError::Validation` for blank narration.
#[instrument(skip_all, fields(command_type = command.command_type(), scene_id = %command.scene_id))]
pub fn handle_update_narration(
    command: &UpdateNarration,
    registry: &SceneRegistry,
) -> Result<ReactionBatch, DomainError> {
    let session = registry.get(command.scene_id)?;
    session.submit_narration_update(&command.text)
}

/// Handles the `TriggerAction` command.
///
/// # Errors
///
/// Returns `DomainError::SceneNotFound` or `DomainError::CharacterNotInScene`.
#[instrument(skip_all, fields(command_type = command.command_type(), scene_id = %command.scene_id))]
pub async fn handle_trigger_action(
    command: &TriggerAction,
    registry: &SceneRegistry,
) -> Result<ActionResult, DomainError> {
    let session = registry.get(command.scene_id)?;
    session
        .trigger_action(&command.character_id, command.action)
        .await
}

/// Handles the `SelectOption` command.
///
/// # Errors
///
/// Returns `DomainError::SceneNotFound`, `DomainError::CharacterNotInScene`,
/// or `DomainError::Validation` if the option was not offered.
#[instrument(skip_all, fields(command_type = command.command_type(), scene_id = %command.scene_id))]
pub async fn handle_select_option(
    command: &SelectOption,
    registry: &SceneRegistry,
) -> Result<ReactionOutcome, DomainError> {
    let session = registry.get(command.scene_id)?;
    session
        .select_option(&command.character_id, command.option_index)
        .await
}

/// Handles the `AddressCharacter` command.
///
/// # Errors
///
/// Returns `DomainError::SceneNotFound`, `DomainError::CharacterNotInScene`,
/// or `DomainError::Validation` for a blank line.
#[instrument(skip_all, fields(command_type = command.command_type(), scene_id = %command.scene_id))]
pub async fn handle_address_character(
    command: &AddressCharacter,
    registry: &SceneRegistry,
) -> Result<ReactionOutcome, DomainError> {
    let session = registry.get(command.scene_id)?;
    session
        .address_character(
            &command.character_id,
            command.speaker.as_deref(),
            &command.text,
        )
        .await
}

/// Handles the `EndScene` command. Reactions still running finish against the
/// discarded scene.
///
/// # Errors
///
/// Returns `DomainError::SceneNotFound` for an unknown scene.
#[instrument(skip_all, fields(command_type = command.command_type(), scene_id = %command.scene_id))]
pub fn handle_end_scene(command: &EndScene, registry: &SceneRegistry) -> Result<(), DomainError> {
    registry.remove(command.scene_id)?;
    info!("scene ended");
    Ok(())
}
