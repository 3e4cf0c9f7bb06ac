//! Query handlers for the Scene context.
//!
//! Views are snapshots; tracks keep changing while reactions are in flight.

use banter_conversation::domain::entry::ConversationEntry;
use banter_core::character::Character;
use banter_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use crate::application::registry::SceneRegistry;
use crate::domain::context::SceneContext;
use crate::domain::outcome::DispatchSource;

/// Read-only view of one participant.
#[derive(Debug, Serialize)]
pub struct ParticipantView {
    /// The character.
    pub character: Character,
    /// The conversation track, oldest entry first.
    pub entries: Vec<ConversationEntry>,
    /// Options waiting for the moderator.
    pub offered_options: Vec<String>,
    /// Sources with a request in flight.
    pub in_flight: Vec<DispatchSource>,
    /// Exchanges committed to memory and not undone.
    pub memory_commits: usize,
}

/// Read-only view of a running scene.
#[derive(Debug, Serialize)]
pub struct SceneView {
    /// The scene identifier.
    pub scene_id: Uuid,
    /// The shared context.
    pub context: SceneContext,
    /// Player characters present.
    pub player_characters: Vec<Character>,
    /// Participants in cast order.
    pub participants: Vec<ParticipantView>,
}

/// Retrieves a running scene.
///
/// # Errors
///
/// Returns `DomainError::SceneNotFound` if no scene has that identifier.
pub fn get_scene_by_id(scene_id: Uuid, registry: &SceneRegistry) -> Result<SceneView, DomainError> {
    let session = registry.get(scene_id)?;
    let participants = session
        .participants()
        .filter_map(|character| {
            let track = session.track_snapshot(&character.id)?;
            let dispatcher = session.dispatcher(&character.id)?;
            Some(ParticipantView {
                character: character.clone(),
                entries: track.entries().to_vec(),
                offered_options: dispatcher.offered_options(),
                in_flight: dispatcher.in_flight(),
                memory_commits: track.memory_commits().len(),
            })
        })
        .collect();

    Ok(SceneView {
        scene_id,
        context: (*session.context()).clone(),
        player_characters: session.player_characters().to_vec(),
        participants,
    })
}
