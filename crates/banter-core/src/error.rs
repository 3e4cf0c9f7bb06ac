//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::character::CharacterId;

/// Top-level domain error type.
///
/// These are the failures a caller of the orchestrator sees directly.
/// Failures of an individual character's dispatch are never reported through
/// this type; they are recorded on that character's conversation track.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No running scene has this identifier.
    #[error("scene not found: {0}")]
    SceneNotFound(Uuid),

    /// The character does not participate in the scene.
    #[error("character {character_id} is not part of scene {scene_id}")]
    CharacterNotInScene {
        /// The scene that was addressed.
        scene_id: Uuid,
        /// The character that was addressed.
        character_id: CharacterId,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/collaborator error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
