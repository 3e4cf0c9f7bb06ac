//! In-memory registry of running scenes.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use banter_core::error::DomainError;
use uuid::Uuid;

use crate::domain::session::SceneSession;

/// Running scenes by identifier. Scenes live only as long as the process.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    scenes: RwLock<HashMap<Uuid, Arc<SceneSession>>>,
}

impl SceneRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a started scene.
    pub fn insert(&self, session: Arc<SceneSession>) {
        self.scenes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id(), session);
    }

    /// Looks up a running scene.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SceneNotFound` if no scene has that identifier.
    pub fn get(&self, scene_id: Uuid) -> Result<Arc<SceneSession>, DomainError> {
        self.scenes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scene_id)
            .cloned()
            .ok_or(DomainError::SceneNotFound(scene_id))
    }

    /// Removes a scene.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SceneNotFound` if no scene has that identifier.
    pub fn remove(&self, scene_id: Uuid) -> Result<Arc<SceneSession>, DomainError> {
        self.scenes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&scene_id)
            .ok_or(DomainError::SceneNotFound(scene_id))
    }

    /// Number of running scenes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no scene is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
