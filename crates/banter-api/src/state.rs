//! Shared application state.

use std::fmt;
use std::sync::Arc;

use banter_core::character::CharacterRoster;
use banter_core::clock::Clock;
use banter_core::generation::GenerationService;
use banter_scene::application::registry::SceneRegistry;
use banter_scene::domain::session::{SceneConfig, SceneServices};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Running scenes.
    pub registry: Arc<SceneRegistry>,
    /// Source of the character records.
    pub roster: Arc<dyn CharacterRoster>,
    /// Collaborators handed to every scene.
    pub services: SceneServices,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state with an empty scene registry.
    #[must_use]
    pub fn new(
        roster: Arc<dyn CharacterRoster>,
        generator: Arc<dyn GenerationService>,
        clock: Arc<dyn Clock>,
        config: SceneConfig,
    ) -> Self {
        Self {
            registry: Arc::new(SceneRegistry::new()),
            roster,
            services: SceneServices {
                generator,
                clock,
                config,
            },
        }
    }
}
