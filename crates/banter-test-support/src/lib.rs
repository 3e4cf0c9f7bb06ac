//! Shared test fakes and utilities for the Banter scene dialogue orchestrator.

mod clock;
mod generation;
mod roster;

pub use clock::FixedClock;
pub use generation::{
    FailingGenerationService, GatedGenerationService, RecordedCall, ScriptedGenerationService,
};
pub use roster::{FailingCharacterRoster, StaticCharacterRoster};
