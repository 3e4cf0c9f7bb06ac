//! Fake character rosters.

use async_trait::async_trait;
use banter_core::character::{Character, CharacterRoster};
use banter_core::error::DomainError;

/// A roster that always lists the same characters.
#[derive(Debug, Clone, Default)]
pub struct StaticCharacterRoster {
    characters: Vec<Character>,
}

impl StaticCharacterRoster {
    /// Create a roster listing `characters`.
    #[must_use]
    pub fn new(characters: Vec<Character>) -> Self {
        Self { characters }
    }
}

#[async_trait]
impl CharacterRoster for StaticCharacterRoster {
    async fn list_characters(&self) -> Result<Vec<Character>, DomainError> {
        Ok(self.characters.clone())
    }
}

/// A roster that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingCharacterRoster;

#[async_trait]
impl CharacterRoster for FailingCharacterRoster {
    async fn list_characters(&self) -> Result<Vec<Character>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
