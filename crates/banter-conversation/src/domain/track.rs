//! The per-character conversation track.

use banter_core::character::CharacterId;
use banter_core::clock::Clock;
use banter_core::generation::HistoryLine;
use serde::Serialize;

use super::entry::{ConversationEntry, NewEntry};

/// Number of trailing entries sent to the generation service by default.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Marks an exchange that was committed to the character's external memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryCommit {
    /// Sequences of the committed entries, oldest first.
    pub sequences: Vec<u64>,
}

/// Append-only dialogue log owned by one character within one scene.
///
/// Entries are never removed or reordered. Undoing a memory commit pops the
/// most recent [`MemoryCommit`] marker and leaves the entries in place.
#[derive(Debug, Clone)]
pub struct ConversationTrack {
    character_id: CharacterId,
    entries: Vec<ConversationEntry>,
    memory_commits: Vec<MemoryCommit>,
}

impl ConversationTrack {
    /// Creates an empty track for a character.
    #[must_use]
    pub fn new(character_id: CharacterId) -> Self {
        Self {
            character_id,
            entries: Vec::new(),
            memory_commits: Vec::new(),
        }
    }

    /// The owning character.
    #[must_use]
    pub fn character_id(&self) -> &CharacterId {
        &self.character_id
    }

    /// Appends an entry with the next sequence number and returns that number.
    pub fn append(&mut self, draft: NewEntry, clock: &dyn Clock) -> u64 {
        let sequence = self.entries.last().map_or(1, |last| last.sequence() + 1);
        self.entries
            .push(ConversationEntry::from_draft(draft, sequence, clock.now()));
        sequence
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The newest entry, if any.
    #[must_use]
    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    /// The last `n` entries in original order. The iterator is lazy and can be
    /// cloned to restart it.
    pub fn window(&self, n: usize) -> std::slice::Iter<'_, ConversationEntry> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..].iter()
    }

    /// The window projected into the shape the generation service expects.
    #[must_use]
    pub fn history(&self, n: usize) -> Vec<HistoryLine> {
        self.window(n).map(ConversationEntry::to_history_line).collect()
    }

    /// The two most recent non-administrative entries, oldest first. Returns
    /// fewer when the track does not contain that many.
    #[must_use]
    pub fn last_significant_pair(&self) -> Vec<&ConversationEntry> {
        let mut pair: Vec<&ConversationEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|entry| !entry.kind().is_administrative())
            .take(2)
            .collect();
        pair.reverse();
        pair
    }

    /// Records that the entries with these sequences were committed to memory.
    pub fn mark_committed(&mut self, sequences: Vec<u64>) {
        self.memory_commits.push(MemoryCommit { sequences });
    }

    /// Drops the most recent commit marker, returning it.
    pub fn revert_last_commit(&mut self) -> Option<MemoryCommit> {
        self.memory_commits.pop()
    }

    /// Commit markers, oldest first.
    #[must_use]
    pub fn memory_commits(&self) -> &[MemoryCommit] {
        &self.memory_commits
    }
}
