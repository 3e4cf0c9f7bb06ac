//! Conversation entries.

use banter_core::generation::HistoryLine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker recorded on system entries.
pub const SYSTEM_SPEAKER: &str = "SYSTEM";

/// Speaker recorded on moderator choices and narration.
pub const MODERATOR_SPEAKER: &str = "Moderator";

/// Speaker recorded on moderator action notes.
pub const ACTION_NOTE_SPEAKER: &str = "Moderator Action";

/// What an entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A line the moderator (or a present PC) addressed to the character.
    Narration,
    /// A line spoken by the character.
    CharacterLine,
    /// A suggested topic or line the moderator picked.
    ModeratorChoice,
    /// Record that the moderator triggered an action.
    ModeratorActionNote,
    /// Informational system note.
    SystemInfo,
    /// An action completed successfully.
    SystemSuccess,
    /// Something failed for this character.
    SystemError,
}

impl EntryKind {
    /// Administrative entries are bookkeeping, not dialogue. They are
    /// skipped when selecting an exchange for memory.
    #[must_use]
    pub const fn is_administrative(self) -> bool {
        matches!(
            self,
            Self::ModeratorActionNote | Self::SystemInfo | Self::SystemSuccess | Self::SystemError
        )
    }
}

/// An entry that has not been appended to a track yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Who said it.
    pub speaker: String,
    /// What was said.
    pub text: String,
    /// What kind of entry this is.
    pub kind: EntryKind,
}

impl NewEntry {
    /// Creates an entry draft.
    #[must_use]
    pub fn new(speaker: impl Into<String>, text: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            kind,
        }
    }

    /// A line addressed to the character.
    #[must_use]
    pub fn narration(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(speaker, text, EntryKind::Narration)
    }

    /// A line spoken by the character.
    #[must_use]
    pub fn character_line(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(speaker, text, EntryKind::CharacterLine)
    }

    /// The moderator picked a suggested option.
    #[must_use]
    pub fn moderator_choice(option: &str) -> Self {
        Self::new(
            MODERATOR_SPEAKER,
            format!("Selected: \"{option}\""),
            EntryKind::ModeratorChoice,
        )
    }

    /// The moderator triggered an action.
    #[must_use]
    pub fn action_note(text: impl Into<String>) -> Self {
        Self::new(ACTION_NOTE_SPEAKER, text, EntryKind::ModeratorActionNote)
    }

    /// System information.
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(SYSTEM_SPEAKER, text, EntryKind::SystemInfo)
    }

    /// System success note.
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self::new(SYSTEM_SPEAKER, text, EntryKind::SystemSuccess)
    }

    /// System error note.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(SYSTEM_SPEAKER, text, EntryKind::SystemError)
    }
}

/// An appended, immutable conversation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationEntry {
    speaker: String,
    text: String,
    kind: EntryKind,
    sequence: u64,
    recorded_at: DateTime<Utc>,
}

impl ConversationEntry {
    pub(crate) fn from_draft(draft: NewEntry, sequence: u64, recorded_at: DateTime<Utc>) -> Self {
        Self {
            speaker: draft.speaker,
            text: draft.text,
            kind: draft.kind,
            sequence,
            recorded_at,
        }
    }

    /// Who said it.
    #[must_use]
    pub fn speaker(&self) -> &str {
        &self.speaker
    }

    /// What was said.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The entry kind.
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Position in the owning track. Strictly increasing, starting at 1.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// When the entry was appended.
    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// `"speaker: text"`.
    #[must_use]
    pub fn to_exchange_line(&self) -> String {
        format!("{}: {}", self.speaker, self.text)
    }

    /// Projection handed to the generation service.
    #[must_use]
    pub fn to_history_line(&self) -> HistoryLine {
        HistoryLine {
            speaker: self.speaker.clone(),
            text: self.text.clone(),
        }
    }
}
