//! Selection of the exchange committed to a character's memory.

use super::entry::ConversationEntry;
use super::track::ConversationTrack;

/// Maximum number of entries in a committed exchange.
pub const MAX_EXCHANGE_ENTRIES: usize = 2;

/// The most recent coherent exchange on a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    entries: Vec<ConversationEntry>,
}

impl Exchange {
    /// The selected entries, oldest first. Never empty, never more than
    /// [`MAX_EXCHANGE_ENTRIES`].
    #[must_use]
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// Sequences of the selected entries.
    #[must_use]
    pub fn sequences(&self) -> Vec<u64> {
        self.entries.iter().map(ConversationEntry::sequence).collect()
    }

    /// `"speaker: text"` lines joined by newlines.
    #[must_use]
    pub fn to_dialogue(&self) -> String {
        self.entries
            .iter()
            .map(ConversationEntry::to_exchange_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Picks the exchange to commit to memory.
///
/// The newest dialogue entry is always part of it. The dialogue entry before
/// that joins only when a different speaker said it; two lines in a row from
/// the same speaker yield just the newest. Returns `None` when the track holds
/// nothing but administrative entries.
#[must_use]
pub fn extract_exchange(track: &ConversationTrack) -> Option<Exchange> {
    let pair = track.last_significant_pair();
    let (latest, earlier) = match pair.as_slice() {
        [] => return None,
        [only] => (*only, None),
        [earlier, latest, ..] => (*latest, Some(*earlier)),
    };

    let mut entries = Vec::with_capacity(MAX_EXCHANGE_ENTRIES);
    if let Some(earlier) = earlier.filter(|e| e.speaker() != latest.speaker()) {
        entries.push(earlier.clone());
    }
    entries.push(latest.clone());
    entries.truncate(MAX_EXCHANGE_ENTRIES);

    Some(Exchange { entries })
}
