//! Banter: HTTP collaborators.
//!
//! [`HttpGenerationService`] talks to the dialogue generation service and
//! [`HttpCharacterRoster`] reads the character roster. Both speak the JSON
//! routes of the companion game server under `/api`.

mod generation;
mod roster;
mod wire;

pub use generation::HttpGenerationService;
pub use roster::HttpCharacterRoster;

/// Route producing a single character line.
pub const REACTION_PATH: &str = "/api/dialogue/generate_npc_line";

/// Route performing a moderator action.
pub const ACTION_PATH: &str = "/api/dialogue/npc_action";

/// Route listing the roster.
pub const ROSTER_PATH: &str = "/api/npcs";

/// Joins `base_url` and `path` without doubling the slash.
fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}
