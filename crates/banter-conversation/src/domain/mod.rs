//! Domain model for the Conversation context.

pub mod entry;
pub mod exchange;
pub mod track;
