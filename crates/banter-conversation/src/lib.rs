//! Banter: Conversation bounded context.
//!
//! Responsible for the append-only, per-character dialogue log, the bounded
//! context window sent to the generation service, and the selection of the
//! exchange that gets committed to a character's memory.

pub mod domain;
