//! Banter: Scene bounded context.
//!
//! Responsible for running a multi-character dialogue scene: the shared scene
//! context, one conversation track and action dispatcher per participating
//! character, the fan-out of narration to every participant, and the
//! moderator-triggered actions.

pub mod application;
pub mod domain;
