//! Domain model for the Scene context.

pub mod commands;
pub mod context;
pub mod dispatcher;
pub mod outcome;
pub mod session;
