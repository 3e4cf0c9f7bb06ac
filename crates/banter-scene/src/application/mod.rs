//! Application services for the Scene context.

pub mod command_handlers;
pub mod query_handlers;
pub mod registry;
