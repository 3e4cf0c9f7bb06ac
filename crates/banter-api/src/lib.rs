//! Banter: HTTP API for the moderator UI.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
