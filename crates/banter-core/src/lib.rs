//! Banter core: shared domain abstractions.
//!
//! This crate defines the types and collaborator contracts that the
//! conversation and scene contexts depend on. It contains no infrastructure
//! code: the generation service and character roster are traits here and
//! implemented elsewhere.

pub mod character;
pub mod clock;
pub mod command;
pub mod error;
pub mod generation;
