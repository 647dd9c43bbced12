//! # botlog-core
//!
//! Core types and primitives for the BotLog publishing engine.
//! This crate contains foundational types shared across all BotLog crates:
//! configuration, content hashing, and error types.

pub mod config;
pub mod error;
pub mod hash;

pub use config::*;

pub use error::{BotlogError, BotlogResult};
pub use hash::{hash_bytes, hash_text, ContentHash};
