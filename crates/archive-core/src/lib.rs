//! Shared domain types for the post archive.
//!
//! Records and channel events, the canonical date normalizer, timezone
//! handling, the error type and command-line settings.

pub mod error;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{ArchiveError, Result};
