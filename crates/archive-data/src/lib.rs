//! Storage and export layer for the post archive.
//!
//! Owns the append-only post table, month/year selection over its rows and
//! generation of standalone export files.

pub mod exporter;
pub mod filter;
pub mod store;

pub use archive_core as core;
