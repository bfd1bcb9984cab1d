//! Runtime layer for the post archive.
//!
//! Runs channel-event ingestion as a background task and serves export
//! commands on behalf of the chat front end.

pub mod commands;
pub mod ingestor;
pub mod peers;

pub use archive_core as core;
pub use archive_data as data;
