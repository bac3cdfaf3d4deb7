//! Common utilities for integration tests

pub mod cli;

pub use cli::{extract_ulid, CommandResult, DesynCommand, Sandbox};
