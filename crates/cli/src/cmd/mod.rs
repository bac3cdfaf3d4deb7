//! CLI command implementations

pub mod config;
pub mod edit;
pub mod list;
pub mod new;
pub mod show;
