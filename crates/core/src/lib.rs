//! Core types for Desyn
//!
//! This crate provides:
//! - The animation project model that the editor persists
//! - BLAKE3 content hashing used to detect unchanged documents

pub mod hash;
pub mod project;

pub use hash::{hash_bytes, ContentHash};
pub use project::{Frame, Project, ProjectError, Stroke, DEFAULT_FPS};
