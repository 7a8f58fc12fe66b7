//! # SkillForge Common Library
//!
//! Shared code for the SkillForge services including:
//! - Database initialization and row models
//! - Room event types (RoomEvent enum)
//! - Learner identity types
//! - Configuration loading
//! - Common error taxonomy

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod types;

pub use error::{Error, Result};
pub use types::Role;
