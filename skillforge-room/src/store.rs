//! Durable store seam
//!
//! The discussion endpoints of the core service, behind a trait so the
//! client's commit-then-echo flows can be tested against an in-memory
//! fake. Every mutation commits here before any broadcast mentions it.

use skillforge_common::types::{DiscussionMessage, LikeReceipt};
use skillforge_common::Result;
use uuid::Uuid;

/// Discussion store the room client commits through
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    /// Fetch the room's recent history (newest window, oldest first)
    async fn list_messages(&self, program_id: Uuid) -> Result<Vec<DiscussionMessage>>;

    /// Persist a message and return the authoritative stored record
    async fn post_message(&self, program_id: Uuid, message: &str) -> Result<DiscussionMessage>;

    /// Add one like and return the authoritative counter
    async fn like_message(&self, message_id: Uuid) -> Result<LikeReceipt>;
}
