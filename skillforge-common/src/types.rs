//! Shared learner and discussion types
//!
//! Wire-facing types used by both the server and the room client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the caller's learner UUID, set by the fronting auth layer
pub const LEARNER_ID_HEADER: &str = "x-learner-id";
/// Header carrying the caller's role (`STUDENT` or `ADMIN`)
pub const LEARNER_ROLE_HEADER: &str = "x-learner-role";

/// Learner role, as asserted by the external identity provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Admin => "ADMIN",
        }
    }

    /// Parse the role header value; unknown strings are rejected
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "STUDENT" => Some(Role::Student),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Author summary embedded in discussion messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageAuthor {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
}

/// A persisted discussion message as served by the durable store
/// and carried inside room broadcast events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscussionMessage {
    pub id: Uuid,
    pub program_id: Uuid,
    pub author: MessageAuthor,
    pub message: String,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
}

/// Acknowledgement returned by the like endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LikeReceipt {
    pub id: Uuid,
    pub likes: i64,
}
