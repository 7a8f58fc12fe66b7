//! Database access for the core service
//!
//! One module per table family, raw SQL with explicit binds. UUIDs are
//! stored as TEXT, timestamps as RFC3339 TEXT.

pub mod discussion;
pub mod enrollments;
pub mod episodes;
pub mod learners;
pub mod programs;
pub mod quizzes;

use chrono::{DateTime, Utc};
use skillforge_common::{Error, Result};
use uuid::Uuid;

/// Parse a TEXT uuid column; a failure means the row is corrupt
pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("corrupt {} uuid: {}", field, e)))
}

/// Parse an RFC3339 TEXT timestamp column
pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("corrupt {} timestamp: {}", field, e)))
}
