//! Database row models

use crate::types::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A learner profile with its XP account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub xp_points: i64,
    pub level: i64,
    pub created_at: DateTime<Utc>,
}

/// A learning program (a course of episodes plus quizzes)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub title: String,
    pub reward_points: i64,
    pub created_at: DateTime<Utc>,
}

/// An episode (lesson) within a program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: Uuid,
    pub program_id: Uuid,
    pub title: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// A learner's completion mark for one episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeProgress {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub episode_id: Uuid,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// A quiz attached to a program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub program_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A quiz question with its correct answer index
///
/// Deliberately not serializable: `answer` must never reach a client
/// before grading. API surfaces build their own answer-free views.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub text: String,
    pub options: Vec<String>,
    pub answer: i64,
    pub position: i64,
}

/// One graded quiz attempt (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub quiz_id: Uuid,
    pub score: i64,
    pub total: i64,
    pub passed: bool,
    pub created_at: DateTime<Utc>,
}

/// A learner's membership in a program with its derived progress state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub program_id: Uuid,
    pub progress: i64,
    pub completed: bool,
    pub xp_claimed: bool,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
