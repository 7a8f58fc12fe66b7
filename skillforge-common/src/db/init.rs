//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up
//! idempotently. Every create function is safe to call repeatedly.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL allows concurrent readers with one writer; progress recomputes
    // and discussion posts land from parallel sessions
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_all_tables(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent, also used by tests
/// against in-memory databases)
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_learners_table(pool).await?;
    create_programs_table(pool).await?;
    create_episodes_table(pool).await?;
    create_episode_progress_table(pool).await?;
    create_quizzes_table(pool).await?;
    create_questions_table(pool).await?;
    create_quiz_results_table(pool).await?;
    create_enrollments_table(pool).await?;
    create_discussion_messages_table(pool).await?;
    Ok(())
}

/// Create the learners table
///
/// Identity (id, role) is asserted by the external identity provider;
/// this table carries the profile and the XP account.
pub async fn create_learners_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS learners (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'STUDENT',
            avatar TEXT,
            xp_points INTEGER NOT NULL DEFAULT 0,
            level INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the programs table
pub async fn create_programs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS programs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            reward_points INTEGER NOT NULL DEFAULT 100,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the episodes table
pub async fn create_episodes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS episodes (
            id TEXT PRIMARY KEY,
            program_id TEXT NOT NULL REFERENCES programs(id),
            title TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_episodes_program_id ON episodes(program_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the episode_progress table
///
/// One row per (learner, episode); marking an episode complete a second
/// time updates the existing row instead of inserting a duplicate.
pub async fn create_episode_progress_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS episode_progress (
            id TEXT PRIMARY KEY,
            learner_id TEXT NOT NULL REFERENCES learners(id),
            episode_id TEXT NOT NULL REFERENCES episodes(id),
            completed INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(learner_id, episode_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_episode_progress_learner_id ON episode_progress(learner_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the quizzes table
pub async fn create_quizzes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quizzes (
            id TEXT PRIMARY KEY,
            program_id TEXT NOT NULL REFERENCES programs(id),
            title TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_quizzes_program_id ON quizzes(program_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the questions table
///
/// `options` is a JSON array of option strings; `answer` is the index of
/// the correct option and never leaves the grading path.
pub async fn create_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            quiz_id TEXT NOT NULL REFERENCES quizzes(id),
            text TEXT NOT NULL,
            options TEXT NOT NULL,
            answer INTEGER NOT NULL,
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_questions_quiz_id ON questions(quiz_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the quiz_results table (append-only attempt history)
pub async fn create_quiz_results_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quiz_results (
            id TEXT PRIMARY KEY,
            learner_id TEXT NOT NULL REFERENCES learners(id),
            quiz_id TEXT NOT NULL REFERENCES quizzes(id),
            score INTEGER NOT NULL,
            total INTEGER NOT NULL,
            passed INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_quiz_results_learner_quiz ON quiz_results(learner_id, quiz_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the enrollments table
pub async fn create_enrollments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrollments (
            id TEXT PRIMARY KEY,
            learner_id TEXT NOT NULL REFERENCES learners(id),
            program_id TEXT NOT NULL REFERENCES programs(id),
            progress INTEGER NOT NULL DEFAULT 0,
            completed INTEGER NOT NULL DEFAULT 0,
            xp_claimed INTEGER NOT NULL DEFAULT 0,
            enrolled_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            completed_at TIMESTAMP,
            UNIQUE(learner_id, program_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_enrollments_learner_id ON enrollments(learner_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the discussion_messages table
pub async fn create_discussion_messages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS discussion_messages (
            id TEXT PRIMARY KEY,
            program_id TEXT NOT NULL REFERENCES programs(id),
            learner_id TEXT NOT NULL REFERENCES learners(id),
            message TEXT NOT NULL,
            likes INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_discussion_messages_program_created ON discussion_messages(program_id, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
