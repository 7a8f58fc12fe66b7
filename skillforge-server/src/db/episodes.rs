//! Episode catalog and per-learner completion marks

use chrono::Utc;
use skillforge_common::db::models::{Episode, EpisodeProgress};
use skillforge_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};

/// Save an episode (insert or update by id)
pub async fn save_episode(pool: &SqlitePool, episode: &Episode) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO episodes (id, program_id, title, position, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            position = excluded.position
        "#,
    )
    .bind(episode.id.to_string())
    .bind(episode.program_id.to_string())
    .bind(&episode.title)
    .bind(episode.position)
    .bind(episode.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load an episode by id
pub async fn get_episode(pool: &SqlitePool, id: Uuid) -> Result<Option<Episode>> {
    let row = sqlx::query(
        r#"
        SELECT id, program_id, title, position, created_at
        FROM episodes
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(map_episode(&row)?)),
        None => Ok(None),
    }
}

/// List a program's episodes in display order
pub async fn list_episodes(pool: &SqlitePool, program_id: Uuid) -> Result<Vec<Episode>> {
    let rows = sqlx::query(
        r#"
        SELECT id, program_id, title, position, created_at
        FROM episodes
        WHERE program_id = ?
        ORDER BY position, created_at
        "#,
    )
    .bind(program_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_episode).collect()
}

fn map_episode(row: &sqlx::sqlite::SqliteRow) -> Result<Episode> {
    let id_str: String = row.get("id");
    let program_str: String = row.get("program_id");
    let created_str: String = row.get("created_at");
    Ok(Episode {
        id: parse_uuid("episode", &id_str)?,
        program_id: parse_uuid("episode.program_id", &program_str)?,
        title: row.get("title"),
        position: row.get("position"),
        created_at: parse_timestamp("episode.created_at", &created_str)?,
    })
}

/// Record a learner's completion mark for an episode
///
/// Idempotent: re-marking updates the existing row in place, so the
/// (learner, episode) pair never produces duplicate rows.
pub async fn mark_episode_complete(
    pool: &SqlitePool,
    learner_id: Uuid,
    episode_id: Uuid,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO episode_progress (id, learner_id, episode_id, completed, created_at)
        VALUES (?, ?, ?, 1, ?)
        ON CONFLICT(learner_id, episode_id) DO UPDATE SET
            completed = 1
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(learner_id.to_string())
    .bind(episode_id.to_string())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a learner's completion mark for one episode
pub async fn get_episode_progress(
    pool: &SqlitePool,
    learner_id: Uuid,
    episode_id: Uuid,
) -> Result<Option<EpisodeProgress>> {
    let row = sqlx::query(
        r#"
        SELECT id, learner_id, episode_id, completed, created_at
        FROM episode_progress
        WHERE learner_id = ? AND episode_id = ?
        "#,
    )
    .bind(learner_id.to_string())
    .bind(episode_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let id_str: String = row.get("id");
            let learner_str: String = row.get("learner_id");
            let episode_str: String = row.get("episode_id");
            let completed: i64 = row.get("completed");
            let created_str: String = row.get("created_at");
            Ok(Some(EpisodeProgress {
                id: parse_uuid("episode_progress", &id_str)?,
                learner_id: parse_uuid("episode_progress.learner_id", &learner_str)?,
                episode_id: parse_uuid("episode_progress.episode_id", &episode_str)?,
                completed: completed != 0,
                created_at: parse_timestamp("episode_progress.created_at", &created_str)?,
            }))
        }
        None => Ok(None),
    }
}
