//! Program catalog persistence

use skillforge_common::db::models::Program;
use skillforge_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};

/// Save a program (insert or update by id)
pub async fn save_program(pool: &SqlitePool, program: &Program) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO programs (id, title, reward_points, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            reward_points = excluded.reward_points
        "#,
    )
    .bind(program.id.to_string())
    .bind(&program.title)
    .bind(program.reward_points)
    .bind(program.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a program by id
pub async fn get_program(pool: &SqlitePool, id: Uuid) -> Result<Option<Program>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, reward_points, created_at
        FROM programs
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let id_str: String = row.get("id");
            let created_str: String = row.get("created_at");
            Ok(Some(Program {
                id: parse_uuid("program", &id_str)?,
                title: row.get("title"),
                reward_points: row.get("reward_points"),
                created_at: parse_timestamp("program.created_at", &created_str)?,
            }))
        }
        None => Ok(None),
    }
}

/// Whether a program exists
pub async fn program_exists(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM programs WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}
