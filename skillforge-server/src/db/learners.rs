//! Learner profile persistence

use skillforge_common::db::models::Learner;
use skillforge_common::types::Role;
use skillforge_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};

/// Save a learner profile (insert or update by id)
pub async fn save_learner(pool: &SqlitePool, learner: &Learner) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO learners (id, name, email, role, avatar, xp_points, level, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            email = excluded.email,
            role = excluded.role,
            avatar = excluded.avatar
        "#,
    )
    .bind(learner.id.to_string())
    .bind(&learner.name)
    .bind(&learner.email)
    .bind(learner.role.as_str())
    .bind(&learner.avatar)
    .bind(learner.xp_points)
    .bind(learner.level)
    .bind(learner.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a learner by id
pub async fn get_learner(pool: &SqlitePool, id: Uuid) -> Result<Option<Learner>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, email, role, avatar, xp_points, level, created_at
        FROM learners
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let id_str: String = row.get("id");
            let role_str: String = row.get("role");
            let created_str: String = row.get("created_at");

            Ok(Some(Learner {
                id: parse_uuid("learner", &id_str)?,
                name: row.get("name"),
                email: row.get("email"),
                role: Role::parse(&role_str)
                    .ok_or_else(|| Error::Internal(format!("unknown role: {}", role_str)))?,
                avatar: row.get("avatar"),
                xp_points: row.get("xp_points"),
                level: row.get("level"),
                created_at: parse_timestamp("learner.created_at", &created_str)?,
            }))
        }
        None => Ok(None),
    }
}
