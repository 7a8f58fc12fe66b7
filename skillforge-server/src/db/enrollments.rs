//! Enrollment persistence and lifecycle writes

use chrono::Utc;
use skillforge_common::db::models::{Enrollment, Program};
use skillforge_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};

pub(crate) fn map_enrollment(row: &sqlx::sqlite::SqliteRow) -> Result<Enrollment> {
    let id_str: String = row.get("id");
    let learner_str: String = row.get("learner_id");
    let program_str: String = row.get("program_id");
    let completed: i64 = row.get("completed");
    let xp_claimed: i64 = row.get("xp_claimed");
    let enrolled_str: String = row.get("enrolled_at");
    let completed_at_str: Option<String> = row.get("completed_at");

    Ok(Enrollment {
        id: parse_uuid("enrollment", &id_str)?,
        learner_id: parse_uuid("enrollment.learner_id", &learner_str)?,
        program_id: parse_uuid("enrollment.program_id", &program_str)?,
        progress: row.get("progress"),
        completed: completed != 0,
        xp_claimed: xp_claimed != 0,
        enrolled_at: parse_timestamp("enrollment.enrolled_at", &enrolled_str)?,
        completed_at: completed_at_str
            .map(|s| parse_timestamp("enrollment.completed_at", &s))
            .transpose()?,
    })
}

/// Enroll a learner into a program
///
/// Idempotent: enrolling twice leaves the existing membership untouched
/// and returns it unchanged.
pub async fn enroll(pool: &SqlitePool, learner_id: Uuid, program_id: Uuid) -> Result<Enrollment> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO enrollments
            (id, learner_id, program_id, progress, completed, xp_claimed, enrolled_at)
        VALUES (?, ?, ?, 0, 0, 0, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(learner_id.to_string())
    .bind(program_id.to_string())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    let row = sqlx::query(
        r#"
        SELECT id, learner_id, program_id, progress, completed, xp_claimed,
               enrolled_at, completed_at
        FROM enrollments
        WHERE learner_id = ? AND program_id = ?
        "#,
    )
    .bind(learner_id.to_string())
    .bind(program_id.to_string())
    .fetch_one(pool)
    .await?;

    map_enrollment(&row)
}

/// Load one enrollment
pub async fn get_enrollment(
    pool: &SqlitePool,
    learner_id: Uuid,
    program_id: Uuid,
) -> Result<Option<Enrollment>> {
    let row = sqlx::query(
        r#"
        SELECT id, learner_id, program_id, progress, completed, xp_claimed,
               enrolled_at, completed_at
        FROM enrollments
        WHERE learner_id = ? AND program_id = ?
        "#,
    )
    .bind(learner_id.to_string())
    .bind(program_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(map_enrollment(&row)?)),
        None => Ok(None),
    }
}

/// List a learner's enrollments with their program summaries, newest first
pub async fn list_enrollments(
    pool: &SqlitePool,
    learner_id: Uuid,
) -> Result<Vec<(Enrollment, Program)>> {
    let rows = sqlx::query(
        r#"
        SELECT e.id, e.learner_id, e.program_id, e.progress, e.completed,
               e.xp_claimed, e.enrolled_at, e.completed_at,
               p.id AS p_id, p.title AS p_title,
               p.reward_points AS p_reward_points, p.created_at AS p_created_at
        FROM enrollments e
        JOIN programs p ON p.id = e.program_id
        WHERE e.learner_id = ?
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(learner_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let enrollment = map_enrollment(row)?;
            let p_id: String = row.get("p_id");
            let p_created: String = row.get("p_created_at");
            let program = Program {
                id: parse_uuid("program", &p_id)?,
                title: row.get("p_title"),
                reward_points: row.get("p_reward_points"),
                created_at: parse_timestamp("program.created_at", &p_created)?,
            };
            Ok((enrollment, program))
        })
        .collect()
}

/// Remove an enrollment and every completion fact scoped to it
///
/// Deletes the learner's episode marks and quiz attempts for the program
/// along with the enrollment row, all in one transaction. A later
/// re-enroll starts from a clean slate. Returns whether an enrollment
/// existed.
pub async fn delete_enrollment_cascade(
    pool: &SqlitePool,
    learner_id: Uuid,
    program_id: Uuid,
) -> Result<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM episode_progress
        WHERE learner_id = ?1
          AND episode_id IN (SELECT id FROM episodes WHERE program_id = ?2)
        "#,
    )
    .bind(learner_id.to_string())
    .bind(program_id.to_string())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        DELETE FROM quiz_results
        WHERE learner_id = ?1
          AND quiz_id IN (SELECT id FROM quizzes WHERE program_id = ?2)
        "#,
    )
    .bind(learner_id.to_string())
    .bind(program_id.to_string())
    .execute(&mut *tx)
    .await?;

    let deleted = sqlx::query(
        "DELETE FROM enrollments WHERE learner_id = ? AND program_id = ?",
    )
    .bind(learner_id.to_string())
    .bind(program_id.to_string())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(deleted.rows_affected() > 0)
}

/// Administrative direct write of progress state, bypassing the ledger
///
/// `progress` is clamped to 0..=100 by the caller. The completion flag
/// stays monotonic: a manual write can set it true but a true flag is
/// never reverted, `completed_at` is stamped only on the transition,
/// and a completed row keeps progress pinned at 100.
pub async fn manual_update_enrollment(
    pool: &SqlitePool,
    learner_id: Uuid,
    program_id: Uuid,
    progress: Option<i64>,
    completed: Option<bool>,
) -> Result<Option<Enrollment>> {
    let updated = sqlx::query(
        r#"
        UPDATE enrollments SET
            progress = CASE
                WHEN MAX(completed, COALESCE(?4, completed)) = 1 THEN 100
                ELSE COALESCE(?3, progress)
            END,
            completed = MAX(completed, COALESCE(?4, completed)),
            completed_at = CASE
                WHEN completed_at IS NOT NULL THEN completed_at
                WHEN COALESCE(?4, 0) = 1 THEN ?5
                ELSE NULL
            END
        WHERE learner_id = ?1 AND program_id = ?2
        "#,
    )
    .bind(learner_id.to_string())
    .bind(program_id.to_string())
    .bind(progress)
    .bind(completed.map(|c| c as i64))
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Ok(None);
    }

    get_enrollment(pool, learner_id, program_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillforge_common::db::init::create_all_tables;
    use skillforge_common::db::models::Learner;
    use skillforge_common::types::Role;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        create_all_tables(&pool).await.unwrap();
        pool
    }

    async fn seed_pair(pool: &SqlitePool) -> (Uuid, Uuid) {
        let learner = Learner {
            id: Uuid::new_v4(),
            name: "L".to_string(),
            email: format!("{}@example.com", Uuid::new_v4()),
            role: Role::Student,
            avatar: None,
            xp_points: 0,
            level: 1,
            created_at: Utc::now(),
        };
        crate::db::learners::save_learner(pool, &learner).await.unwrap();

        let program = Program {
            id: Uuid::new_v4(),
            title: "P".to_string(),
            reward_points: 100,
            created_at: Utc::now(),
        };
        crate::db::programs::save_program(pool, &program).await.unwrap();

        (learner.id, program.id)
    }

    #[tokio::test]
    async fn test_enroll_is_idempotent() {
        let pool = test_pool().await;
        let (learner_id, program_id) = seed_pair(&pool).await;

        let first = enroll(&pool, learner_id, program_id).await.unwrap();
        let second = enroll(&pool, learner_id, program_id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.progress, 0);
        assert!(!second.completed);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_delete_cascade_reports_existence() {
        let pool = test_pool().await;
        let (learner_id, program_id) = seed_pair(&pool).await;

        assert!(!delete_enrollment_cascade(&pool, learner_id, program_id)
            .await
            .unwrap());

        enroll(&pool, learner_id, program_id).await.unwrap();
        assert!(delete_enrollment_cascade(&pool, learner_id, program_id)
            .await
            .unwrap());
        assert!(get_enrollment(&pool, learner_id, program_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_manual_update_keeps_completed_monotonic() {
        let pool = test_pool().await;
        let (learner_id, program_id) = seed_pair(&pool).await;
        enroll(&pool, learner_id, program_id).await.unwrap();

        let updated = manual_update_enrollment(&pool, learner_id, program_id, Some(80), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.progress, 80);
        assert!(!updated.completed);

        let updated = manual_update_enrollment(&pool, learner_id, program_id, None, Some(true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.progress, 100);
        assert!(updated.completed);
        let stamped_at = updated.completed_at.unwrap();

        // A later write cannot clear the flag, lower the pinned progress,
        // or restamp the timestamp
        let again = manual_update_enrollment(&pool, learner_id, program_id, Some(10), Some(false))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.progress, 100);
        assert!(again.completed);
        assert_eq!(again.completed_at.unwrap(), stamped_at);
    }
}
