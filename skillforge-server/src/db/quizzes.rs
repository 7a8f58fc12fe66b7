//! Quiz, question, and attempt-history persistence

use skillforge_common::db::models::{Question, Quiz, QuizResult};
use skillforge_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};

/// Save a quiz (insert or update by id)
pub async fn save_quiz(pool: &SqlitePool, quiz: &Quiz) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO quizzes (id, program_id, title, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title
        "#,
    )
    .bind(quiz.id.to_string())
    .bind(quiz.program_id.to_string())
    .bind(&quiz.title)
    .bind(quiz.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a quiz by id
pub async fn get_quiz(pool: &SqlitePool, id: Uuid) -> Result<Option<Quiz>> {
    let row = sqlx::query(
        r#"
        SELECT id, program_id, title, created_at
        FROM quizzes
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(map_quiz(&row)?)),
        None => Ok(None),
    }
}

/// Load the quiz attached to a program, if any
pub async fn get_quiz_for_program(pool: &SqlitePool, program_id: Uuid) -> Result<Option<Quiz>> {
    let row = sqlx::query(
        r#"
        SELECT id, program_id, title, created_at
        FROM quizzes
        WHERE program_id = ?
        ORDER BY created_at
        LIMIT 1
        "#,
    )
    .bind(program_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(map_quiz(&row)?)),
        None => Ok(None),
    }
}

fn map_quiz(row: &sqlx::sqlite::SqliteRow) -> Result<Quiz> {
    let id_str: String = row.get("id");
    let program_str: String = row.get("program_id");
    let created_str: String = row.get("created_at");
    Ok(Quiz {
        id: parse_uuid("quiz", &id_str)?,
        program_id: parse_uuid("quiz.program_id", &program_str)?,
        title: row.get("title"),
        created_at: parse_timestamp("quiz.created_at", &created_str)?,
    })
}

/// Save a question after validating its shape
///
/// A question must carry non-empty text, at least two options, and a
/// correct-answer index inside the option range.
pub async fn save_question(pool: &SqlitePool, question: &Question) -> Result<()> {
    if question.text.trim().is_empty() {
        return Err(Error::InvalidInput("question text is empty".to_string()));
    }
    if question.options.len() < 2 {
        return Err(Error::InvalidInput(
            "question needs at least two options".to_string(),
        ));
    }
    if question.answer < 0 || question.answer as usize >= question.options.len() {
        return Err(Error::InvalidInput(format!(
            "answer index {} out of range for {} options",
            question.answer,
            question.options.len()
        )));
    }

    let options_json = serde_json::to_string(&question.options)
        .map_err(|e| Error::Internal(format!("serialize options: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO questions (id, quiz_id, text, options, answer, position)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            text = excluded.text,
            options = excluded.options,
            answer = excluded.answer,
            position = excluded.position
        "#,
    )
    .bind(question.id.to_string())
    .bind(question.quiz_id.to_string())
    .bind(&question.text)
    .bind(options_json)
    .bind(question.answer)
    .bind(question.position)
    .execute(pool)
    .await?;

    Ok(())
}

/// List a quiz's questions in display order
pub async fn list_questions(pool: &SqlitePool, quiz_id: Uuid) -> Result<Vec<Question>> {
    let rows = sqlx::query(
        r#"
        SELECT id, quiz_id, text, options, answer, position
        FROM questions
        WHERE quiz_id = ?
        ORDER BY position
        "#,
    )
    .bind(quiz_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let id_str: String = row.get("id");
            let quiz_str: String = row.get("quiz_id");
            let options_json: String = row.get("options");
            let options: Vec<String> = serde_json::from_str(&options_json)
                .map_err(|e| Error::Internal(format!("corrupt question options: {}", e)))?;
            Ok(Question {
                id: parse_uuid("question", &id_str)?,
                quiz_id: parse_uuid("question.quiz_id", &quiz_str)?,
                text: row.get("text"),
                options,
                answer: row.get("answer"),
                position: row.get("position"),
            })
        })
        .collect()
}

/// Append one graded attempt to the history (never updates prior rows)
pub async fn save_quiz_result(pool: &SqlitePool, result: &QuizResult) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO quiz_results (id, learner_id, quiz_id, score, total, passed, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(result.id.to_string())
    .bind(result.learner_id.to_string())
    .bind(result.quiz_id.to_string())
    .bind(result.score)
    .bind(result.total)
    .bind(result.passed as i64)
    .bind(result.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// List a learner's attempts for one quiz, newest first
pub async fn list_quiz_results(
    pool: &SqlitePool,
    learner_id: Uuid,
    quiz_id: Uuid,
) -> Result<Vec<QuizResult>> {
    let rows = sqlx::query(
        r#"
        SELECT id, learner_id, quiz_id, score, total, passed, created_at
        FROM quiz_results
        WHERE learner_id = ? AND quiz_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(learner_id.to_string())
    .bind(quiz_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let id_str: String = row.get("id");
            let learner_str: String = row.get("learner_id");
            let quiz_str: String = row.get("quiz_id");
            let passed: i64 = row.get("passed");
            let created_str: String = row.get("created_at");
            Ok(QuizResult {
                id: parse_uuid("quiz_result", &id_str)?,
                learner_id: parse_uuid("quiz_result.learner_id", &learner_str)?,
                quiz_id: parse_uuid("quiz_result.quiz_id", &quiz_str)?,
                score: row.get("score"),
                total: row.get("total"),
                passed: passed != 0,
                created_at: parse_timestamp("quiz_result.created_at", &created_str)?,
            })
        })
        .collect()
}
