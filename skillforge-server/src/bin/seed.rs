//! Demo Catalog Seeder
//!
//! Writes a small demo catalog (learners, a program with episodes and a
//! quiz, one enrollment) into the configured database so a locally
//! running server has something to serve.
//!
//! **Usage:**
//! ```bash
//! seed [--data-dir <dir>]
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::info;
use uuid::Uuid;

use skillforge_common::config;
use skillforge_common::db::init::init_database;
use skillforge_common::db::models::{Episode, Learner, Program, Question, Quiz};
use skillforge_common::types::Role;
use skillforge_server::db;

/// Demo catalog seeder
#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Seed the database with a demo learning catalog")]
struct Args {
    /// Data folder holding the database (overrides env and config file)
    #[arg(short, long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let args = Args::parse();

    let data_dir = config::resolve_data_dir(args.data_dir.as_deref(), "SKILLFORGE_DATA_DIR")
        .context("Failed to resolve data folder")?;
    let db_path = config::database_path(&data_dir);
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let student = Learner {
        id: Uuid::new_v4(),
        name: "Demo Student".to_string(),
        email: "student@example.com".to_string(),
        role: Role::Student,
        avatar: None,
        xp_points: 0,
        level: 1,
        created_at: Utc::now(),
    };
    let admin = Learner {
        id: Uuid::new_v4(),
        name: "Demo Admin".to_string(),
        email: "admin@example.com".to_string(),
        role: Role::Admin,
        avatar: None,
        xp_points: 0,
        level: 1,
        created_at: Utc::now(),
    };
    db::learners::save_learner(&pool, &student).await?;
    db::learners::save_learner(&pool, &admin).await?;

    let program = Program {
        id: Uuid::new_v4(),
        title: "Foundations of Sound Design".to_string(),
        reward_points: 500,
        created_at: Utc::now(),
    };
    db::programs::save_program(&pool, &program).await?;

    let episode_titles = ["What Is Sound?", "Synthesis Basics", "Mixing a Scene"];
    for (i, title) in episode_titles.iter().enumerate() {
        let episode = Episode {
            id: Uuid::new_v4(),
            program_id: program.id,
            title: title.to_string(),
            position: i as i64 + 1,
            created_at: Utc::now(),
        };
        db::episodes::save_episode(&pool, &episode).await?;
    }

    let quiz = Quiz {
        id: Uuid::new_v4(),
        program_id: program.id,
        title: "Sound Design Checkpoint".to_string(),
        created_at: Utc::now(),
    };
    db::quizzes::save_quiz(&pool, &quiz).await?;

    let questions = [
        (
            "Which quantity does an oscillator's frequency control?",
            vec!["Loudness", "Pitch", "Stereo width"],
            1,
        ),
        (
            "What does a low-pass filter remove?",
            vec!["Low frequencies", "High frequencies", "All frequencies"],
            1,
        ),
        (
            "Which envelope stage shapes the start of a note?",
            vec!["Attack", "Release", "Sustain"],
            0,
        ),
    ];
    for (i, (text, options, answer)) in questions.into_iter().enumerate() {
        let question = Question {
            id: Uuid::new_v4(),
            quiz_id: quiz.id,
            text: text.to_string(),
            options: options.into_iter().map(String::from).collect(),
            answer,
            position: i as i64 + 1,
        };
        db::quizzes::save_question(&pool, &question).await?;
    }

    db::enrollments::enroll(&pool, student.id, program.id).await?;

    info!("Seeded demo catalog into {}", db_path.display());
    info!("Student: {} ({})", student.id, student.email);
    info!("Admin:   {} ({})", admin.id, admin.email);
    info!("Program: {} ({})", program.id, program.title);
    info!("Quiz:    {}", quiz.id);

    Ok(())
}
