//! Quiz grading
//!
//! Pure scoring over the quiz's question set. The correct-answer index
//! enters this module and leaves only inside a post-grading breakdown;
//! no pre-grading surface ever serializes it.

use serde::Serialize;
use skillforge_common::db::models::Question;
use skillforge_common::{Error, Result};
use uuid::Uuid;

/// Per-question review returned to the learner after grading
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AnswerReview {
    pub question_id: Uuid,
    pub question: String,
    pub selected: i64,
    pub correct: i64,
    pub is_correct: bool,
}

/// Outcome of grading one submission
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GradedQuiz {
    pub score: i64,
    pub total: i64,
    pub passed: bool,
    pub breakdown: Vec<AnswerReview>,
}

/// Grade a submission against the quiz's questions
///
/// The answer vector must line up one-to-one with the question list;
/// a length mismatch rejects the whole submission before anything is
/// recorded. Passing requires full marks.
pub fn score_answers(questions: &[Question], answers: &[i64]) -> Result<GradedQuiz> {
    if answers.len() != questions.len() {
        return Err(Error::InvalidInput(format!(
            "expected {} answers, got {}",
            questions.len(),
            answers.len()
        )));
    }

    let mut score = 0;
    let mut breakdown = Vec::with_capacity(questions.len());

    for (question, &selected) in questions.iter().zip(answers) {
        let is_correct = selected == question.answer;
        if is_correct {
            score += 1;
        }
        breakdown.push(AnswerReview {
            question_id: question.id,
            question: question.text.clone(),
            selected,
            correct: question.answer,
            is_correct,
        });
    }

    let total = questions.len() as i64;
    Ok(GradedQuiz {
        score,
        total,
        passed: score == total,
        breakdown,
    })
}

/// Synthesize a passing result without answers (role-gated by the caller)
pub fn auto_pass(questions: &[Question]) -> GradedQuiz {
    let breakdown = questions
        .iter()
        .map(|question| AnswerReview {
            question_id: question.id,
            question: question.text.clone(),
            selected: question.answer,
            correct: question.answer,
            is_correct: true,
        })
        .collect();

    let total = questions.len() as i64;
    GradedQuiz {
        score: total,
        total,
        passed: true,
        breakdown,
    }
}
