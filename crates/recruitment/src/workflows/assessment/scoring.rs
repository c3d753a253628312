use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::bank::{QuestionBank, QuestionId};

/// Selected option per question. Missing entries are unanswered.
pub type Answers = BTreeMap<QuestionId, String>;

/// Pass mark applied to the percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub pass_threshold: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            pass_threshold: 70.0,
        }
    }
}

impl ScoringPolicy {
    pub fn new(pass_threshold: f64) -> Self {
        Self { pass_threshold }
    }

    pub fn passes(&self, score: f64) -> bool {
        score >= self.pass_threshold
    }
}

/// Result of grading one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttemptScore {
    pub correct: usize,
    pub total: usize,
    pub score: f64,
    pub passed: bool,
}

/// Grade `answers` against the bank. Answers to questions outside the bank are ignored.
pub fn score_answers(bank: &QuestionBank, answers: &Answers, policy: ScoringPolicy) -> AttemptScore {
    let correct = bank
        .questions()
        .iter()
        .filter(|question| {
            answers
                .get(&question.id)
                .is_some_and(|selected| question.is_correct(selected))
        })
        .count();
    let total = bank.len();
    // Multiply first so whole-number percentages come out exact.
    let score = if total == 0 {
        0.0
    } else {
        100.0 * correct as f64 / total as f64
    };

    AttemptScore {
        correct,
        total,
        score,
        passed: policy.passes(score),
    }
}
