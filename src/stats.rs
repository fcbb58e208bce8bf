//! Summary figures for the round summary and results screens.

use std::collections::HashMap;

use crate::game::{AnsweredQuestion, QUESTIONS_PER_ROUND};

/// How many intervals the results screen lists as hardest
pub const HARDEST_SHOWN: usize = 3;

/// Fraction of correct answers (0.0 when nothing was answered)
pub fn correct_ratio(answers: &[AnsweredQuestion]) -> f64 {
    if answers.is_empty() {
        return 0.0;
    }
    let correct = answers.iter().filter(|a| a.is_correct).count();
    correct as f64 / answers.len() as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub correct: usize,
    /// Percent, 0-100
    pub accuracy: f64,
    pub points: u32,
    pub timeouts: usize,
}

impl Summary {
    pub fn of(answers: &[AnsweredQuestion]) -> Self {
        Self {
            total: answers.len(),
            correct: answers.iter().filter(|a| a.is_correct).count(),
            accuracy: correct_ratio(answers) * 100.0,
            points: answers.iter().map(|a| a.points).sum(),
            timeouts: answers.iter().filter(|a| a.user_answer.is_none()).count(),
        }
    }
}

/// Intervals missed most often, as (display name, misses), most missed first.
/// Ties are broken by name so the listing is stable.
pub fn hardest_intervals(answers: &[AnsweredQuestion], limit: usize) -> Vec<(String, usize)> {
    let mut misses: HashMap<String, usize> = HashMap::new();
    for answer in answers.iter().filter(|a| !a.is_correct) {
        *misses
            .entry(answer.question.interval.display_name())
            .or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = misses.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Session history split back into rounds
pub fn by_round(answers: &[AnsweredQuestion]) -> Vec<&[AnsweredQuestion]> {
    answers.chunks(QUESTIONS_PER_ROUND).collect()
}
