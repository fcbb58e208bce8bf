//! Question generation: reference note, interval, answer and options.

use rand::Rng;

use crate::distractor::{distractor_count, generate_wrong_options};
use crate::game::Level;
use crate::interval::{Interval, calculate_interval, generate_random_interval};
use crate::note::Note;

/// Seconds allowed per question below the final level
pub const DEFAULT_TIME_LIMIT: u32 = 10;

/// Seconds allowed per question at the final level
pub const FINAL_LEVEL_TIME_LIMIT: u32 = 7;

/// One question as shown to the player. Never changes once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub reference: Note,
    pub interval: Interval,
    pub correct_answer: Note,
    pub options: Vec<Note>,
    /// Seconds
    pub time_limit: u32,
}

impl Question {
    /// Assemble a question from its parts, computing the answer.
    pub fn build<R: Rng + ?Sized>(
        reference: Note,
        interval: Interval,
        level: Level,
        rng: &mut R,
    ) -> Self {
        let correct_answer = calculate_interval(&reference, &interval);
        let options =
            generate_wrong_options(&reference, &correct_answer, distractor_count(level), rng);
        Self {
            reference,
            interval,
            correct_answer,
            options,
            time_limit: time_limit(level),
        }
    }

    pub fn is_correct(&self, answer: &Note) -> bool {
        self.correct_answer.same_pitch_class(answer)
    }
}

pub fn time_limit(level: Level) -> u32 {
    match level {
        Level::Four => FINAL_LEVEL_TIME_LIMIT,
        _ => DEFAULT_TIME_LIMIT,
    }
}

pub fn generate_question<R: Rng + ?Sized>(level: Level, rng: &mut R) -> Question {
    let reference = Note::random(rng);
    let interval = generate_random_interval(level, rng);
    Question::build(reference, interval, level, rng)
}

/// Where the state machine gets its next question from.
pub trait QuestionSource {
    fn next_question(&mut self, level: Level) -> Question;
}

/// Production source backed by a random number generator
pub struct RandomQuestions<R> {
    rng: R,
}

impl<R: Rng> RandomQuestions<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> QuestionSource for RandomQuestions<R> {
    fn next_question(&mut self, level: Level) -> Question {
        let question = generate_question(level, &mut self.rng);
        log::debug!(
            "level {}: {} {} -> {}",
            level,
            question.reference,
            question.interval,
            question.correct_answer
        );
        question
    }
}
