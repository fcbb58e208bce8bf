//! Round and level progression.
//!
//! `GameState` is only ever replaced, never mutated in place: every event goes
//! through [`GameState::apply`], which returns the next state or an error.
//! [`GameState::dispatch`] is the boundary the driver calls; it logs rejected
//! events and keeps the previous state.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::note::Note;
use crate::question::{DEFAULT_TIME_LIMIT, Question, QuestionSource};
use crate::stats;

pub const QUESTIONS_PER_ROUND: usize = 5;

/// Rounds to clear before moving up from levels 1-3
pub const ROUNDS_PER_LEVEL: u32 = 2;

/// Rounds played at the final level before the game ends
pub const FINAL_LEVEL_ROUNDS: u32 = 3;

/// Share of correct answers, over the whole session, needed to level up
pub const ADVANCE_ACCURACY: f64 = 0.7;

/// Pause between an answer and the next question
pub const FEEDBACK_DELAY: Duration = Duration::from_millis(1500);

/// Difficulty level (1-4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    One = 1,
    Two,
    Three,
    Four,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::One, Level::Two, Level::Three, Level::Four];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<Level> {
        match self {
            Level::One => Some(Level::Two),
            Level::Two => Some(Level::Three),
            Level::Three => Some(Level::Four),
            Level::Four => None,
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = GameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Level::ALL
            .get((value as usize).wrapping_sub(1))
            .copied()
            .ok_or(GameError::InvalidLevel(value))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Menu,
    Playing,
    RoundSummary,
    Results,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameStatus::Menu => "menu",
            GameStatus::Playing => "playing",
            GameStatus::RoundSummary => "round_summary",
            GameStatus::Results => "results",
        })
    }
}

/// One question with the player's response. `user_answer` is `None` on timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct AnsweredQuestion {
    pub question: Question,
    pub user_answer: Option<Note>,
    pub is_correct: bool,
    /// Whole seconds
    pub time_spent: u32,
    pub points: u32,
}

/// Events the state machine reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Start(Level),
    /// Time since the current question was shown
    Tick { elapsed: Duration },
    Answer { note: Note, time_spent: u32 },
    Timeout,
    /// Deferred follow-up to an answer; ignored once the state has moved on
    NextQuestion,
    ContinueToNextRound,
    Reset,
    GoToMenu,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("level must be 1-4, got {0}")]
    InvalidLevel(u8),
    #[error("a session is already running ({0})")]
    SessionActive(GameStatus),
    #[error("no question is being played ({0})")]
    NotPlaying(GameStatus),
    #[error("the current question was already answered")]
    AlreadyAnswered,
    #[error("rounds can only be continued from the round summary ({0})")]
    NotInRoundSummary(GameStatus),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub level: Level,
    pub current_round: u32,
    pub questions_in_round: usize,
    pub current_question: Option<Question>,
    /// Bumped every time a new question is presented
    pub question_seq: u64,
    pub score: u32,
    pub streak: u32,
    /// Seconds
    pub time_remaining: u32,
    pub status: GameStatus,
    pub answered_questions: Vec<AnsweredQuestion>,
    pub current_round_questions: Vec<AnsweredQuestion>,
    pub can_advance_round: bool,
    /// The current question is answered and showing feedback
    pub awaiting_next: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Points for one answer. `prior_streak` is the streak before this answer.
pub fn score(time_spent: u32, is_correct: bool, prior_streak: u32, level: Level) -> u32 {
    if !is_correct {
        return 0;
    }
    let base = match time_spent {
        0..=3 => 10,
        4..=7 => 7,
        _ => 5,
    };
    let streak_bonus = (prior_streak * 2).min(10);
    let level_bonus = (level.number() as u32 - 1) * 2;
    base + streak_bonus + level_bonus
}

impl GameState {
    pub fn new() -> Self {
        Self {
            level: Level::One,
            current_round: 1,
            questions_in_round: 0,
            current_question: None,
            question_seq: 0,
            score: 0,
            streak: 0,
            time_remaining: DEFAULT_TIME_LIMIT,
            status: GameStatus::Menu,
            answered_questions: Vec::new(),
            current_round_questions: Vec::new(),
            can_advance_round: false,
            awaiting_next: false,
        }
    }

    /// True while the current question can still be answered
    pub fn accepting_answers(&self) -> bool {
        self.status == GameStatus::Playing
            && self.current_question.is_some()
            && !self.awaiting_next
    }

    /// Apply `action`, falling back to the current state if it is rejected.
    pub fn dispatch<Q: QuestionSource + ?Sized>(self, action: Action, questions: &mut Q) -> Self {
        match self.apply(&action, questions) {
            Ok(next) => {
                if next.status != self.status {
                    log::debug!("{} -> {} on {:?}", self.status, next.status, action);
                }
                next
            }
            Err(e) => {
                log::warn!("ignoring {:?}: {}", action, e);
                self
            }
        }
    }

    pub fn apply<Q: QuestionSource + ?Sized>(
        &self,
        action: &Action,
        questions: &mut Q,
    ) -> Result<Self, GameError> {
        match action {
            Action::Start(level) => self.start(*level, questions),
            Action::Tick { elapsed } => Ok(self.tick(*elapsed)),
            Action::Answer { note, time_spent } => {
                let question = self.answerable()?;
                let time_spent = (*time_spent).min(question.time_limit);
                Ok(self.record(Some(*note), time_spent))
            }
            Action::Timeout => {
                let question = self.answerable()?;
                Ok(self.record(None, question.time_limit))
            }
            Action::NextQuestion => Ok(self.next_question(questions)),
            Action::ContinueToNextRound => self.continue_to_next_round(questions),
            Action::Reset | Action::GoToMenu => Ok(Self {
                question_seq: self.question_seq,
                ..Self::new()
            }),
        }
    }

    fn start<Q: QuestionSource + ?Sized>(
        &self,
        level: Level,
        questions: &mut Q,
    ) -> Result<Self, GameError> {
        if matches!(self.status, GameStatus::Playing | GameStatus::RoundSummary) {
            return Err(GameError::SessionActive(self.status));
        }
        let question = questions.next_question(level);
        Ok(Self {
            level,
            status: GameStatus::Playing,
            time_remaining: question.time_limit,
            current_question: Some(question),
            question_seq: self.question_seq + 1,
            ..Self::new()
        })
    }

    fn answerable(&self) -> Result<&Question, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::NotPlaying(self.status));
        }
        if self.awaiting_next {
            return Err(GameError::AlreadyAnswered);
        }
        self.current_question
            .as_ref()
            .ok_or(GameError::NotPlaying(self.status))
    }

    fn tick(&self, elapsed: Duration) -> Self {
        let Some(question) = self.current_question.as_ref().filter(|_| self.accepting_answers())
        else {
            return self.clone();
        };
        let elapsed = u32::try_from(elapsed.as_secs()).unwrap_or(u32::MAX);
        let time_remaining = question.time_limit.saturating_sub(elapsed);
        if time_remaining == 0 {
            return self.record(None, question.time_limit);
        }
        Self {
            time_remaining,
            ..self.clone()
        }
    }

    /// Record a response to the current question. Callers check `answerable` first.
    fn record(&self, user_answer: Option<Note>, time_spent: u32) -> Self {
        let mut next = self.clone();
        let Some(question) = next.current_question.clone() else {
            return next;
        };

        let is_correct = user_answer.is_some_and(|note| question.is_correct(&note));
        let points = score(time_spent, is_correct, self.streak, self.level);
        let answered = AnsweredQuestion {
            question,
            user_answer,
            is_correct,
            time_spent,
            points,
        };

        next.score += points;
        next.streak = if is_correct { self.streak + 1 } else { 0 };
        if user_answer.is_none() {
            next.time_remaining = 0;
        }
        next.answered_questions.push(answered.clone());
        next.current_round_questions.push(answered);
        next.questions_in_round += 1;
        next.can_advance_round = next.current_round_questions.iter().all(|q| q.is_correct);

        if next.questions_in_round >= QUESTIONS_PER_ROUND {
            next.status = GameStatus::RoundSummary;
            next.awaiting_next = false;
        } else {
            next.awaiting_next = true;
        }
        next
    }

    fn next_question<Q: QuestionSource + ?Sized>(&self, questions: &mut Q) -> Self {
        if self.status != GameStatus::Playing || !self.awaiting_next {
            log::debug!("stale next-question request in {}", self.status);
            return self.clone();
        }
        let question = questions.next_question(self.level);
        Self {
            time_remaining: question.time_limit,
            current_question: Some(question),
            question_seq: self.question_seq + 1,
            awaiting_next: false,
            ..self.clone()
        }
    }

    fn continue_to_next_round<Q: QuestionSource + ?Sized>(
        &self,
        questions: &mut Q,
    ) -> Result<Self, GameError> {
        if self.status != GameStatus::RoundSummary {
            return Err(GameError::NotInRoundSummary(self.status));
        }

        if self.can_advance_round && self.should_advance_level() {
            if let Some(level) = self.level.next() {
                log::info!("advancing to level {}", level);
                return Ok(self.begin_round(level, 1, questions));
            }
        }
        if self.is_game_over() || !self.can_advance_round {
            return Ok(Self {
                status: GameStatus::Results,
                ..self.clone()
            });
        }
        Ok(self.begin_round(self.level, self.current_round + 1, questions))
    }

    fn begin_round<Q: QuestionSource + ?Sized>(
        &self,
        level: Level,
        round: u32,
        questions: &mut Q,
    ) -> Self {
        let question = questions.next_question(level);
        Self {
            level,
            current_round: round,
            questions_in_round: 0,
            time_remaining: question.time_limit,
            current_question: Some(question),
            question_seq: self.question_seq + 1,
            status: GameStatus::Playing,
            current_round_questions: Vec::new(),
            can_advance_round: false,
            awaiting_next: false,
            ..self.clone()
        }
    }

    /// Level-up rule, judged against the round that would come next.
    pub fn should_advance_level(&self) -> bool {
        self.level < Level::Four
            && self.current_round + 1 > ROUNDS_PER_LEVEL
            && !self.answered_questions.is_empty()
            && stats::correct_ratio(&self.answered_questions) >= ADVANCE_ACCURACY
    }

    /// Final-level rule, judged against the round that would come next.
    pub fn is_game_over(&self) -> bool {
        self.level == Level::Four && self.current_round + 1 > FINAL_LEVEL_ROUNDS
    }
}
