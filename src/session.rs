//! Interactive trainer: keyboard and clock in, terminal frames out.
//!
//! `Session` owns everything with side effects around the pure state machine:
//! the countdown, deferred actions, audio cues and the high score file. The
//! terminal loop only feeds it keys and ticks and draws what it renders.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::clock::{Clock, Countdown, SystemClock};
use crate::config::Settings;
use crate::game::{Action, AnsweredQuestion, GameState, GameStatus, Level, QUESTIONS_PER_ROUND};
use crate::highscore::HighScoreStore;
use crate::question::{QuestionSource, RandomQuestions};
use crate::scheduler::Scheduler;
use crate::stats::{self, HARDEST_SHOWN, Summary};
use crate::synth::{self, AudioEngine};

/// Seconds the reference note sounds for
const REFERENCE_NOTE_SECS: f64 = 1.0;

const COUNTDOWN_WIDTH: u32 = 20;

const RULE: &str = "─────────────────────────────────────────";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session<C: Clock> {
    state: GameState,
    questions: Box<dyn QuestionSource>,
    clock: C,
    scheduler: Scheduler,
    countdown: Option<Countdown>,
    store: HighScoreStore,
    high_score: u32,
    new_high_score: bool,
    audio: AudioEngine,
    feedback_delay: Duration,
}

impl<C: Clock> Session<C> {
    pub fn new(settings: &Settings, clock: C, audio: AudioEngine) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let store = HighScoreStore::new(&settings.store_path);
        let high_score = store.load();
        Self {
            state: GameState::new(),
            questions: Box::new(RandomQuestions::new(rng)),
            clock,
            scheduler: Scheduler::new(),
            countdown: None,
            store,
            high_score,
            new_high_score: false,
            audio,
            feedback_delay: settings.feedback_delay,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    /// Run one action through the state machine and settle side effects.
    pub fn handle(&mut self, action: Action) {
        let before_status = self.state.status;
        let before_answers = self.state.answered_questions.len();

        let prev = std::mem::take(&mut self.state);
        self.state = prev.dispatch(action, self.questions.as_mut());

        if self.state.status != before_status {
            self.scheduler.cancel_all();
            match self.state.status {
                GameStatus::Results => self.record_high_score(),
                GameStatus::Menu => self.new_high_score = false,
                _ => {}
            }
        }

        if self.state.answered_questions.len() > before_answers {
            if let Some(last) = self.state.answered_questions.last() {
                self.audio.play(if last.is_correct {
                    synth::correct_cue()
                } else {
                    synth::wrong_cue()
                });
            }
            if self.state.awaiting_next {
                self.scheduler
                    .schedule(&self.clock, self.feedback_delay, Action::NextQuestion);
            }
        }

        self.sync_countdown();
    }

    /// Keep exactly one countdown running, and only while an answer is expected.
    fn sync_countdown(&mut self) {
        if !self.state.accepting_answers() {
            self.countdown = None;
            return;
        }
        let seq = self.state.question_seq;
        if self.countdown.map(|c| c.question_seq) == Some(seq) {
            return;
        }
        self.countdown = Some(Countdown::start(seq, &self.clock));
        if let Some(question) = &self.state.current_question {
            self.audio.play_note(&question.reference, REFERENCE_NOTE_SECS);
        }
    }

    fn record_high_score(&mut self) {
        match self.store.submit(self.state.score) {
            Ok(true) => {
                self.high_score = self.state.score;
                self.new_high_score = true;
            }
            Ok(false) => {}
            Err(e) => log::error!(
                "saving high score to {}: {}",
                self.store.path().display(),
                e
            ),
        }
    }

    /// Fire due deferred actions, then refresh the countdown.
    pub fn tick(&mut self) {
        for action in self.scheduler.take_due(&self.clock) {
            self.handle(action);
        }
        if let Some(countdown) = self.countdown {
            if countdown.question_seq == self.state.question_seq {
                self.handle(Action::Tick {
                    elapsed: countdown.elapsed(&self.clock),
                });
            }
        }
    }

    /// Pick option `index` of the current question. False if nothing was recorded.
    pub fn answer_option(&mut self, index: usize) -> bool {
        let Some(note) = self
            .state
            .current_question
            .as_ref()
            .filter(|_| self.state.accepting_answers())
            .and_then(|q| q.options.get(index))
            .copied()
        else {
            return false;
        };
        let time_spent = self
            .countdown
            .map_or(0, |c| c.elapsed_secs(&self.clock));
        self.handle(Action::Answer { note, time_spent });
        true
    }

    /// Replay the reference note, followed by the answer once it is revealed.
    pub fn replay(&self) {
        let Some(question) = &self.state.current_question else {
            return;
        };
        if self.state.awaiting_next {
            self.audio.play(synth::sequence(
                &[question.reference, question.correct_answer],
                0.5,
                0.1,
            ));
        } else {
            self.audio.play_note(&question.reference, REFERENCE_NOTE_SECS);
        }
    }

    pub fn on_key(&mut self, code: KeyCode) -> Flow {
        match (self.state.status, code) {
            (GameStatus::Menu, KeyCode::Char(c)) if c.is_ascii_digit() => {
                let level = c.to_digit(10).and_then(|d| Level::try_from(d as u8).ok());
                if let Some(level) = level {
                    self.handle(Action::Start(level));
                }
            }
            (GameStatus::Menu | GameStatus::Results, KeyCode::Esc | KeyCode::Char('q')) => {
                return Flow::Quit;
            }
            (GameStatus::Playing, KeyCode::Char(c)) if c.is_ascii_digit() => {
                if let Some(index) = c.to_digit(10).and_then(|d| d.checked_sub(1)) {
                    self.answer_option(index as usize);
                }
            }
            (GameStatus::Playing, KeyCode::Char('r')) => self.replay(),
            (GameStatus::Playing | GameStatus::RoundSummary, KeyCode::Esc | KeyCode::Char('q')) => {
                self.handle(Action::GoToMenu);
            }
            (GameStatus::RoundSummary, KeyCode::Enter | KeyCode::Char('c')) => {
                self.handle(Action::ContinueToNextRound);
            }
            (GameStatus::Results, KeyCode::Enter) => self.handle(Action::Reset),
            _ => {}
        }
        Flow::Continue
    }

    pub fn stop_audio(&self) {
        self.audio.stop();
    }

    /// The current screen, one string per terminal row
    pub fn screen(&self) -> Vec<String> {
        match self.state.status {
            GameStatus::Menu => self.menu_screen(),
            GameStatus::Playing => self.playing_screen(),
            GameStatus::RoundSummary => self.round_summary_screen(),
            GameStatus::Results => self.results_screen(),
        }
    }

    fn menu_screen(&self) -> Vec<String> {
        let mut lines = vec![
            "interval master - interval ear training".to_string(),
            RULE.to_string(),
            String::new(),
            format!("  High score: {}", self.high_score()),
            String::new(),
            "  Choose a level:".to_string(),
        ];
        for level in Level::ALL {
            lines.push(format!("    {}  {}", level, level_blurb(level)));
        }
        lines.push(String::new());
        lines.push("  Quit: Esc".to_string());
        lines
    }

    fn playing_screen(&self) -> Vec<String> {
        let state = &self.state;
        let Some(question) = &state.current_question else {
            return vec!["Loading...".to_string()];
        };
        let shown = (state.questions_in_round + usize::from(!state.awaiting_next))
            .min(QUESTIONS_PER_ROUND);

        let mut lines = vec![
            format!(
                "Level {} | Round {} | Question {}/{} | Score {} | Streak {}",
                state.level,
                state.current_round,
                shown,
                QUESTIONS_PER_ROUND,
                state.score,
                state.streak
            ),
            RULE.to_string(),
            String::new(),
            format!("  Reference note:  {}", question.reference),
            format!("  Find the:        {} above", question.interval.display_name()),
            String::new(),
            format!(
                "  Time: {} {}s",
                countdown_bar(state.time_remaining, question.time_limit),
                state.time_remaining
            ),
            String::new(),
        ];
        for (i, option) in question.options.iter().enumerate() {
            let marker = if state.awaiting_next && question.is_correct(option) {
                "  <"
            } else {
                ""
            };
            lines.push(format!("    {})  {}{}", i + 1, option.name, marker));
        }
        lines.push(String::new());
        if state.awaiting_next {
            if let Some(last) = state.answered_questions.last() {
                lines.push(format!("  {}", feedback_line(last)));
            }
        } else {
            lines.push(String::new());
        }
        lines.push(format!(
            "  1-{}: answer   r: replay   Esc: menu",
            question.options.len()
        ));
        lines
    }

    fn round_summary_screen(&self) -> Vec<String> {
        let state = &self.state;
        let summary = Summary::of(&state.current_round_questions);
        let mut lines = vec![
            format!(
                "Round {} summary (level {})",
                state.current_round, state.level
            ),
            RULE.to_string(),
            String::new(),
            format!(
                "  Correct: {}/{}   Accuracy: {:.0}%   Points: {}",
                summary.correct, summary.total, summary.accuracy, summary.points
            ),
            String::new(),
        ];
        lines.extend(state.current_round_questions.iter().map(answer_line));
        lines.push(String::new());
        if state.can_advance_round {
            lines.push("  Clean round! You can move on.".to_string());
            lines.push("  Enter: continue   Esc: quit to menu".to_string());
        } else {
            lines.push("  Some answers were wrong, so the session ends here.".to_string());
            lines.push("  Enter: see results   Esc: quit to menu".to_string());
        }
        lines
    }

    fn results_screen(&self) -> Vec<String> {
        let state = &self.state;
        let summary = Summary::of(&state.answered_questions);
        let mut lines = vec![
            "Results".to_string(),
            RULE.to_string(),
            String::new(),
            format!("  Final score: {}", state.score),
        ];
        if self.new_high_score {
            lines.push("  New high score!".to_string());
        } else {
            lines.push(format!("  High score: {}", self.high_score));
        }
        lines.push(format!("  Level reached: {}", state.level));
        lines.push(format!(
            "  Answered: {}   Correct: {}   Timeouts: {}   Accuracy: {:.0}%",
            summary.total, summary.correct, summary.timeouts, summary.accuracy
        ));

        let hardest = stats::hardest_intervals(&state.answered_questions, HARDEST_SHOWN);
        if !hardest.is_empty() {
            lines.push(String::new());
            lines.push("  Hardest intervals:".to_string());
            for (name, misses) in hardest {
                let plural = if misses == 1 { "" } else { "es" };
                lines.push(format!("    {} ({} miss{})", name, misses, plural));
            }
        }

        lines.push(String::new());
        lines.push("  Rounds:".to_string());
        for (i, round) in stats::by_round(&state.answered_questions).iter().enumerate() {
            let round = Summary::of(round);
            lines.push(format!(
                "    {}: {}/{} correct, {} pts",
                i + 1,
                round.correct,
                round.total,
                round.points
            ));
        }
        lines.push(String::new());
        lines.push("  Enter: back to menu   Esc: quit".to_string());
        lines
    }
}

fn level_blurb(level: Level) -> &'static str {
    match level {
        Level::One => "Interval numbers only (third, fifth...)",
        Level::Two => "Major, minor and perfect intervals",
        Level::Three => "Augmented and diminished too, 5 options",
        Level::Four => "Everything, 6 options, 7 seconds each",
    }
}

fn countdown_bar(remaining: u32, limit: u32) -> String {
    let filled = if limit == 0 {
        0
    } else {
        (remaining.min(limit) * COUNTDOWN_WIDTH) / limit
    };
    format!(
        "[{}{}]",
        "█".repeat(filled as usize),
        "░".repeat((COUNTDOWN_WIDTH - filled) as usize)
    )
}

fn feedback_line(answered: &AnsweredQuestion) -> String {
    let answer = answered.question.correct_answer;
    match answered.user_answer {
        _ if answered.is_correct => format!("Correct! +{}", answered.points),
        Some(_) => format!("Wrong: the answer was {}", answer.name),
        None => format!("Time's up: the answer was {}", answer.name),
    }
}

fn answer_line(answered: &AnsweredQuestion) -> String {
    let question = &answered.question;
    let mark = if answered.is_correct { "ok" } else { "x " };
    let given = match answered.user_answer {
        Some(note) => note.name.to_string(),
        None => "time's up".to_string(),
    };
    let correction = if answered.is_correct {
        String::new()
    } else {
        format!(" (answer {})", question.correct_answer.name)
    };
    format!(
        "  {} {:<18} {} -> {}{}  {}s",
        mark,
        question.interval.display_name(),
        question.reference.name,
        given,
        correction,
        answered.time_spent
    )
}

/// Run the interactive trainer until the player quits
pub fn run(settings: Settings) -> Result<()> {
    let audio = AudioEngine::new(settings.mute);
    if audio.is_silent() {
        log::info!("playing without sound");
    }
    let mut session = Session::new(&settings, SystemClock, audio);
    log::info!("high score store: {}", settings.store_path.display());
    if let Some(level) = settings.level {
        session.handle(Action::Start(level));
    }

    let mut stdout = io::stdout();

    terminal::enable_raw_mode().context("failed to enable raw mode")?;
    execute!(stdout, EnterAlternateScreen, Hide).context("alternate screen")?;

    let result = event_loop(&mut session, &mut stdout, settings.tick_interval);

    // Restore terminal
    session.stop_audio();
    let _ = execute!(stdout, Show, LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();

    result
}

fn event_loop<C: Clock>(
    session: &mut Session<C>,
    stdout: &mut io::Stdout,
    tick_interval: Duration,
) -> Result<()> {
    let mut drawn: Vec<String> = Vec::new();

    loop {
        session.tick();

        let frame = session.screen();
        if frame != drawn {
            draw(stdout, &frame)?;
            drawn = frame;
        }

        if !event::poll(tick_interval).context("event poll error")? {
            continue;
        }

        match event::read().context("event read error")? {
            Event::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) if modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),

            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => {
                if session.on_key(code) == Flow::Quit {
                    return Ok(());
                }
            }

            // Force a full redraw after a resize
            Event::Resize(..) => drawn.clear(),

            _ => {}
        }
    }
}

fn draw(stdout: &mut io::Stdout, lines: &[String]) -> Result<()> {
    queue!(stdout, Clear(ClearType::All), MoveTo(0, 0)).context("clearing screen")?;
    for line in lines {
        write!(stdout, "{}\r\n", line)?;
    }
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::game::FEEDBACK_DELAY;

    fn open_session(dir: &tempfile::TempDir) -> (ManualClock, Session<ManualClock>) {
        let settings = Settings {
            seed: Some(17),
            store_path: dir.path().join("storage.json"),
            ..Settings::default()
        };
        let clock = ManualClock::new();
        let session = Session::new(&settings, clock.clone(), AudioEngine::silent());
        (clock, session)
    }

    fn option_index(session: &Session<ManualClock>, correct: bool) -> usize {
        let question = session.state().current_question.as_ref().unwrap();
        question
            .options
            .iter()
            .position(|o| question.is_correct(o) == correct)
            .unwrap()
    }

    /// Answer and wait out the feedback delay
    fn answer_and_wait(clock: &ManualClock, session: &mut Session<ManualClock>, correct: bool) {
        let index = option_index(session, correct);
        assert!(session.answer_option(index));
        clock.advance(FEEDBACK_DELAY);
        session.tick();
    }

    #[test]
    fn test_countdown_times_out_then_moves_on() {
        let dir = tempfile::tempdir().unwrap();
        let (clock, mut session) = open_session(&dir);
        session.handle(Action::Start(Level::One));
        assert!(session.countdown.is_some());

        clock.advance(Duration::from_millis(9900));
        session.tick();
        assert_eq!(session.state().time_remaining, 1);
        assert!(session.state().answered_questions.is_empty());

        clock.advance(Duration::from_millis(100));
        session.tick();
        let state = session.state();
        assert_eq!(state.answered_questions.len(), 1);
        assert_eq!(state.answered_questions[0].user_answer, None);
        assert!(state.awaiting_next);
        assert!(session.countdown.is_none());

        clock.advance(Duration::from_millis(1499));
        session.tick();
        assert!(session.state().awaiting_next);

        clock.advance(Duration::from_millis(1));
        session.tick();
        let state = session.state();
        assert_eq!(state.question_seq, 2);
        assert_eq!(state.time_remaining, 10);
        assert_eq!(session.countdown.map(|c| c.question_seq), Some(2));
    }

    #[test]
    fn test_answer_time_comes_from_clock() {
        let dir = tempfile::tempdir().unwrap();
        let (clock, mut session) = open_session(&dir);
        session.handle(Action::Start(Level::Two));
        clock.advance(Duration::from_millis(4500));
        let index = option_index(&session, true);
        assert!(session.answer_option(index));

        let last = session.state().answered_questions.last().unwrap();
        assert_eq!(last.time_spent, 4);
        // 7 for speed + 2 for level two
        assert_eq!(last.points, 9);
        assert!(!session.answer_option(index));
    }

    #[test]
    fn test_leaving_cancels_pending_question() {
        let dir = tempfile::tempdir().unwrap();
        let (clock, mut session) = open_session(&dir);
        session.on_key(KeyCode::Char('1'));
        assert_eq!(session.state().status, GameStatus::Playing);
        session.on_key(KeyCode::Char('1'));
        assert!(session.state().awaiting_next);

        session.on_key(KeyCode::Esc);
        assert_eq!(session.state().status, GameStatus::Menu);
        assert!(session.scheduler.is_idle());

        clock.advance(Duration::from_secs(5));
        session.tick();
        assert_eq!(session.state().status, GameStatus::Menu);
        assert!(session.state().current_question.is_none());
    }

    #[test]
    fn test_failed_round_saves_high_score() {
        let dir = tempfile::tempdir().unwrap();
        let (clock, mut session) = open_session(&dir);
        session.handle(Action::Start(Level::One));
        for correct in [true, true, false, true, true] {
            answer_and_wait(&clock, &mut session, correct);
        }
        assert_eq!(session.state().status, GameStatus::RoundSummary);
        assert!(!session.state().can_advance_round);
        let score = session.state().score;
        assert!(score > 0);

        session.on_key(KeyCode::Enter);
        assert_eq!(session.state().status, GameStatus::Results);
        assert_eq!(session.high_score(), score);
        assert!(session.screen().iter().any(|l| l.contains("New high score!")));

        let (_, reopened) = open_session(&dir);
        assert_eq!(reopened.high_score(), score);

        assert_eq!(session.on_key(KeyCode::Enter), Flow::Continue);
        assert_eq!(session.state().status, GameStatus::Menu);
        assert_eq!(session.on_key(KeyCode::Esc), Flow::Quit);
    }

    #[test]
    fn test_menu_ignores_unknown_levels() {
        let dir = tempfile::tempdir().unwrap();
        let (_clock, mut session) = open_session(&dir);
        session.on_key(KeyCode::Char('5'));
        session.on_key(KeyCode::Char('0'));
        assert_eq!(session.state().status, GameStatus::Menu);
        session.on_key(KeyCode::Char('3'));
        assert_eq!(session.state().level, Level::Three);
    }

    #[test]
    fn test_screens_show_the_essentials() {
        let dir = tempfile::tempdir().unwrap();
        let (_clock, mut session) = open_session(&dir);
        assert!(session.screen().iter().any(|l| l.contains("High score: 0")));

        session.handle(Action::Start(Level::Three));
        let question = session.state().current_question.clone().unwrap();
        let screen = session.screen();
        assert!(screen.iter().any(|l| l.contains(&question.interval.display_name())));
        assert!(screen.iter().any(|l| l.contains(&question.reference.to_string())));
        assert!(screen.iter().any(|l| l.contains("5)")));
    }

    #[test]
    fn test_countdown_bar_scales() {
        assert_eq!(countdown_bar(10, 10), format!("[{}]", "█".repeat(20)));
        assert_eq!(countdown_bar(0, 10), format!("[{}]", "░".repeat(20)));
        assert_eq!(countdown_bar(5, 10).matches('█').count(), 10);
    }
}
