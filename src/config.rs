use std::path::PathBuf;
use std::time::Duration;

use crate::game::{FEEDBACK_DELAY, Level};
use crate::highscore::HighScoreStore;

/// How often the terminal loop polls input and refreshes the countdown
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Runtime settings for an interactive session
#[derive(Debug, Clone)]
pub struct Settings {
    /// Skip the menu and start at this level
    pub level: Option<Level>,
    /// Seed for reproducible question sequences
    pub seed: Option<u64>,
    pub mute: bool,
    pub store_path: PathBuf,
    pub feedback_delay: Duration,
    pub tick_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            level: None,
            seed: None,
            mute: false,
            store_path: HighScoreStore::default_path(),
            feedback_delay: FEEDBACK_DELAY,
            tick_interval: TICK_INTERVAL,
        }
    }
}
