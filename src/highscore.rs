//! Best score across sessions, kept in a small JSON key/value file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key the best score is stored under
pub const HIGH_SCORE_KEY: &str = "intervalMasterHighScore";

#[derive(Debug, Error)]
pub enum HighScoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk layout: the high score plus whatever else shares the file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Storage {
    #[serde(
        rename = "intervalMasterHighScore",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    high_score: Option<u32>,
    #[serde(flatten)]
    other: BTreeMap<String, serde_json::Value>,
}

/// Key/value file holding the high score.
/// Other keys in the file are preserved on write.
#[derive(Debug, Clone)]
pub struct HighScoreStore {
    path: PathBuf,
}

impl HighScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `interval-master/storage.json` under the platform data directory
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("interval-master")
            .join("storage.json")
    }

    fn read(&self) -> Result<Storage, HighScoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Storage::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, storage: &Storage) -> Result<(), HighScoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(storage)?)?;
        Ok(())
    }

    /// Stored high score; 0 when nothing usable is stored.
    pub fn load(&self) -> u32 {
        match self.read() {
            Ok(storage) => storage.high_score.unwrap_or(0),
            Err(e) => {
                log::warn!("reading high score from {}: {}", self.path.display(), e);
                0
            }
        }
    }

    /// Store `score` if it beats the stored value. Returns whether it did.
    pub fn submit(&self, score: u32) -> Result<bool, HighScoreError> {
        let mut storage = self.read().unwrap_or_else(|e| {
            log::warn!("replacing unreadable store {}: {}", self.path.display(), e);
            Storage::default()
        });
        if score <= storage.high_score.unwrap_or(0) {
            return Ok(false);
        }
        storage.high_score = Some(score);
        self.write(&storage)?;
        log::info!("{} = {}", HIGH_SCORE_KEY, score);
        Ok(true)
    }

    /// Forget the stored high score
    pub fn clear(&self) -> Result<(), HighScoreError> {
        let mut storage = self.read()?;
        if storage.high_score.take().is_some() {
            self.write(&storage)?;
        }
        Ok(())
    }
}
