mod clock;
mod config;
mod distractor;
mod game;
mod highscore;
mod interval;
mod note;
mod question;
mod scheduler;
mod session;
mod stats;
mod synth;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::game::Level;
use crate::highscore::HighScoreStore;
use crate::interval::{Interval, calculate_interval};
use crate::note::Note;

#[derive(Parser)]
#[command(name = "interval-master", about = "Interval ear-training game for the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play the trainer
    Play {
        /// Start straight away at this level (1-4) instead of showing the menu
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
        level: Option<u8>,

        /// Seed the question generator for a repeatable session
        #[arg(long)]
        seed: Option<u64>,

        /// Play without sound
        #[arg(long)]
        mute: bool,

        /// High score file (defaults to the platform data directory)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Pause after each answer, in milliseconds
        #[arg(long, default_value_t = 1500)]
        feedback_ms: u64,
    },

    /// Work out an interval, e.g. `calc Eb4 m3`
    Calc {
        /// Reference note (C, F#, Bb3, ...)
        note: Note,

        /// Interval in short notation: M3, m6, P5, A4, d7, or a bare number
        interval: Interval,
    },

    /// Show or clear the stored high score
    Score {
        /// High score file (defaults to the platform data directory)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Forget the stored high score
        #[arg(long)]
        clear: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Play {
            level,
            seed,
            mute,
            store,
            feedback_ms,
        } => {
            let level = level.map(Level::try_from).transpose()?;
            let defaults = Settings::default();
            let settings = Settings {
                level,
                seed,
                mute,
                store_path: store.unwrap_or(defaults.store_path),
                feedback_delay: Duration::from_millis(feedback_ms),
                ..defaults
            };
            session::run(settings)
        }
        Command::Calc { note, interval } => {
            print_calculation(&note, &interval);
            Ok(())
        }
        Command::Score { store, clear } => {
            let store = HighScoreStore::new(store.unwrap_or_else(HighScoreStore::default_path));
            if clear {
                store
                    .clear()
                    .with_context(|| format!("clearing {}", store.path().display()))?;
                println!("High score cleared");
            } else {
                println!("High score: {}", store.load());
            }
            Ok(())
        }
    }
}

fn print_calculation(reference: &Note, interval: &Interval) {
    let result = calculate_interval(reference, interval);
    println!(
        "{} ({}) above {} is {}",
        interval.display_name(),
        interval,
        reference,
        result
    );
    println!(
        "  {} semitone{}, pitch class {} -> {}",
        interval.semitones(),
        if interval.semitones() == 1 { "" } else { "s" },
        reference.pitch_class(),
        result.pitch_class()
    );
}
