use std::collections::VecDeque;
use std::sync::mpsc;

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::note::{Note, NoteName};

/// A stretch of sound: these frequencies together for a duration (empty = silence)
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub freqs: Vec<f64>,
    pub duration_secs: f64,
}

impl Segment {
    fn tone(freq: f64, duration_secs: f64) -> Self {
        Self {
            freqs: vec![freq],
            duration_secs,
        }
    }
}

/// A command sent to the audio thread
enum AudioCommand {
    /// Replace whatever is playing with these segments, in order
    Play(Vec<Segment>),
    /// Cut the current sound
    Stop,
}

/// Ascending C major arpeggio
pub fn correct_cue() -> Vec<Segment> {
    vec![
        Segment::tone(NoteName::C.to_freq(5), 0.1),
        Segment::tone(NoteName::E.to_freq(5), 0.1),
        Segment::tone(NoteName::G.to_freq(5), 0.2),
    ]
}

/// Semitone clash
pub fn wrong_cue() -> Vec<Segment> {
    vec![
        Segment::tone(NoteName::C.to_freq(4), 0.05),
        Segment {
            freqs: vec![NoteName::C.to_freq(4), NoteName::CSharp.to_freq(4)],
            duration_secs: 0.2,
        },
    ]
}

/// Notes one after another with a short gap between them
pub fn sequence(notes: &[Note], duration_secs: f64, gap_secs: f64) -> Vec<Segment> {
    notes
        .iter()
        .flat_map(|n| {
            [
                Segment::tone(n.to_freq(), duration_secs),
                Segment {
                    freqs: Vec::new(),
                    duration_secs: gap_secs,
                },
            ]
        })
        .collect()
}

/// Output to the default audio device. A muted engine, or one without a
/// device, accepts every call and plays nothing.
pub struct AudioEngine {
    cmd_tx: Option<mpsc::Sender<AudioCommand>>,
    _stream: Option<cpal::Stream>,
}

impl AudioEngine {
    pub fn new(mute: bool) -> Self {
        if mute {
            return Self::silent();
        }
        match Self::open() {
            Ok(engine) => engine,
            Err(e) => {
                log::warn!("audio disabled: {:#}", e);
                Self::silent()
            }
        }
    }

    pub fn silent() -> Self {
        Self {
            cmd_tx: None,
            _stream: None,
        }
    }

    fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no output audio device available"))?;

        let config = device
            .default_output_config()
            .context("failed to get default output config")?;

        let sample_rate = config.sample_rate() as f64;
        let channels = config.channels() as usize;

        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();

        // Audio generation state
        let mut queue: VecDeque<Segment> = VecDeque::new();
        let mut current: Vec<f64> = Vec::new();
        let mut phase: f64 = 0.0;
        let mut samples_remaining: usize = 0;

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    while let Ok(cmd) = cmd_rx.try_recv() {
                        match cmd {
                            AudioCommand::Play(segments) => {
                                queue = segments.into();
                                samples_remaining = 0;
                            }
                            AudioCommand::Stop => {
                                queue.clear();
                                current.clear();
                                samples_remaining = 0;
                            }
                        }
                    }

                    for frame in data.chunks_mut(channels.max(1)) {
                        if samples_remaining == 0 {
                            match queue.pop_front() {
                                Some(segment) => {
                                    current = segment.freqs;
                                    samples_remaining =
                                        (segment.duration_secs * sample_rate) as usize;
                                    phase = 0.0;
                                }
                                None => current.clear(),
                            }
                        }

                        let mut value = 0.0_f64;
                        if samples_remaining > 0 && !current.is_empty() {
                            for freq in &current {
                                value += (phase * freq * 2.0 * std::f64::consts::PI
                                    / sample_rate)
                                    .sin();
                            }
                            // Normalize by number of voices and apply a gentle volume
                            value = value / current.len() as f64 * 0.3;
                            phase += 1.0;
                        }
                        samples_remaining = samples_remaining.saturating_sub(1);

                        for sample in frame.iter_mut() {
                            *sample = value as f32;
                        }
                    }
                },
                move |err| {
                    log::error!("audio stream error: {}", err);
                },
                None,
            )
            .context("failed to build output stream")?;

        stream.play().context("failed to play stream")?;

        Ok(Self {
            cmd_tx: Some(cmd_tx),
            _stream: Some(stream),
        })
    }

    pub fn is_silent(&self) -> bool {
        self.cmd_tx.is_none()
    }

    fn send(&self, cmd: AudioCommand) {
        if let Some(tx) = &self.cmd_tx {
            if tx.send(cmd).is_err() {
                log::warn!("audio thread disconnected");
            }
        }
    }

    pub fn play(&self, segments: Vec<Segment>) {
        self.send(AudioCommand::Play(segments));
    }

    pub fn play_note(&self, note: &Note, duration_secs: f64) {
        self.play(vec![Segment::tone(note.to_freq(), duration_secs)]);
    }

    pub fn stop(&self) {
        self.send(AudioCommand::Stop);
    }
}
