//! Intervals (number plus quality) and the arithmetic that turns them into notes.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use thiserror::Error;

use crate::game::Level;
use crate::note::{Note, NoteName};

/// Diatonic interval number, unison (1) through octave (8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntervalNumber {
    Unison,
    Second,
    Third,
    Fourth,
    Fifth,
    Sixth,
    Seventh,
    Octave,
}

/// Numbers drawn during play. Unison and octave are excluded.
pub const PLAYABLE_NUMBERS: [IntervalNumber; 6] = [
    IntervalNumber::Second,
    IntervalNumber::Third,
    IntervalNumber::Fourth,
    IntervalNumber::Fifth,
    IntervalNumber::Sixth,
    IntervalNumber::Seventh,
];

/// Semitones for each number taken as perfect, indexed by number - 1.
/// Only 1, 4, 5 and 8 are authoritative here.
const PERFECT_SEMITONES: [i32; 8] = [0, 2, 4, 5, 7, 9, 11, 12];

/// Semitones for each number taken as major, indexed by number - 1.
/// Only 2, 3, 6 and 7 are authoritative here.
const MAJOR_SEMITONES: [i32; 8] = [0, 2, 4, 5, 7, 9, 11, 12];

impl IntervalNumber {
    pub const ALL: [IntervalNumber; 8] = [
        IntervalNumber::Unison,
        IntervalNumber::Second,
        IntervalNumber::Third,
        IntervalNumber::Fourth,
        IntervalNumber::Fifth,
        IntervalNumber::Sixth,
        IntervalNumber::Seventh,
        IntervalNumber::Octave,
    ];

    pub fn value(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.get((value as usize).checked_sub(1)?).copied()
    }

    /// 1, 4, 5 and 8 take perfect/augmented/diminished qualities
    pub fn is_perfect_class(self) -> bool {
        matches!(
            self,
            IntervalNumber::Unison
                | IntervalNumber::Fourth
                | IntervalNumber::Fifth
                | IntervalNumber::Octave
        )
    }

    /// The quality a bare number implies
    pub fn natural_quality(self) -> Quality {
        if self.is_perfect_class() {
            Quality::Perfect
        } else {
            Quality::Major
        }
    }

    fn perfect_semitones(self) -> i32 {
        PERFECT_SEMITONES[self as usize]
    }

    fn major_semitones(self) -> i32 {
        MAJOR_SEMITONES[self as usize]
    }

    /// Semitones of the natural (perfect or major) form of this number
    fn natural_semitones(self) -> i32 {
        if self.is_perfect_class() {
            self.perfect_semitones()
        } else {
            self.major_semitones()
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntervalNumber::Unison => "Unison",
            IntervalNumber::Second => "Second",
            IntervalNumber::Third => "Third",
            IntervalNumber::Fourth => "Fourth",
            IntervalNumber::Fifth => "Fifth",
            IntervalNumber::Sixth => "Sixth",
            IntervalNumber::Seventh => "Seventh",
            IntervalNumber::Octave => "Octave",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quality {
    Major,
    Minor,
    Perfect,
    Augmented,
    Diminished,
}

impl Quality {
    pub fn name(self) -> &'static str {
        match self {
            Quality::Major => "Major",
            Quality::Minor => "Minor",
            Quality::Perfect => "Perfect",
            Quality::Augmented => "Augmented",
            Quality::Diminished => "Diminished",
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Quality::Major => 'M',
            Quality::Minor => 'm',
            Quality::Perfect => 'P',
            Quality::Augmented => 'A',
            Quality::Diminished => 'd',
        }
    }

    fn from_symbol(c: char) -> Option<Self> {
        match c {
            'M' => Some(Quality::Major),
            'm' => Some(Quality::Minor),
            'P' => Some(Quality::Perfect),
            'A' => Some(Quality::Augmented),
            'd' => Some(Quality::Diminished),
            _ => None,
        }
    }
}

/// An interval number with an optional quality.
/// The quality is only left out at the easiest level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub number: IntervalNumber,
    pub quality: Option<Quality>,
}

impl Interval {
    pub fn new(number: IntervalNumber, quality: Quality) -> Self {
        Self {
            number,
            quality: Some(quality),
        }
    }

    pub fn generic(number: IntervalNumber) -> Self {
        Self {
            number,
            quality: None,
        }
    }

    /// Quality with the default filled in for generic intervals
    pub fn resolved_quality(&self) -> Quality {
        self.quality.unwrap_or_else(|| self.number.natural_quality())
    }

    /// Semitone displacement above the reference.
    /// Mismatched pairs (e.g. a major fifth) are not rejected; they fall back
    /// to the table entry for that number.
    pub fn semitones(&self) -> i32 {
        let number = self.number;
        match self.resolved_quality() {
            Quality::Perfect => number.perfect_semitones(),
            Quality::Major => number.major_semitones(),
            Quality::Minor => number.major_semitones() - 1,
            Quality::Augmented => number.natural_semitones() + 1,
            Quality::Diminished if number.is_perfect_class() => number.natural_semitones() - 1,
            Quality::Diminished => number.natural_semitones() - 2,
        }
    }

    /// Long display name, e.g. "Major Third", or "Third" when generic
    pub fn display_name(&self) -> String {
        match self.quality {
            Some(quality) => format!("{} {}", quality.name(), self.number.name()),
            None => self.number.name().to_string(),
        }
    }
}

impl fmt::Display for Interval {
    /// Short notation: `M3`, `P5`, or a bare `3`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(quality) = self.quality {
            write!(f, "{}", quality.symbol())?;
        }
        write!(f, "{}", self.number.value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIntervalError {
    #[error("empty interval")]
    Empty,
    #[error("unknown interval quality '{0}' (expected M, m, P, A or d)")]
    Quality(char),
    #[error("interval number must be 1-8, got '{0}'")]
    Number(String),
}

impl FromStr for Interval {
    type Err = ParseIntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let first = trimmed.chars().next().ok_or(ParseIntervalError::Empty)?;
        let (quality, digits) = if first.is_ascii_digit() {
            (None, trimmed)
        } else {
            let quality = Quality::from_symbol(first).ok_or(ParseIntervalError::Quality(first))?;
            (Some(quality), &trimmed[first.len_utf8()..])
        };
        let number = digits
            .parse::<u8>()
            .ok()
            .and_then(IntervalNumber::from_value)
            .ok_or_else(|| ParseIntervalError::Number(digits.to_string()))?;
        Ok(Interval { number, quality })
    }
}

/// Note reached by stacking `interval` above `reference`.
///
/// The result is spelled with flats when the reference sits on the flat side.
/// Octave bookkeeping is cosmetic: a reference without an octave yields a
/// result without one.
pub fn calculate_interval(reference: &Note, interval: &Interval) -> Note {
    let start = reference.pitch_class() as i32;
    let displacement = interval.semitones();
    let raw = start + displacement;
    let name = NoteName::spell_at(raw, reference.name.prefers_flats());

    let octave = reference.octave.map(|octave| {
        let mut octaves_up = if raw >= 12 { raw / 12 } else { 0 };
        if interval.number == IntervalNumber::Octave {
            octaves_up = octaves_up.max(1);
        }
        octave.saturating_add(octaves_up as u8)
    });

    Note { name, octave }
}

/// Random interval whose available qualities widen with the level.
pub fn generate_random_interval<R: Rng + ?Sized>(level: Level, rng: &mut R) -> Interval {
    let number = PLAYABLE_NUMBERS[rng.gen_range(0..PLAYABLE_NUMBERS.len())];

    if level == Level::One {
        return Interval::generic(number);
    }

    let qualities: &[Quality] = match (level, number.is_perfect_class()) {
        (Level::Two, true) => &[Quality::Perfect],
        (Level::Two, false) => &[Quality::Major, Quality::Minor],
        (_, true) => &[Quality::Perfect, Quality::Augmented, Quality::Diminished],
        (_, false) => &[
            Quality::Major,
            Quality::Minor,
            Quality::Augmented,
            Quality::Diminished,
        ],
    };
    Interval::new(number, qualities[rng.gen_range(0..qualities.len())])
}
