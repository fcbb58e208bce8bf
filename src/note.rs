//! Note spellings and the pitch classes they name.
//!
//! Seventeen spellings cover the naturals plus one sharp and one flat name for
//! each black key. Spellings are only for display: correctness is always
//! decided on pitch class.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use thiserror::Error;

/// Note spellings (naturals, sharps and flats)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteName {
    C,
    CSharp,
    DFlat,
    D,
    DSharp,
    EFlat,
    E,
    F,
    FSharp,
    GFlat,
    G,
    GSharp,
    AFlat,
    A,
    ASharp,
    BFlat,
    B,
}

/// A pitch class modulo the octave (0 = C, 11 = B)
pub type PitchClass = u8;

const SHARP_SPELLINGS: [NoteName; 12] = [
    NoteName::C,
    NoteName::CSharp,
    NoteName::D,
    NoteName::DSharp,
    NoteName::E,
    NoteName::F,
    NoteName::FSharp,
    NoteName::G,
    NoteName::GSharp,
    NoteName::A,
    NoteName::ASharp,
    NoteName::B,
];

const FLAT_SPELLINGS: [NoteName; 12] = [
    NoteName::C,
    NoteName::DFlat,
    NoteName::D,
    NoteName::EFlat,
    NoteName::E,
    NoteName::F,
    NoteName::GFlat,
    NoteName::G,
    NoteName::AFlat,
    NoteName::A,
    NoteName::BFlat,
    NoteName::B,
];

/// Tonics on the flat side of the circle of fifths.
const FLAT_SIDE: [NoteName; 6] = [
    NoteName::F,
    NoteName::BFlat,
    NoteName::EFlat,
    NoteName::AFlat,
    NoteName::DFlat,
    NoteName::GFlat,
];

impl NoteName {
    pub const ALL: [NoteName; 17] = [
        NoteName::C,
        NoteName::CSharp,
        NoteName::DFlat,
        NoteName::D,
        NoteName::DSharp,
        NoteName::EFlat,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::GFlat,
        NoteName::G,
        NoteName::GSharp,
        NoteName::AFlat,
        NoteName::A,
        NoteName::ASharp,
        NoteName::BFlat,
        NoteName::B,
    ];

    /// Pitch class within an octave (C=0, B=11). Enharmonic spellings collide.
    pub fn pitch_class(self) -> PitchClass {
        match self {
            NoteName::C => 0,
            NoteName::CSharp | NoteName::DFlat => 1,
            NoteName::D => 2,
            NoteName::DSharp | NoteName::EFlat => 3,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::FSharp | NoteName::GFlat => 6,
            NoteName::G => 7,
            NoteName::GSharp | NoteName::AFlat => 8,
            NoteName::A => 9,
            NoteName::ASharp | NoteName::BFlat => 10,
            NoteName::B => 11,
        }
    }

    /// Spell a pitch class with sharps or flats. Any integer is reduced mod 12.
    pub fn spell_at(pitch_class: i32, prefer_flats: bool) -> NoteName {
        let index = pitch_class.rem_euclid(12) as usize;
        if prefer_flats {
            FLAT_SPELLINGS[index]
        } else {
            SHARP_SPELLINGS[index]
        }
    }

    /// Whether results computed from this reference should be spelled with flats.
    pub fn prefers_flats(self) -> bool {
        FLAT_SIDE.contains(&self)
    }

    /// MIDI note number given an octave. Middle C (C4) = MIDI 60
    pub fn to_midi(self, octave: u8) -> u8 {
        (octave + 1) * 12 + self.pitch_class()
    }

    /// Frequency in Hz (A4 = 440 Hz)
    pub fn to_freq(self, octave: u8) -> f64 {
        let midi = self.to_midi(octave) as f64;
        440.0 * 2.0_f64.powf((midi - 69.0) / 12.0)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::DFlat => "Db",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::EFlat => "Eb",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::GFlat => "Gb",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::AFlat => "Ab",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::BFlat => "Bb",
            NoteName::B => "B",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseNoteError {
    #[error("empty note")]
    Empty,
    #[error("unknown note letter '{0}'")]
    Letter(char),
    #[error("'{0}' is not one of the playable spellings")]
    Spelling(String),
    #[error("invalid octave '{0}'")]
    Octave(String),
}

impl FromStr for NoteName {
    type Err = ParseNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let letter = chars.next().ok_or(ParseNoteError::Empty)?;
        let accidental: String = chars.collect();
        let natural = match letter.to_ascii_uppercase() {
            'C' => NoteName::C,
            'D' => NoteName::D,
            'E' => NoteName::E,
            'F' => NoteName::F,
            'G' => NoteName::G,
            'A' => NoteName::A,
            'B' => NoteName::B,
            other => return Err(ParseNoteError::Letter(other)),
        };
        let spelled = match accidental.as_str() {
            "" => return Ok(natural),
            "#" => NoteName::spell_at(natural.pitch_class() as i32 + 1, false),
            "b" => NoteName::spell_at(natural.pitch_class() as i32 - 1, true),
            _ => return Err(ParseNoteError::Spelling(s.trim().to_string())),
        };
        // E#, B#, Fb and Cb fall outside the 17 spellings
        if spelled.as_str().len() == 1 {
            return Err(ParseNoteError::Spelling(s.trim().to_string()));
        }
        Ok(spelled)
    }
}

/// A spelled note with an optional display octave.
/// The octave only matters for audio and display, never for correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    pub name: NoteName,
    pub octave: Option<u8>,
}

/// Octaves reference notes are drawn from
pub const REFERENCE_OCTAVES: [u8; 3] = [3, 4, 5];

/// Octave used for playback when a note carries none
pub const DEFAULT_OCTAVE: u8 = 4;

impl Note {
    pub fn new(name: NoteName, octave: u8) -> Self {
        Self {
            name,
            octave: Some(octave),
        }
    }

    pub fn pitch_class(&self) -> PitchClass {
        self.name.pitch_class()
    }

    /// Enharmonic equality: same pitch class, spelling and octave ignored
    pub fn same_pitch_class(&self, other: &Note) -> bool {
        self.pitch_class() == other.pitch_class()
    }

    pub fn to_freq(&self) -> f64 {
        self.name.to_freq(self.octave.unwrap_or(DEFAULT_OCTAVE))
    }

    /// A uniformly random spelling in one of the reference octaves
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let name = NoteName::ALL[rng.gen_range(0..NoteName::ALL.len())];
        let octave = REFERENCE_OCTAVES[rng.gen_range(0..REFERENCE_OCTAVES.len())];
        Note::new(name, octave)
    }
}

impl From<NoteName> for Note {
    fn from(name: NoteName) -> Self {
        Self { name, octave: None }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.octave {
            Some(octave) => write!(f, "{}{}", self.name, octave),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for Note {
    type Err = ParseNoteError;

    /// Parse `C`, `f#`, `Eb4`. A trailing digit run is the octave.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (name, octave) = trimmed.split_at(split);
        let name: NoteName = name.parse()?;
        let octave = if octave.is_empty() {
            None
        } else {
            let value: u8 = octave
                .parse()
                .map_err(|_| ParseNoteError::Octave(octave.to_string()))?;
            if value > 8 {
                return Err(ParseNoteError::Octave(octave.to_string()));
            }
            Some(value)
        };
        Ok(Note { name, octave })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_middle_c_midi() {
        assert_eq!(NoteName::C.to_midi(4), 60);
    }

    #[test]
    fn test_a4_frequency() {
        let freq = NoteName::A.to_freq(4);
        assert!((freq - 440.0).abs() < 0.01);
    }

    #[test]
    fn test_enharmonics_share_pitch_class() {
        assert_eq!(NoteName::CSharp.pitch_class(), 1);
        assert_eq!(NoteName::DFlat.pitch_class(), 1);
        assert_eq!(NoteName::GFlat.pitch_class(), NoteName::FSharp.pitch_class());
        assert_eq!(NoteName::B.pitch_class(), 11);
    }

    #[test]
    fn test_spell_at_tables() {
        assert_eq!(NoteName::spell_at(1, false), NoteName::CSharp);
        assert_eq!(NoteName::spell_at(1, true), NoteName::DFlat);
        assert_eq!(NoteName::spell_at(7, true), NoteName::G);
        assert_eq!(NoteName::spell_at(-1, false), NoteName::B);
        assert_eq!(NoteName::spell_at(14, true), NoteName::D);
    }

    #[test]
    fn test_respelling_is_idempotent() {
        for prefer_flats in [false, true] {
            for pc in 0..12 {
                let once = NoteName::spell_at(pc, prefer_flats);
                let twice = NoteName::spell_at(once.pitch_class() as i32, prefer_flats);
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn test_flat_side() {
        assert!(NoteName::F.prefers_flats());
        assert!(NoteName::BFlat.prefers_flats());
        assert!(NoteName::GFlat.prefers_flats());
        assert!(!NoteName::C.prefers_flats());
        assert!(!NoteName::FSharp.prefers_flats());
        assert!(!NoteName::B.prefers_flats());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("C".parse::<NoteName>(), Ok(NoteName::C));
        assert_eq!("c#".parse::<NoteName>(), Ok(NoteName::CSharp));
        assert_eq!("Bb".parse::<NoteName>(), Ok(NoteName::BFlat));
        assert_eq!("bb".parse::<NoteName>(), Ok(NoteName::BFlat));
        assert!(matches!("E#".parse::<NoteName>(), Err(ParseNoteError::Spelling(_))));
        assert!(matches!("Cb".parse::<NoteName>(), Err(ParseNoteError::Spelling(_))));
        assert_eq!("H".parse::<NoteName>(), Err(ParseNoteError::Letter('H')));
    }

    #[test]
    fn test_parse_note_with_octave() {
        assert_eq!("Eb4".parse::<Note>(), Ok(Note::new(NoteName::EFlat, 4)));
        assert_eq!("g".parse::<Note>(), Ok(Note::from(NoteName::G)));
        assert!("A9".parse::<Note>().is_err());
    }

    #[test]
    fn test_display_round_trips_every_spelling() {
        for name in NoteName::ALL {
            assert_eq!(name.to_string().parse::<NoteName>(), Ok(name));
        }
        assert_eq!(Note::new(NoteName::ASharp, 3).to_string(), "A#3");
    }

    #[test]
    fn test_random_note_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let note = Note::random(&mut rng);
            assert!(REFERENCE_OCTAVES.contains(&note.octave.unwrap()));
        }
    }
}
