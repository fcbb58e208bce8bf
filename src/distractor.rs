//! Wrong-answer options drawn from the circle of fifths.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::game::Level;
use crate::note::{Note, NoteName};

/// Cycle of fifths from C, then the flat side reached by fourths.
/// Fourteen names, twelve distinct pitch classes.
const DISTRACTOR_POOL: [NoteName; 14] = [
    NoteName::C,
    NoteName::G,
    NoteName::D,
    NoteName::A,
    NoteName::E,
    NoteName::B,
    NoteName::FSharp,
    NoteName::CSharp,
    NoteName::F,
    NoteName::BFlat,
    NoteName::EFlat,
    NoteName::AFlat,
    NoteName::DFlat,
    NoteName::GFlat,
];

/// Number of distractors shown alongside the correct answer
pub fn distractor_count(level: Level) -> usize {
    match level {
        Level::One | Level::Two => 3,
        Level::Three => 4,
        Level::Four => 5,
    }
}

/// Build the option set: the correct answer plus up to `count` distractors,
/// all with distinct pitch classes, in random order.
///
/// Distractors are spelled the way the correct answer is (flats after a
/// flat-side reference) and share its octave, so neither gives it away.
/// The pool is walked once; if it runs dry the set is returned short.
pub fn generate_wrong_options<R: Rng + ?Sized>(
    reference: &Note,
    correct: &Note,
    count: usize,
    rng: &mut R,
) -> Vec<Note> {
    let prefer_flats = reference.name.prefers_flats();
    let mut options = vec![*correct];

    let mut pool = DISTRACTOR_POOL;
    pool.shuffle(rng);

    for name in pool {
        if options.len() >= count + 1 {
            break;
        }
        if options.iter().any(|o| o.pitch_class() == name.pitch_class()) {
            continue;
        }
        options.push(Note {
            name: NoteName::spell_at(name.pitch_class() as i32, prefer_flats),
            octave: correct.octave,
        });
    }

    if options.len() < count + 1 {
        log::error!(
            "distractor pool exhausted: wanted {} options, built {}",
            count + 1,
            options.len()
        );
    }

    options.shuffle(rng);
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_counts_by_level() {
        assert_eq!(distractor_count(Level::One), 3);
        assert_eq!(distractor_count(Level::Two), 3);
        assert_eq!(distractor_count(Level::Three), 4);
        assert_eq!(distractor_count(Level::Four), 5);
    }

    #[test]
    fn test_options_are_distinct_and_contain_answer_once() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let reference = Note::random(&mut rng);
            let correct = Note::random(&mut rng);
            for count in 1..=5 {
                let options = generate_wrong_options(&reference, &correct, count, &mut rng);
                assert_eq!(options.len(), count + 1);

                let classes: HashSet<u8> = options.iter().map(Note::pitch_class).collect();
                assert_eq!(classes.len(), options.len());

                let matches = options.iter().filter(|o| o.same_pitch_class(&correct)).count();
                assert_eq!(matches, 1);
                assert!(options.contains(&correct));
            }
        }
    }

    #[test]
    fn test_oversized_request_terminates() {
        let mut rng = StdRng::seed_from_u64(5);
        let c = Note::new(NoteName::C, 4);
        let options = generate_wrong_options(&c, &c, 20, &mut rng);
        assert_eq!(options.len(), 12);
    }

    #[test]
    fn test_distractors_follow_reference_spelling() {
        let mut rng = StdRng::seed_from_u64(9);
        let reference = Note::new(NoteName::F, 4);
        let correct = Note::new(NoteName::BFlat, 4);
        for _ in 0..50 {
            let options = generate_wrong_options(&reference, &correct, 5, &mut rng);
            for option in options {
                assert!(!option.name.as_str().contains('#'), "{}", option);
                assert_eq!(option.octave, Some(4));
            }
        }
    }

    #[test]
    fn test_answer_position_varies() {
        let mut rng = StdRng::seed_from_u64(1);
        let c = Note::new(NoteName::C, 4);
        let e = Note::new(NoteName::E, 4);
        let positions: HashSet<usize> = (0..100)
            .map(|_| {
                let options = generate_wrong_options(&c, &e, 3, &mut rng);
                options.iter().position(|o| *o == e).unwrap()
            })
            .collect();
        assert!(positions.len() > 1);
    }
}
