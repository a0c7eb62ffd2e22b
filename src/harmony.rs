//! # Harmony Mapper
//!
//! Converts scale degrees and chromatic colors into concrete, register-bounded
//! pitches, and voices tokens as single notes, dyads or triads.
//!
//! ## Keys
//! - **Major**: tonic C, base register C4 (MIDI 60), degrees `[0, 2, 4, 5, 7, 9, 11]`
//! - **Minor**: tonic A, base register A3 (MIDI 57), degrees `[0, 2, 3, 5, 7, 8, 10]`
//!
//! Chromatic colors hang off the diatonic table: flat-two is one semitone below
//! degree 2, sharp-four one semitone above degree 4.
//!
//! ## Voicing
//! | Token                    | Voicing                                   |
//! |--------------------------|-------------------------------------------|
//! | letter `1`-`7`           | single note                               |
//! | letter `8`               | tonic + tonic an octave up                |
//! | letter `9`               | tonic + supertonic an octave up           |
//! | digit `1`-`7`            | diatonic triad on the degree              |
//! | digit `8`                | tonic triad, first inversion              |
//! | digit `9`                | supertonic triad, second inversion        |
//! | chroma                   | single note                               |
//!
//! Every pitch returned here lies in `MIN_PITCH..=MAX_PITCH`.
//!
//! ## Example
//! ```rust
//! use tonetoys::harmony::{degree_to_pitch, Key};
//!
//! assert_eq!(degree_to_pitch(1, Key::Major, false).midi(), 60); // C4
//! assert_eq!(degree_to_pitch(1, Key::Major, true).midi(), 72);  // C5
//! assert_eq!(degree_to_pitch(3, Key::Minor, false).label(), "C4");
//! ```

use serde::{Deserialize, Serialize};

use crate::lexer::{ChromaColor, Token};

/// Lowest playable note (C2)
pub const MIN_PITCH: u8 = 36;
/// Highest playable note (C6)
pub const MAX_PITCH: u8 = 84;
/// Register used when no candidate fits the window (C3)
pub const DEFAULT_REGISTER: u8 = 48;

const MAJOR_DEGREES: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR_DEGREES: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Tonal center of a toy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    #[default]
    Major,
    Minor,
}

impl Key {
    pub fn tonic_pitch_class(self) -> u8 {
        match self {
            Key::Major => 0,
            Key::Minor => 9,
        }
    }

    /// MIDI note of the tonic in the base register
    pub fn base_midi(self) -> u8 {
        match self {
            Key::Major => 60,
            Key::Minor => 57,
        }
    }

    fn degrees(self) -> &'static [u8; 7] {
        match self {
            Key::Major => &MAJOR_DEGREES,
            Key::Minor => &MINOR_DEGREES,
        }
    }

    /// Semitones above the tonic for a degree (1-7; other values wrap)
    pub fn degree_offset(self, degree: u8) -> u8 {
        self.degrees()[(degree.max(1) as usize - 1) % 7]
    }

    /// Semitones above the tonic for a chromatic color
    pub fn chroma_offset(self, color: ChromaColor) -> u8 {
        match color {
            ChromaColor::FlatTwo => (self.degree_offset(2) + 11) % 12,
            ChromaColor::SharpFour => (self.degree_offset(4) + 1) % 12,
        }
    }
}

/// A register-bounded MIDI note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
pub struct Pitch(u8);

impl Pitch {
    /// Wrap a MIDI note, folding it by octaves into the valid register
    pub fn folded(midi: i16) -> Self {
        let mut n = midi;
        while n > MAX_PITCH as i16 {
            n -= 12;
        }
        while n < MIN_PITCH as i16 {
            n += 12;
        }
        Pitch(n as u8)
    }

    pub fn midi(self) -> u8 {
        self.0
    }

    pub fn pitch_class(self) -> u8 {
        self.0 % 12
    }

    /// Scientific octave number (C4 = MIDI 60)
    pub fn octave(self) -> i8 {
        (self.0 / 12) as i8 - 1
    }

    /// Human-readable name such as `C4` or `F#3`
    pub fn label(self) -> String {
        format!("{}{}", NOTE_NAMES[self.pitch_class() as usize], self.octave())
    }

    /// Equal-tempered frequency in Hz (A4 = 440)
    pub fn frequency(self) -> f32 {
        440.0 * 2f32.powf((self.0 as f32 - 69.0) / 12.0)
    }
}

impl From<Pitch> for u8 {
    fn from(p: Pitch) -> u8 {
        p.0
    }
}

/// Place a semitone offset from the tonic into the register.
///
/// Searches `target ± 12` for the note of the right pitch class nearest to the
/// target that lies inside the register bound.
fn place(offset: u8, key: Key, octave_up: bool) -> Pitch {
    let base = key.base_midi() as i16 + if octave_up { 12 } else { 0 };
    let target = base + offset as i16;
    let pitch_class = (key.tonic_pitch_class() + offset) % 12;

    (target - 12..=target + 12)
        .filter(|n| n.rem_euclid(12) == pitch_class as i16)
        .filter(|n| (MIN_PITCH as i16..=MAX_PITCH as i16).contains(n))
        .min_by_key(|n| (n - target).abs())
        .map(|n| Pitch(n as u8))
        .unwrap_or(Pitch(DEFAULT_REGISTER + pitch_class))
}

/// Pitch for a scale degree (1-7) in a key
pub fn degree_to_pitch(degree: u8, key: Key, octave_up: bool) -> Pitch {
    place(key.degree_offset(degree), key, octave_up)
}

/// Pitch for a chromatic color in a key
pub fn chroma_to_pitch(color: ChromaColor, key: Key) -> Pitch {
    place(key.chroma_offset(color), key, false)
}

/// The note `steps` scale steps above `degree`, climbing an octave each time
/// the seven-degree cycle wraps.
pub fn scale_step(key: Key, degree: u8, steps: u8) -> Pitch {
    let index = (degree.max(1) - 1) as usize + steps as usize;
    let octaves = (index / 7) as i16;
    let offset = key.degrees()[index % 7] as i16;
    Pitch::folded(key.base_midi() as i16 + 12 * octaves + offset)
}

fn stack(key: Key, degree: u8, steps: &[u8]) -> Vec<Pitch> {
    steps.iter().map(|&s| scale_step(key, degree, s)).collect()
}

/// Voice a token as the pitches that sound together.
///
/// Returns an empty list for tokens that make no sound of their own.
pub fn voice_token(token: &Token, key: Key) -> Vec<Pitch> {
    match token {
        Token::Degree { value, source_char: Some(_), source_digit, .. } => match source_digit {
            '8' => vec![degree_to_pitch(1, key, false), degree_to_pitch(1, key, true)],
            '9' => vec![degree_to_pitch(1, key, false), degree_to_pitch(2, key, true)],
            _ => vec![degree_to_pitch(*value, key, false)],
        },
        Token::Degree { value, source_char: None, source_digit, .. } => match source_digit {
            // Tonic triad, first inversion: third, fifth, tonic above
            '8' => stack(key, 1, &[2, 4, 7]),
            // Supertonic triad, second inversion: fifth, root above, third above
            '9' => stack(key, 2, &[4, 7, 9]),
            _ => stack(key, *value, &[0, 2, 4]),
        },
        Token::Chroma { color, .. } => vec![chroma_to_pitch(*color, key)],
        _ => Vec::new(),
    }
}

/// Tonic, third and fifth of the key (the intro chord)
pub fn tonic_triad(key: Key) -> Vec<Pitch> {
    stack(key, 1, &[0, 2, 4])
}

/// Fifth then tonic (the resolve cadence)
pub fn cadence(key: Key) -> Vec<Pitch> {
    vec![scale_step(key, 1, 4), degree_to_pitch(1, key, false)]
}
