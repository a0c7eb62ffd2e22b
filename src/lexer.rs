//! # Tokenizer
//!
//! Turns sanitized text into musical tokens.
//!
//! ## Rules (left to right)
//! - Separators (space, `-`, `,`, `:`, `/`, `.`) become `Rest`
//! - `+` at the very start becomes `Intro`; any later `+` emits nothing
//! - `#` becomes `Resolve`, `*` becomes `Toggle`
//! - Letters go through the phone keypad (`ABC=2` ... `WXYZ=9`) and are then
//!   handled as that digit, keeping the letter in `source_char`
//! - `1`-`7` are scale degrees, `8` loops to the tonic an octave up, `9` to
//!   the supertonic an octave up
//! - `0` depends on the [`ZeroPolicy`]
//!
//! ## Zero Alternation
//! Under `Chromatic` and `Ticks`, successive zeros alternate between the two
//! chromatic colors, always starting from `FlatTwo`. The alternation flag is a
//! local of each [`tokenize`] call, so the function is pure.
//!
//! ## Example
//! ```rust
//! use tonetoys::lexer::{tokenize, ChromaColor, Token, ZeroPolicy};
//!
//! let tokens = tokenize("2025", ZeroPolicy::Chromatic);
//! assert_eq!(tokens[1], Token::Chroma { color: ChromaColor::FlatTwo, source_char: None });
//! ```

use serde::{Deserialize, Serialize};

/// How a literal `0` is tokenized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroPolicy {
    /// Sustained chromatic color tone
    #[default]
    Chromatic,
    /// Short percussive chromatic accent
    Ticks,
    /// Silence
    Rest,
}

/// The two non-diatonic colors used to voice zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChromaColor {
    FlatTwo,
    SharpFour,
}

impl ChromaColor {
    fn other(self) -> Self {
        match self {
            ChromaColor::FlatTwo => ChromaColor::SharpFour,
            ChromaColor::SharpFour => ChromaColor::FlatTwo,
        }
    }
}

/// A musical token produced from one source character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Token {
    Rest,
    #[serde(rename_all = "camelCase")]
    Degree {
        value: u8,
        octave_up: bool,
        source_char: Option<char>,
        source_digit: char,
    },
    #[serde(rename_all = "camelCase")]
    Chroma {
        color: ChromaColor,
        source_char: Option<char>,
    },
    Intro,
    Resolve,
    Toggle,
}

impl Token {
    /// Degree and chroma tokens make sound and move the visuals
    pub fn is_audible(&self) -> bool {
        matches!(self, Token::Degree { .. } | Token::Chroma { .. })
    }

    /// True for tokens that came from a typed letter rather than a digit
    pub fn is_letter_derived(&self) -> bool {
        match self {
            Token::Degree { source_char, .. } | Token::Chroma { source_char, .. } => source_char.is_some(),
            _ => false,
        }
    }

    /// Audible tokens typed as digits (the ones digit-run compression groups)
    pub fn is_digit_derived(&self) -> bool {
        self.is_audible() && !self.is_letter_derived()
    }

    pub fn is_control(&self) -> bool {
        matches!(self, Token::Intro | Token::Resolve | Token::Toggle)
    }
}

/// Characters that become a `Rest`
pub fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '-' | ',' | ':' | '/' | '.')
}

/// Phone keypad letter groups (keys 2-9; 0 and 1 carry no letters)
pub fn keypad_digit(letter: char) -> Option<char> {
    let digit = match letter.to_ascii_uppercase() {
        'A' | 'B' | 'C' => '2',
        'D' | 'E' | 'F' => '3',
        'G' | 'H' | 'I' => '4',
        'J' | 'K' | 'L' => '5',
        'M' | 'N' | 'O' => '6',
        'P' | 'Q' | 'R' | 'S' => '7',
        'T' | 'U' | 'V' => '8',
        'W' | 'X' | 'Y' | 'Z' => '9',
        _ => return None,
    };
    Some(digit)
}

/// Tokenize sanitized text.
///
/// Every character produces at most one token; only a non-leading `+` and
/// characters outside the grammar produce none.
pub fn tokenize(sanitized: &str, zero_policy: ZeroPolicy) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(sanitized.len());
    let mut next_color = ChromaColor::FlatTwo;

    for (i, c) in sanitized.chars().enumerate() {
        let token = match c {
            c if is_separator(c) => Some(Token::Rest),
            '+' if i == 0 => Some(Token::Intro),
            '+' => None,
            '#' => Some(Token::Resolve),
            '*' => Some(Token::Toggle),
            c if c.is_ascii_alphabetic() => {
                keypad_digit(c).and_then(|d| digit_token(d, Some(c), zero_policy, &mut next_color))
            }
            c if c.is_ascii_digit() => digit_token(c, None, zero_policy, &mut next_color),
            _ => None,
        };
        if let Some(token) = token {
            tokens.push(token);
        }
    }

    tokens
}

/// Whether a sanitized character yields a token at position `index`
pub(crate) fn emits_token(c: char, index: usize) -> bool {
    match c {
        '+' => index == 0,
        '#' | '*' => true,
        c => is_separator(c) || c.is_ascii_digit() || keypad_digit(c).is_some(),
    }
}

fn digit_token(
    digit: char,
    source_char: Option<char>,
    zero_policy: ZeroPolicy,
    next_color: &mut ChromaColor,
) -> Option<Token> {
    let (value, octave_up) = match digit {
        '0' => {
            return Some(match zero_policy {
                ZeroPolicy::Rest => Token::Rest,
                ZeroPolicy::Chromatic | ZeroPolicy::Ticks => {
                    let color = *next_color;
                    *next_color = color.other();
                    Token::Chroma { color, source_char }
                }
            });
        }
        '8' => (1, true),
        '9' => (2, true),
        d => (d.to_digit(10)? as u8, false),
    };

    Some(Token::Degree {
        value,
        octave_up,
        source_char,
        source_digit: digit,
    })
}
