//! # Phrase
//!
//! One complete build of an input string: sanitized text, tokens, schedule,
//! total duration and the token-to-character map.
//!
//! A phrase is built fresh for every playback and never mutated afterwards.
//! The controller owns it for the lifetime of one run and drops it on stop or
//! replay, so nothing leaks from one run into the next.
//!
//! ## Token-to-Character Map
//! Built by walking the sanitized text and the token list in lockstep:
//! - Degree and chroma tokens map to the character that produced them
//! - Separators map to `None` (they do not move the highlight)
//! - A `0` consumed as `Rest` under the rest policy maps to `None`
//! - `+ # *` map to `None` unless the toy highlights control keys
//! - A `+` that produced no token is skipped without using a slot

use serde::Serialize;

use crate::config::ToyConfig;
use crate::lexer::{emits_token, is_separator, tokenize, Token, ZeroPolicy};
use crate::sanitize::sanitize_with;
use crate::schedule::{build_schedule, start_offsets, total_duration_ms, ScheduleItem};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Phrase {
    /// Sanitized text; `token_to_char` indexes its characters
    pub source_text: String,
    pub tokens: Vec<Token>,
    pub schedule: Vec<ScheduleItem>,
    pub total_duration_ms: f64,
    pub token_to_char: Vec<Option<usize>>,
    /// Start offset of each schedule item
    #[serde(skip)]
    pub starts_ms: Vec<f64>,
}

impl Phrase {
    /// Sanitize, tokenize and schedule `raw` for a toy
    pub fn build(raw: &str, config: &ToyConfig) -> Self {
        let source_text = sanitize_with(raw, &config.charset);
        let tokens = tokenize(&source_text, config.zero_policy);
        let schedule = build_schedule(&tokens, config.timing);
        let token_to_char = map_tokens_to_chars(&source_text, &tokens, config.zero_policy, config.highlight_controls);
        let starts_ms = start_offsets(&schedule);

        Self {
            total_duration_ms: total_duration_ms(&schedule),
            source_text,
            tokens,
            schedule,
            token_to_char,
            starts_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.schedule.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedule.is_empty()
    }

    /// Character index highlighted by a step, if any
    pub fn char_for_step(&self, step: usize) -> Option<usize> {
        self.token_to_char.get(step).copied().flatten()
    }
}

/// Map each token back to the index of the sanitized character that made it.
pub fn map_tokens_to_chars(
    sanitized: &str,
    tokens: &[Token],
    zero_policy: ZeroPolicy,
    highlight_controls: bool,
) -> Vec<Option<usize>> {
    let chars: Vec<char> = sanitized.chars().collect();
    let mut map = Vec::with_capacity(tokens.len());
    let mut cursor = 0;

    for token in tokens {
        // Skip characters that produced no token (a non-leading '+')
        while cursor < chars.len() && !emits_token(chars[cursor], cursor) {
            cursor += 1;
        }
        if cursor >= chars.len() {
            map.push(None);
            continue;
        }

        let c = chars[cursor];
        let slot = match token {
            Token::Degree { .. } | Token::Chroma { .. } => Some(cursor),
            Token::Rest => {
                debug_assert!(is_separator(c) || (c == '0' && zero_policy == ZeroPolicy::Rest));
                None
            }
            Token::Intro | Token::Resolve | Token::Toggle if highlight_controls => Some(cursor),
            Token::Intro | Token::Resolve | Token::Toggle => None,
        };
        map.push(slot);
        cursor += 1;
    }

    map
}
