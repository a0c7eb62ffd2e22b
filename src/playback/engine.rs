//! Note event planning
//!
//! Turns a built [`Phrase`] into the list of [`NoteEvent`]s the audio engine
//! schedules. Planning is pure: the same phrase, key and zero policy always
//! produce the same events.

use crate::harmony::{cadence, tonic_triad, voice_token, Key};
use crate::lexer::{Token, ZeroPolicy};
use crate::phrase::Phrase;
use super::types::{EnvelopeKind, NoteEvent};

/// Spacing between the notes of the intro arpeggio
pub const INTRO_STAGGER_MS: f64 = 60.0;

/// Gap between the two notes of the resolve cadence
pub const RESOLVE_GAP_MS: f64 = 120.0;

/// Plan the audible events of a phrase
///
/// Each schedule item yields at most one event, starting at the item's offset:
/// - `Intro` sounds the tonic triad as a quick arpeggio
/// - `Resolve` sounds fifth then tonic
/// - Chromatic tokens under the ticks policy use the short tick envelope
/// - Degrees and other chromatic tokens use their voiced pitches
/// - `Rest` and `Toggle` produce nothing
///
/// # Example
/// ```rust
/// use tonetoys::config::ToyConfig;
/// use tonetoys::phrase::Phrase;
/// use tonetoys::playback::plan_events;
///
/// let config = ToyConfig::default();
/// let phrase = Phrase::build("1 2", &config);
/// let events = plan_events(&phrase, config.key, config.zero_policy);
///
/// // The separator is silent
/// assert_eq!(events.len(), 2);
/// assert_eq!(events[1].step, 2);
/// ```
pub fn plan_events(phrase: &Phrase, key: Key, zero_policy: ZeroPolicy) -> Vec<NoteEvent> {
    phrase
        .schedule
        .iter()
        .zip(&phrase.starts_ms)
        .enumerate()
        .filter_map(|(step, (item, &offset_ms))| {
            let (pitches, stagger_ms, envelope) = match &item.token {
                Token::Intro => (tonic_triad(key), INTRO_STAGGER_MS, EnvelopeKind::Normal),
                Token::Resolve => (cadence(key), RESOLVE_GAP_MS, EnvelopeKind::Normal),
                Token::Chroma { .. } if zero_policy == ZeroPolicy::Ticks => {
                    (voice_token(&item.token, key), 0.0, EnvelopeKind::Tick)
                }
                token => (voice_token(token, key), 0.0, EnvelopeKind::Normal),
            };
            if pitches.is_empty() {
                return None;
            }
            Some(NoteEvent {
                step,
                offset_ms,
                pitches,
                stagger_ms,
                envelope,
            })
        })
        .collect()
}
