pub mod config;
pub mod error;
pub mod harmony;
pub mod lexer;
pub mod phrase;
pub mod playback;
pub mod sanitize;
pub mod schedule;

pub use config::{SampleConfig, ToyConfig, PRESET_NAMES};
pub use error::*;
pub use harmony::{Key, Pitch};
pub use lexer::{tokenize, ChromaColor, Token, ZeroPolicy};
pub use phrase::Phrase;
pub use playback::{plan_events, NoteEvent, PlaybackController, PlaybackState};
pub use sanitize::{sanitize, CharSet};
pub use schedule::{ScheduleItem, StepTiming};

/// Build the phrase a named toy would play for `text`.
/// This is the main entry point for the library.
pub fn build_phrase(text: &str, toy: &str) -> Result<Phrase, ToyError> {
    let config = ToyConfig::preset(toy)?;
    Ok(Phrase::build(text, &config))
}

/// Build a phrase from a YAML toy configuration
pub fn build_phrase_from_yaml(text: &str, yaml: &str) -> Result<Phrase, ToyError> {
    let config = ToyConfig::from_yaml(yaml)?;
    Ok(Phrase::build(text, &config))
}

/// Every note a named toy would play for `text`, with offsets from the first step
pub fn plan(text: &str, toy: &str) -> Result<Vec<NoteEvent>, ToyError> {
    let config = ToyConfig::preset(toy)?;
    let phrase = Phrase::build(text, &config);
    Ok(plan_events(&phrase, config.key, config.zero_policy))
}
