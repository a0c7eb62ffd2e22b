//! Integration tests for tonetoys
//!
//! Tests the full pipeline from raw text to scheduled notes and synchronized
//! visual callbacks.

use std::sync::Arc;

use tonetoys::playback::{
    AudioEngine, BufferCache, OfflineContext, PlaybackController, PlaybackObserver, PlaybackState, SynthSamples,
};
use tonetoys::{build_phrase, build_phrase_from_yaml, plan, ChromaColor, Token, ToyConfig, ToyError, PRESET_NAMES};

#[derive(Default)]
struct Highlights(Vec<usize>);

impl PlaybackObserver for Highlights {
    fn on_char(&mut self, index: usize) {
        self.0.push(index);
    }
}

/// Play `text` to completion on an offline context; returns highlights and peak level
fn play_through(config: ToyConfig, text: &str) -> (Vec<usize>, f32) {
    let cache = BufferCache::inline(Arc::new(SynthSamples::new(8_000)));
    let mut engine = AudioEngine::new(OfflineContext::new(8_000), cache);
    let mut toy = PlaybackController::new(config);
    let mut highlights = Highlights::default();

    toy.start(&mut engine, text).unwrap();
    let mut frame_ms = 0.0;
    while toy.frame(&mut engine, frame_ms, &mut highlights).unwrap() == PlaybackState::Playing {
        engine.context_mut().advance(0.02);
        frame_ms += 20.0;
    }
    assert_eq!(toy.state(), PlaybackState::Done);

    let peak = engine.context().peak();
    engine.shutdown();
    (highlights.0, peak)
}

#[test]
fn test_date_phrase_end_to_end() {
    let phrase = build_phrase("2025-03-14", "date-harmony").unwrap();
    assert_eq!(phrase.source_text, "2025-03-14");
    assert_eq!(phrase.tokens.len(), 10);
    assert_eq!(phrase.tokens[1], Token::Chroma { color: ChromaColor::FlatTwo, source_char: None });
    assert_eq!(phrase.tokens[5], Token::Chroma { color: ChromaColor::SharpFour, source_char: None });
    assert_eq!(phrase.token_to_char.len(), phrase.tokens.len());
    assert_eq!(phrase.char_for_step(4), None);

    let (highlights, peak) = play_through(ToyConfig::preset("date-harmony").unwrap(), "2025-03-14");
    assert_eq!(highlights, vec![0, 1, 2, 3, 5, 6, 8, 9]);
    assert!(peak > 0.0);
}

#[test]
fn test_phone_number_with_controls() {
    let phrase = build_phrase("+1 555 0100#", "phone-melody").unwrap();
    assert_eq!(phrase.tokens.first(), Some(&Token::Intro));
    assert_eq!(phrase.tokens.last(), Some(&Token::Resolve));
    // Controls move the highlight for this toy
    assert_eq!(phrase.char_for_step(0), Some(0));
    assert_eq!(phrase.char_for_step(phrase.len() - 1), Some(11));
}

#[test]
fn test_words_become_letter_notes() {
    let phrase = build_phrase("hello!", "daily-phrase").unwrap();
    assert_eq!(phrase.source_text, "HELLO");
    assert!(phrase.tokens.iter().all(Token::is_letter_derived));

    let events = plan("hello", "daily-phrase").unwrap();
    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| e.pitches.len() == 1));
}

#[test]
fn test_calendar_rests_on_zero() {
    let phrase = build_phrase("10", "calendar").unwrap();
    assert_eq!(phrase.tokens[1], Token::Rest);
    assert_eq!(phrase.token_to_char, vec![Some(0), None]);
}

#[test]
fn test_every_preset_plays_to_completion() {
    for name in PRESET_NAMES {
        let config = ToyConfig::preset(name).unwrap();
        let (highlights, _) = play_through(config, "2024 12 31");
        assert!(!highlights.is_empty(), "{} produced no highlights", name);
        assert!(highlights.windows(2).all(|w| w[0] <= w[1]), "{} highlighted out of order", name);
    }
}

#[test]
fn test_yaml_toy() {
    let yaml = r#"
base: phone-melody
key: calm
timing: digit-runs
step-ms: 200
"#;
    let phrase = build_phrase_from_yaml("123", yaml).unwrap();
    // One three-digit run lasts 1.25 steps
    assert!((phrase.total_duration_ms - 250.0).abs() < 1e-9);
}

#[test]
fn test_unknown_toy() {
    assert!(matches!(build_phrase("1", "theremin"), Err(ToyError::UnknownToy(_))));
}

#[test]
fn test_noise_is_not_an_error() {
    let phrase = build_phrase("¿¡ 😀 !!", "postcard").unwrap();
    assert!(phrase.tokens.iter().all(|t| !t.is_audible()));
    let (highlights, peak) = play_through(ToyConfig::preset("postcard").unwrap(), "¿¡ 😀 !!");
    assert!(highlights.is_empty());
    assert_eq!(peak, 0.0);
}

#[test]
fn test_phrases_are_deterministic() {
    let a = build_phrase("Call 555-0199 on 2025/01/02", "postcard").unwrap();
    let b = build_phrase("Call 555-0199 on 2025/01/02", "postcard").unwrap();
    assert_eq!(a, b);
}
