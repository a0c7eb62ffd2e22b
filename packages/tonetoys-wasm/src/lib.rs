use std::sync::Arc;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use tonetoys::playback::{
    sample_paths, AudioEngine, BufferCache, OfflineContext, PlaybackController, PlaybackObserver, PlaybackState,
    SynthSamples, TrailPoint,
};
use tonetoys::{ToyConfig, ToyError, PRESET_NAMES};

#[derive(Serialize)]
struct ToyErrorJson {
    kind: &'static str,
    message: String,
}

fn error_to_json(e: &ToyError) -> ToyErrorJson {
    let kind = match e {
        ToyError::AudioBlocked => "audio-blocked",
        ToyError::AlreadyPlaying => "already-playing",
        ToyError::Config(_) => "config",
        ToyError::UnknownToy(_) => "unknown-toy",
        ToyError::SampleLoad { .. } => "sample-load",
        ToyError::Output(_) => "output",
        ToyError::ContextClosed => "context-closed",
    };
    ToyErrorJson {
        kind,
        message: e.to_string(),
    }
}

fn to_js_error(e: ToyError) -> JsValue {
    match serde_json::to_string(&error_to_json(&e)) {
        Ok(json) => JsValue::from_str(&json),
        Err(_) => JsValue::from_str(&e.to_string()),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn load_config(toy: &str, yaml: Option<String>) -> Result<ToyConfig, JsValue> {
    match yaml {
        Some(yaml) => ToyConfig::from_yaml(&yaml).map_err(to_js_error),
        None => ToyConfig::preset(toy).map_err(to_js_error),
    }
}

/// Sanitized text for a toy's allow-list
#[wasm_bindgen]
pub fn sanitize(text: &str, toy: &str) -> Result<String, JsValue> {
    let config = ToyConfig::preset(toy).map_err(to_js_error)?;
    Ok(tonetoys::sanitize::sanitize_with(text, &config.charset))
}

/// Build a phrase and return it as JSON (tokens, schedule, character map)
#[wasm_bindgen]
pub fn build_phrase(text: &str, toy: &str, yaml: Option<String>) -> Result<String, JsValue> {
    let config = load_config(toy, yaml)?;
    to_json(&tonetoys::Phrase::build(text, &config))
}

/// Note events for a phrase as JSON
#[wasm_bindgen]
pub fn plan_events(text: &str, toy: &str, yaml: Option<String>) -> Result<String, JsValue> {
    let config = load_config(toy, yaml)?;
    let phrase = tonetoys::Phrase::build(text, &config);
    to_json(&tonetoys::plan_events(&phrase, config.key, config.zero_policy))
}

/// Sample URLs a phrase needs, in first-use order, as a JSON array
#[wasm_bindgen]
pub fn sample_urls(text: &str, toy: &str, yaml: Option<String>) -> Result<String, JsValue> {
    let config = load_config(toy, yaml)?;
    let phrase = tonetoys::Phrase::build(text, &config);
    let events = tonetoys::plan_events(&phrase, config.key, config.zero_policy);
    to_json(&sample_paths(&config.samples, &events))
}

/// Every built-in preset as a JS object keyed by name
#[wasm_bindgen]
pub fn presets() -> Result<JsValue, JsValue> {
    let configs: Vec<ToyConfig> = PRESET_NAMES
        .iter()
        .map(|name| ToyConfig::preset(name))
        .collect::<Result<_, _>>()
        .map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&configs).map_err(JsValue::from)
}

/// Visual updates gathered during one frame
#[derive(Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameReport {
    state: Option<PlaybackState>,
    highlights: Vec<usize>,
    trail: Vec<TrailPoint>,
    progress: Option<f64>,
    done: bool,
}

impl PlaybackObserver for FrameReport {
    fn on_char(&mut self, index: usize) {
        self.highlights.push(index);
    }

    fn on_progress(&mut self, fraction: f64) {
        self.progress = Some(fraction);
    }

    fn on_trail(&mut self, point: &TrailPoint) {
        self.trail.push(*point);
    }

    fn on_done(&mut self) {
        self.done = true;
    }
}

/// One toy on a page
///
/// The page's audio worklet pulls sample blocks with `render`, which also
/// drives the clock; the animation loop calls `frame` and applies the
/// returned visual updates.
#[wasm_bindgen]
pub struct ToyPlayer {
    engine: AudioEngine<OfflineContext>,
    toy: PlaybackController,
}

#[wasm_bindgen]
impl ToyPlayer {
    #[wasm_bindgen(constructor)]
    pub fn new(toy: &str, yaml: Option<String>, sample_rate: u32) -> Result<ToyPlayer, JsValue> {
        let config = load_config(toy, yaml)?;
        let cache = BufferCache::inline(Arc::new(SynthSamples::new(sample_rate)));
        // Pages block sound until a click
        let engine = AudioEngine::new(OfflineContext::blocked(sample_rate), cache);
        Ok(ToyPlayer {
            engine,
            toy: PlaybackController::new(config),
        })
    }

    /// Call from a user gesture handler
    pub fn allow_sound(&mut self) {
        self.engine.context_mut().allow_sound();
    }

    pub fn start(&mut self, text: &str) -> Result<(), JsValue> {
        self.toy.start(&mut self.engine, text).map_err(to_js_error)
    }

    pub fn start_auto(&mut self, text: &str, now_ms: f64) -> Result<(), JsValue> {
        self.toy.start_auto(&mut self.engine, text, now_ms).map_err(to_js_error)
    }

    pub fn replay(&mut self) -> Result<(), JsValue> {
        self.toy.replay(&mut self.engine).map_err(to_js_error)
    }

    pub fn stop(&mut self) {
        self.toy.stop(&mut self.engine);
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.toy.on_visibility_change(&mut self.engine, hidden);
    }

    /// Run one animation frame; returns the visual updates as JSON
    pub fn frame(&mut self, now_ms: f64) -> Result<String, JsValue> {
        let mut report = FrameReport::default();
        let state = self
            .toy
            .frame(&mut self.engine, now_ms, &mut report)
            .map_err(to_js_error)?;
        report.state = Some(state);
        to_json(&report)
    }

    /// Render the next `frames` mono samples
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let context = self.engine.context_mut();
        let rate = context.sample_rate();
        context.advance(frames as f64 / rate as f64);
        context.take_rendered()
    }
}
