//! Playback controller
//!
//! One controller drives one toy: it owns the toy's configuration, the active
//! phrase and the visual state, and talks to a shared [`AudioEngine`].
//!
//! ## Lifecycle
//! ```text
//! Idle ──start──▶ Playing ──(total + tail)──▶ Done ──replay──▶ Playing
//!  │                 ▲
//!  └──start_auto──▶ Priming ──(priming elapsed)──┘
//! ```
//! `stop` (or a cancel request seen at the top of a frame) returns any state
//! to `Idle` with the run's voices silenced and the visuals reset.
//!
//! ## Frame Loop
//! The host calls [`PlaybackController::frame`] once per display frame. Every
//! visual decision is made from the audio clock, never from the frame rate,
//! so slow or dropped frames only delay callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::audio::AudioEngine;
use super::context::AudioContext;
use super::engine::plan_events;
use super::sync::SyncCursor;
use super::trail::{trail_point, TrailPoint};
use super::types::{PlaybackState, RunId, VisualState};
use crate::config::ToyConfig;
use crate::error::ToyError;
use crate::phrase::Phrase;

/// Receives visual updates from the frame loop
pub trait PlaybackObserver {
    /// A character of the sanitized text became the current highlight
    fn on_char(&mut self, _index: usize) {}

    /// Fraction of the phrase played, `0.0..=1.0`
    fn on_progress(&mut self, _fraction: f64) {}

    fn on_trail(&mut self, _point: &TrailPoint) {}

    fn on_done(&mut self) {}
}

impl PlaybackObserver for () {}

/// Shared flag that asks a controller to stop at its next frame
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct ActiveRun {
    id: RunId,
    phrase: Phrase,
    cursor: SyncCursor,
    /// Audio clock time of step 0, once scheduled
    anchor: Option<f64>,
    /// Frame time at which priming ends
    priming_deadline_ms: Option<f64>,
}

#[derive(Debug)]
pub struct PlaybackController {
    config: ToyConfig,
    state: PlaybackState,
    run: Option<ActiveRun>,
    last_text: Option<String>,
    visual: VisualState,
    cancel: CancelHandle,
}

impl PlaybackController {
    pub fn new(config: ToyConfig) -> Self {
        Self {
            config,
            state: PlaybackState::Idle,
            run: None,
            last_text: None,
            visual: VisualState::default(),
            cancel: CancelHandle::default(),
        }
    }

    pub fn config(&self) -> &ToyConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn visual(&self) -> &VisualState {
        &self.visual
    }

    /// Phrase of the active run
    pub fn phrase(&self) -> Option<&Phrase> {
        self.run.as_ref().map(|run| &run.phrase)
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn is_active(&self) -> bool {
        matches!(self.state, PlaybackState::Playing | PlaybackState::Priming)
    }

    /// Silence the current run and return to a neutral display
    fn halt<C: AudioContext>(&mut self, engine: &mut AudioEngine<C>) {
        if let Some(run) = self.run.take() {
            debug!(toy = %self.config.name, run = run.id.0, "halting run");
            engine.cancel_run(run.id);
        }
        self.visual.reset();
    }

    fn prepare<C: AudioContext>(&mut self, engine: &mut AudioEngine<C>, text: &str) -> ActiveRun {
        self.cancel.clear();
        let phrase = Phrase::build(text, &self.config);
        let id = engine.allocate_run();
        self.last_text = Some(text.to_string());
        ActiveRun {
            id,
            cursor: SyncCursor::new(phrase.starts_ms.clone()),
            phrase,
            anchor: None,
            priming_deadline_ms: None,
        }
    }

    fn schedule<C: AudioContext>(&mut self, engine: &mut AudioEngine<C>, mut run: ActiveRun) -> Result<(), ToyError> {
        match engine.schedule_run(run.id, &run.phrase, &self.config) {
            Ok(t0) => {
                run.anchor = Some(t0);
                run.priming_deadline_ms = None;
                self.run = Some(run);
                self.state = PlaybackState::Playing;
                Ok(())
            }
            Err(e) => {
                engine.cancel_run(run.id);
                self.state = PlaybackState::Idle;
                Err(e)
            }
        }
    }

    /// Start playing `text` in response to a user gesture
    ///
    /// # Errors
    /// - [`ToyError::AlreadyPlaying`] while a run is playing or priming
    /// - [`ToyError::AudioBlocked`] if the output cannot be started
    pub fn start<C: AudioContext>(&mut self, engine: &mut AudioEngine<C>, text: &str) -> Result<(), ToyError> {
        if self.is_active() {
            return Err(ToyError::AlreadyPlaying);
        }
        engine.unlock()?;
        self.halt(engine);

        let run = self.prepare(engine, text);
        debug!(toy = %self.config.name, run = run.id.0, steps = run.phrase.len(), "starting run");
        self.schedule(engine, run)
    }

    /// Start `text` without a user gesture, after a silent priming delay
    ///
    /// Samples for the phrase are requested immediately so they are ready
    /// when priming ends. Whether audio may start is only known then, so a
    /// blocked output is reported by [`PlaybackController::frame`].
    pub fn start_auto<C: AudioContext>(
        &mut self,
        engine: &mut AudioEngine<C>,
        text: &str,
        now_ms: f64,
    ) -> Result<(), ToyError> {
        if self.is_active() {
            return Err(ToyError::AlreadyPlaying);
        }
        self.halt(engine);

        let mut run = self.prepare(engine, text);
        let events = plan_events(&run.phrase, self.config.key, self.config.zero_policy);
        engine.preload(events.into_iter().flat_map(|e| e.pitches));
        run.priming_deadline_ms = Some(now_ms + self.config.priming_ms);
        debug!(toy = %self.config.name, run = run.id.0, "priming run");

        self.run = Some(run);
        self.state = PlaybackState::Priming;
        Ok(())
    }

    /// Play the last text again from the beginning
    pub fn replay<C: AudioContext>(&mut self, engine: &mut AudioEngine<C>) -> Result<(), ToyError> {
        match self.last_text.clone() {
            Some(text) => self.start(engine, &text),
            None => Ok(()),
        }
    }

    /// Stop immediately; always succeeds
    pub fn stop<C: AudioContext>(&mut self, engine: &mut AudioEngine<C>) {
        self.cancel.cancel();
        self.halt(engine);
        self.state = PlaybackState::Idle;
    }

    /// Hidden toys stop playing
    pub fn on_visibility_change<C: AudioContext>(&mut self, engine: &mut AudioEngine<C>, hidden: bool) {
        if hidden && self.is_active() {
            self.stop(engine);
        }
    }

    /// Advance one display frame
    ///
    /// `frame_ms` is the host's frame timestamp; it only times priming.
    /// Returns the state after the frame.
    pub fn frame<C: AudioContext>(
        &mut self,
        engine: &mut AudioEngine<C>,
        frame_ms: f64,
        observer: &mut dyn PlaybackObserver,
    ) -> Result<PlaybackState, ToyError> {
        if self.cancel.is_cancelled() {
            self.cancel.clear();
            if self.is_active() {
                self.halt(engine);
                self.state = PlaybackState::Idle;
            }
            return Ok(self.state);
        }

        engine.pump();

        match self.state {
            PlaybackState::Priming => self.frame_priming(engine, frame_ms),
            PlaybackState::Playing => Ok(self.frame_playing(engine, observer)),
            state => Ok(state),
        }
    }

    fn frame_priming<C: AudioContext>(
        &mut self,
        engine: &mut AudioEngine<C>,
        frame_ms: f64,
    ) -> Result<PlaybackState, ToyError> {
        let due = match &self.run {
            Some(run) => run.priming_deadline_ms.map_or(true, |deadline| frame_ms >= deadline),
            None => true,
        };
        if !due {
            return Ok(PlaybackState::Priming);
        }

        if let Err(e) = engine.unlock() {
            debug!(toy = %self.config.name, error = %e, "priming ended without audio");
            self.halt(engine);
            self.state = PlaybackState::Idle;
            return Err(e);
        }

        match self.run.take() {
            Some(run) => {
                self.schedule(engine, run)?;
                Ok(self.state)
            }
            None => {
                self.state = PlaybackState::Idle;
                Ok(self.state)
            }
        }
    }

    fn frame_playing<C: AudioContext>(
        &mut self,
        engine: &mut AudioEngine<C>,
        observer: &mut dyn PlaybackObserver,
    ) -> PlaybackState {
        let Some(run) = self.run.as_mut() else {
            self.state = PlaybackState::Idle;
            return self.state;
        };
        let Some(t0) = run.anchor else {
            return self.state;
        };

        let elapsed_ms = (engine.now() - t0) * 1000.0;
        for step in run.cursor.advance(elapsed_ms) {
            if let Some(index) = run.phrase.char_for_step(step) {
                self.visual.highlight = Some(index);
                observer.on_char(index);
            }
            if self.config.trail.draws_points() {
                let point = run
                    .phrase
                    .schedule
                    .get(step)
                    .and_then(|item| trail_point(step, &item.token, self.config.key));
                if let Some(point) = point {
                    self.visual.trail.push(point);
                    observer.on_trail(&point);
                }
            }
        }

        let total = run.phrase.total_duration_ms;
        let progress = if total <= 0.0 {
            1.0
        } else {
            (elapsed_ms / total).clamp(0.0, 1.0)
        };
        self.visual.progress = progress;
        observer.on_progress(progress);

        if run.cursor.is_finished() && elapsed_ms >= total + self.config.tail_ms {
            debug!(toy = %self.config.name, run = run.id.0, steps = run.cursor.processed(), "run complete");
            self.run = None;
            self.state = PlaybackState::Done;
            observer.on_done();
        }

        self.state
    }
}
