//! Audio output contexts
//!
//! An [`AudioContext`] is the single source of truth for time. It owns the
//! clock that both note scheduling and the visual frame loop read, and it
//! can be suspended (platform blocks sound before a user gesture), running,
//! or closed.
//!
//! [`OfflineContext`] renders into memory on a manual clock. It is used by
//! tests, by the CLI dry run, and anywhere no sound device is available.

use super::mixer::{Mixer, Voice};
use super::types::RunId;
use crate::error::ToyError;

/// Lifecycle of an output context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

pub trait AudioContext {
    fn state(&self) -> ContextState;

    /// Ask the platform to start the output. Returns the state afterwards,
    /// which stays `Suspended` when sound is blocked.
    fn resume(&mut self) -> ContextState;

    /// Audio clock in seconds; does not move while suspended
    fn current_time(&self) -> f64;

    /// Schedule a voice at `voice.start_at` on the audio clock
    fn play(&mut self, voice: Voice) -> Result<(), ToyError>;

    /// Stop and forget every voice of a run
    fn silence_run(&mut self, run: RunId);

    fn close(&mut self);
}

/// In-memory context with a manually advanced clock
#[derive(Debug)]
pub struct OfflineContext {
    mixer: Mixer,
    state: ContextState,
    sound_allowed: bool,
    output: Vec<f32>,
    voices_played: usize,
}

impl OfflineContext {
    /// A context that starts suspended and runs once resumed
    pub fn new(sample_rate: u32) -> Self {
        Self {
            mixer: Mixer::new(sample_rate),
            state: ContextState::Suspended,
            sound_allowed: true,
            output: Vec::new(),
            voices_played: 0,
        }
    }

    /// A context whose resume is refused until [`OfflineContext::allow_sound`]
    pub fn blocked(sample_rate: u32) -> Self {
        Self {
            sound_allowed: false,
            ..Self::new(sample_rate)
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    /// Simulate the user gesture that lifts an autoplay block
    pub fn allow_sound(&mut self) {
        self.sound_allowed = true;
    }

    /// Render `seconds` of audio and move the clock forward (no-op unless running)
    pub fn advance(&mut self, seconds: f64) {
        if self.state != ContextState::Running || seconds <= 0.0 {
            return;
        }
        let frames = (seconds * self.mixer.sample_rate() as f64).round() as usize;
        let start = self.output.len();
        self.output.resize(start + frames, 0.0);
        self.mixer.render(&mut self.output[start..], 1);
    }

    /// Everything rendered so far (mono)
    pub fn rendered(&self) -> &[f32] {
        &self.output
    }

    /// Hand over everything rendered since the last call
    pub fn take_rendered(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.output)
    }

    pub fn peak(&self) -> f32 {
        self.output.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// Voices accepted by [`AudioContext::play`] since creation
    pub fn voices_played(&self) -> usize {
        self.voices_played
    }

    /// Voices still scheduled or sounding
    pub fn active_voices(&self) -> usize {
        self.mixer.voice_count()
    }
}

impl AudioContext for OfflineContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> ContextState {
        if self.state == ContextState::Suspended && self.sound_allowed {
            self.state = ContextState::Running;
        }
        self.state
    }

    fn current_time(&self) -> f64 {
        self.mixer.current_time()
    }

    fn play(&mut self, voice: Voice) -> Result<(), ToyError> {
        if self.state == ContextState::Closed {
            return Err(ToyError::ContextClosed);
        }
        self.mixer.add(voice);
        self.voices_played += 1;
        Ok(())
    }

    fn silence_run(&mut self, run: RunId) {
        self.mixer.silence_run(run);
    }

    fn close(&mut self) {
        self.mixer.clear();
        self.state = ContextState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::mixer::SampleBuffer;
    use crate::playback::types::{Envelope, EnvelopeKind};
    use std::sync::Arc;

    #[test]
    fn test_clock_frozen_while_suspended() {
        let mut ctx = OfflineContext::new(1_000);
        ctx.advance(1.0);
        assert_eq!(ctx.current_time(), 0.0);
        assert_eq!(ctx.resume(), ContextState::Running);
        ctx.advance(0.5);
        assert_eq!(ctx.current_time(), 0.5);
        assert_eq!(ctx.rendered().len(), 500);
        assert_eq!(ctx.take_rendered().len(), 500);
        assert!(ctx.rendered().is_empty());
        assert_eq!(ctx.current_time(), 0.5);
    }

    #[test]
    fn test_blocked_until_allowed() {
        let mut ctx = OfflineContext::blocked(1_000);
        assert_eq!(ctx.resume(), ContextState::Suspended);
        ctx.allow_sound();
        assert_eq!(ctx.resume(), ContextState::Running);
    }

    #[test]
    fn test_closed_context_rejects_voices() {
        let mut ctx = OfflineContext::new(1_000);
        ctx.close();
        assert_eq!(ctx.resume(), ContextState::Closed);
        let voice = Voice {
            run: RunId(1),
            buffer: Arc::new(SampleBuffer::new(1_000, vec![0.5; 10])),
            start_at: 0.0,
            envelope: Envelope::for_kind(EnvelopeKind::Tick),
            gain: 1.0,
        };
        assert_eq!(ctx.play(voice), Err(ToyError::ContextClosed));
    }
}
