//! Audio scheduling
//!
//! [`AudioEngine`] places a phrase's note events on the audio clock of an
//! [`AudioContext`]. Every voice of a run is computed up front from one anchor
//! time `t0`, so note timing never depends on how often the frame loop runs.
//!
//! Voices whose sample is not loaded yet wait in a pending list and are started
//! by [`AudioEngine::pump`] once the buffer arrives. A buffer that arrives after
//! its voice should already have started is dropped; the note is skipped rather
//! than played late.

use std::sync::Arc;

use tracing::{debug, trace};

use super::context::{AudioContext, ContextState};
use super::engine::plan_events;
use super::mixer::{SampleBuffer, Voice};
use super::samples::{BufferCache, LoadState};
use super::types::{Envelope, RunId};
use crate::config::ToyConfig;
use crate::error::ToyError;
use crate::harmony::Pitch;
use crate::phrase::Phrase;

/// A voice waiting for its sample
#[derive(Debug, Clone)]
struct PendingVoice {
    run: RunId,
    pitch: Pitch,
    start_at: f64,
    envelope: Envelope,
    gain: f32,
}

/// Per-voice gain for a chord of `n` notes
pub fn chord_gain(n: usize) -> f32 {
    0.5 / (n.max(1) as f32).sqrt()
}

pub struct AudioEngine<C: AudioContext> {
    context: C,
    cache: BufferCache,
    pending: Vec<PendingVoice>,
    next_run: u64,
}

impl<C: AudioContext> AudioEngine<C> {
    pub fn new(context: C, cache: BufferCache) -> Self {
        Self {
            context,
            cache,
            pending: Vec::new(),
            next_run: 1,
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn cache(&self) -> &BufferCache {
        &self.cache
    }

    /// Fresh id for a run; unique for the lifetime of the engine
    pub fn allocate_run(&mut self) -> RunId {
        let id = RunId(self.next_run);
        self.next_run += 1;
        id
    }

    /// Audio clock in seconds
    pub fn now(&self) -> f64 {
        self.context.current_time()
    }

    /// Make sure the output is running
    ///
    /// Fails with [`ToyError::AudioBlocked`] when the platform keeps the
    /// context suspended.
    pub fn unlock(&mut self) -> Result<(), ToyError> {
        match self.context.state() {
            ContextState::Running => Ok(()),
            ContextState::Closed => Err(ToyError::ContextClosed),
            ContextState::Suspended => match self.context.resume() {
                ContextState::Running => Ok(()),
                ContextState::Closed => Err(ToyError::ContextClosed),
                ContextState::Suspended => Err(ToyError::AudioBlocked),
            },
        }
    }

    /// Schedule every note of a phrase and return the anchor time `t0`
    ///
    /// Step `i` sounds at `t0 + starts_ms[i] / 1000`, where
    /// `t0 = now + latency`.
    pub fn schedule_run(&mut self, run: RunId, phrase: &Phrase, config: &ToyConfig) -> Result<f64, ToyError> {
        let t0 = self.now() + config.latency_ms / 1000.0;
        let events = plan_events(phrase, config.key, config.zero_policy);
        debug!(run = run.0, events = events.len(), t0, "scheduling run");

        for event in &events {
            let envelope = Envelope::for_kind(event.envelope);
            let gain = chord_gain(event.pitches.len());
            for (i, &pitch) in event.pitches.iter().enumerate() {
                let start_at = t0 + (event.offset_ms + i as f64 * event.stagger_ms) / 1000.0;
                let voice = PendingVoice { run, pitch, start_at, envelope, gain };
                match self.cache.request(pitch) {
                    Some(buffer) => self.start(voice, buffer)?,
                    None => self.pending.push(voice),
                }
            }
        }

        Ok(t0)
    }

    fn start(&mut self, voice: PendingVoice, buffer: Arc<SampleBuffer>) -> Result<(), ToyError> {
        self.context.play(Voice {
            run: voice.run,
            buffer,
            start_at: voice.start_at,
            envelope: voice.envelope,
            gain: voice.gain,
        })
    }

    /// Collect finished loads and start the pending voices they unblock
    ///
    /// Returns the number of voices started. Pending voices are dropped when
    /// their load failed, when their start time has passed, or when the
    /// context has closed.
    pub fn pump(&mut self) -> usize {
        self.cache.drain();
        if self.pending.is_empty() {
            return 0;
        }

        let now = self.now();
        let closed = self.context.state() == ContextState::Closed;
        let mut started = 0;

        for voice in std::mem::take(&mut self.pending) {
            if closed {
                continue;
            }
            let label = voice.pitch.label();
            match self.cache.state(&label) {
                LoadState::Ready => {
                    if voice.start_at < now {
                        trace!(%label, start_at = voice.start_at, now, "dropping late voice");
                        continue;
                    }
                    if let Some(buffer) = self.cache.get(&label) {
                        if self.start(voice, buffer).is_ok() {
                            started += 1;
                        }
                    }
                }
                LoadState::Failed => {
                    trace!(%label, "dropping voice without sample");
                }
                LoadState::Loading | LoadState::Missing => self.pending.push(voice),
            }
        }

        started
    }

    /// Silence a run: sounding voices stop and pending ones are forgotten
    pub fn cancel_run(&mut self, run: RunId) {
        self.pending.retain(|v| v.run != run);
        self.context.silence_run(run);
    }

    /// Voices still waiting for a sample
    pub fn pending_voices(&self) -> usize {
        self.pending.len()
    }

    /// Start loading samples ahead of time
    pub fn preload(&mut self, pitches: impl IntoIterator<Item = Pitch>) {
        for pitch in pitches {
            self.cache.request(pitch);
        }
    }

    /// Close the output and stop the loader
    pub fn shutdown(mut self) {
        self.pending.clear();
        self.context.close();
        self.cache.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmony::{tonic_triad, Key};
    use crate::playback::context::OfflineContext;
    use crate::playback::samples::SynthSamples;

    fn engine() -> AudioEngine<OfflineContext> {
        let cache = BufferCache::inline(Arc::new(SynthSamples::new(8_000)));
        AudioEngine::new(OfflineContext::new(8_000), cache)
    }

    #[test]
    fn test_unlock_resumes_context() {
        let mut engine = engine();
        assert_eq!(engine.context().state(), ContextState::Suspended);
        engine.unlock().unwrap();
        assert_eq!(engine.context().state(), ContextState::Running);
    }

    #[test]
    fn test_unlock_blocked() {
        let cache = BufferCache::inline(Arc::new(SynthSamples::new(8_000)));
        let mut engine = AudioEngine::new(OfflineContext::blocked(8_000), cache);
        assert_eq!(engine.unlock(), Err(ToyError::AudioBlocked));
    }

    #[test]
    fn test_anchor_includes_latency() {
        let mut engine = engine();
        engine.unlock().unwrap();
        engine.context_mut().advance(1.0);
        let config = ToyConfig::default();
        let phrase = Phrase::build("1", &config);
        let t0 = engine.schedule_run(RunId(1), &phrase, &config).unwrap();
        assert!((t0 - 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_voices_wait_for_samples() {
        let mut engine = engine();
        engine.unlock().unwrap();
        let config = ToyConfig::default();
        // Two digit triads
        let phrase = Phrase::build("13", &config);
        engine.schedule_run(RunId(1), &phrase, &config).unwrap();
        assert_eq!(engine.pending_voices(), 6);
        assert_eq!(engine.pump(), 6);
        assert_eq!(engine.context().voices_played(), 6);
    }

    #[test]
    fn test_waiting_voice_keeps_its_start_time() {
        let mut engine = engine();
        engine.unlock().unwrap();
        let config = ToyConfig::default();
        let phrase = Phrase::build("1", &config);
        engine.schedule_run(RunId(1), &phrase, &config).unwrap();
        assert_eq!(engine.pump(), 3);

        // t0 = 50 ms = frame 400 at 8 kHz
        engine.context_mut().advance(0.045);
        assert_eq!(engine.context().peak(), 0.0);
        engine.context_mut().advance(0.1);
        assert!(engine.context().peak() > 0.0);

        let first = engine.context().rendered().iter().position(|s| *s != 0.0).unwrap();
        assert!((400..480).contains(&first), "first sound at frame {}", first);
    }

    #[test]
    fn test_closed_context_drops_waiting_voices() {
        let mut engine = engine();
        engine.unlock().unwrap();
        let config = ToyConfig::default();
        let phrase = Phrase::build("12", &config);
        engine.schedule_run(RunId(1), &phrase, &config).unwrap();
        assert!(engine.pending_voices() > 0);

        engine.context_mut().close();
        assert_eq!(engine.pump(), 0);
        assert_eq!(engine.pending_voices(), 0);
        assert_eq!(engine.context().voices_played(), 0);
    }

    #[test]
    fn test_preloaded_samples_play_immediately() {
        let mut engine = engine();
        engine.unlock().unwrap();
        engine.preload(tonic_triad(Key::Major));
        engine.pump();
        let config = ToyConfig::default();
        let phrase = Phrase::build("1", &config);
        engine.schedule_run(RunId(1), &phrase, &config).unwrap();
        assert_eq!(engine.pending_voices(), 0);
        assert_eq!(engine.context().voices_played(), 3);
    }

    #[test]
    fn test_late_buffer_is_dropped() {
        let mut engine = engine();
        engine.unlock().unwrap();
        let config = ToyConfig::default();
        let phrase = Phrase::build("1", &config);
        engine.schedule_run(RunId(1), &phrase, &config).unwrap();
        // Past the note's start before the load is collected
        engine.context_mut().advance(0.2);
        assert_eq!(engine.pump(), 0);
        assert_eq!(engine.pending_voices(), 0);
        assert_eq!(engine.context().voices_played(), 0);
    }

    #[test]
    fn test_cancel_forgets_pending_voices() {
        let mut engine = engine();
        engine.unlock().unwrap();
        let config = ToyConfig::default();
        let phrase = Phrase::build("123", &config);
        engine.schedule_run(RunId(4), &phrase, &config).unwrap();
        engine.cancel_run(RunId(4));
        assert_eq!(engine.pending_voices(), 0);
        assert_eq!(engine.pump(), 0);
    }

    #[test]
    fn test_chord_gain_scales_down() {
        assert_eq!(chord_gain(1), 0.5);
        assert!(chord_gain(3) < chord_gain(2));
    }
}
