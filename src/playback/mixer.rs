//! Software mixer
//!
//! Sums scheduled voices into an output buffer and owns the audio clock: time
//! is the number of frames rendered so far divided by the sample rate. Both
//! the offline context and the device context render through it, so the clock
//! only moves when audio is actually produced.

use std::sync::Arc;

use super::types::{Envelope, RunId};

/// A decoded, mono note sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl SampleBuffer {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self { sample_rate, samples }
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Linearly interpolated sample `t` seconds into the buffer
    pub fn sample_at(&self, t: f64) -> f32 {
        if t < 0.0 || self.samples.is_empty() {
            return 0.0;
        }
        let pos = t * self.sample_rate as f64;
        let i = pos.floor() as usize;
        let frac = (pos - pos.floor()) as f32;
        match (self.samples.get(i), self.samples.get(i + 1)) {
            (Some(a), Some(b)) => a + (b - a) * frac,
            (Some(a), None) => *a,
            _ => 0.0,
        }
    }
}

/// A note scheduled on the output
#[derive(Debug, Clone)]
pub struct Voice {
    pub run: RunId,
    pub buffer: Arc<SampleBuffer>,
    /// Start time on the audio clock, in seconds
    pub start_at: f64,
    pub envelope: Envelope,
    pub gain: f32,
}

impl Voice {
    fn end_at(&self) -> f64 {
        self.start_at + self.envelope.end.min(self.buffer.duration())
    }

    fn sample(&self, t: f64) -> f32 {
        let local = t - self.start_at;
        self.buffer.sample_at(local) * self.envelope.gain_at(local) * self.gain
    }
}

#[derive(Debug)]
pub struct Mixer {
    sample_rate: u32,
    frames: u64,
    voices: Vec<Voice>,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frames: 0,
            voices: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Audio clock in seconds
    pub fn current_time(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn add(&mut self, voice: Voice) {
        self.voices.push(voice);
    }

    /// Drop every voice belonging to a run, sounding or not yet started
    pub fn silence_run(&mut self, run: RunId) {
        self.voices.retain(|v| v.run != run);
    }

    pub fn clear(&mut self) {
        self.voices.clear();
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Render interleaved frames into `out` and advance the clock
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for (i, frame) in out.chunks_mut(channels).enumerate() {
            let t = (self.frames + i as u64) as f64 / self.sample_rate as f64;
            let mixed: f32 = self
                .voices
                .iter()
                .filter(|v| t >= v.start_at && t < v.end_at())
                .map(|v| v.sample(t))
                .sum();
            frame.fill(mixed.clamp(-1.0, 1.0));
        }
        self.frames += (out.len() / channels) as u64;

        let now = self.current_time();
        self.voices.retain(|v| v.end_at() > now);
    }
}
