//! Playback type definitions
//!
//! This module defines the types shared by the audio scheduler, the visual
//! sync driver and the playback controller.

use serde::Serialize;

use super::trail::TrailPoint;
use crate::harmony::Pitch;

/// Controller state
///
/// Audio scheduling and visual callbacks only happen while `Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing scheduled
    Idle,
    /// Silent lead-in before unattended playback
    Priming,
    /// A phrase is sounding and the frame loop is driving visuals
    Playing,
    /// The last phrase finished naturally
    Done,
}

/// Identifies one run so its voices can be silenced on cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RunId(pub u64);

/// Envelope shape for a scheduled note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// Sustained tone for degrees, triads and cues
    Normal,
    /// Short percussive accent for zeros under the ticks policy
    Tick,
}

/// Gain envelope, times in seconds from the note start
///
/// Linear attack to `peak`, flat sustain, then an exponential release that
/// reaches `RELEASE_FLOOR` at `end` and is silent afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack: f64,
    pub release_start: f64,
    pub end: f64,
    pub peak: f32,
}

const RELEASE_FLOOR: f32 = 0.001;

impl Envelope {
    pub fn for_kind(kind: EnvelopeKind) -> Self {
        match kind {
            EnvelopeKind::Normal => Self {
                attack: 0.010,
                release_start: 0.190,
                end: 0.260,
                peak: 0.8,
            },
            EnvelopeKind::Tick => Self {
                attack: 0.006,
                release_start: 0.050,
                end: 0.100,
                peak: 0.6,
            },
        }
    }

    /// Gain `t` seconds after the note started
    pub fn gain_at(&self, t: f64) -> f32 {
        if t < 0.0 || t >= self.end {
            0.0
        } else if t < self.attack {
            self.peak * (t / self.attack) as f32
        } else if t < self.release_start {
            self.peak
        } else {
            let fraction = ((t - self.release_start) / (self.end - self.release_start)) as f32;
            self.peak * (RELEASE_FLOOR / self.peak).powf(fraction)
        }
    }
}

/// One audible event of a phrase: the pitches of a token and when they sound
///
/// Pitch `i` starts at `offset_ms + i * stagger_ms` (zero stagger means a
/// block chord).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub step: usize,
    pub offset_ms: f64,
    pub pitches: Vec<Pitch>,
    pub stagger_ms: f64,
    pub envelope: EnvelopeKind,
}

/// What the UI is currently showing
///
/// The neutral state is no highlight, an empty trail and zero progress.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VisualState {
    pub highlight: Option<usize>,
    pub trail: Vec<TrailPoint>,
    pub progress: f64,
}

impl VisualState {
    pub fn reset(&mut self) {
        self.highlight = None;
        self.trail.clear();
        self.progress = 0.0;
    }

    pub fn is_neutral(&self) -> bool {
        self.highlight.is_none() && self.trail.is_empty() && self.progress == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_envelope_shape() {
        let env = Envelope::for_kind(EnvelopeKind::Normal);
        assert_eq!(env.gain_at(-0.001), 0.0);
        assert!((env.gain_at(0.005) - 0.4).abs() < 1e-4);
        assert_eq!(env.gain_at(0.1), 0.8);
        assert!(env.gain_at(0.25) < 0.01);
        assert_eq!(env.gain_at(0.26), 0.0);
    }

    #[test]
    fn test_tick_envelope_is_short() {
        let env = Envelope::for_kind(EnvelopeKind::Tick);
        assert!(env.gain_at(0.02) > 0.0);
        assert_eq!(env.gain_at(0.1), 0.0);
        assert!(env.end < Envelope::for_kind(EnvelopeKind::Normal).end);
    }

    #[test]
    fn test_release_is_monotonic() {
        let env = Envelope::for_kind(EnvelopeKind::Normal);
        let mut last = env.gain_at(env.release_start);
        let mut t = env.release_start;
        while t < env.end {
            let g = env.gain_at(t);
            assert!(g <= last);
            last = g;
            t += 0.005;
        }
    }

    #[test]
    fn test_visual_reset() {
        let mut visual = VisualState { highlight: Some(3), trail: Vec::new(), progress: 0.5 };
        assert!(!visual.is_neutral());
        visual.reset();
        assert!(visual.is_neutral());
    }
}
