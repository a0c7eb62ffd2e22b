//! # Playback Module
//!
//! Turn a phrase into sound and keep the UI in step with it.
//!
//! ## Purpose
//! A built [`Phrase`](crate::phrase::Phrase) is only data. This module:
//! 1. **Schedules audio** - every note of a run is placed on the audio clock
//!    from a single anchor time
//! 2. **Drives visuals** - a frame loop reads the same clock and reports the
//!    highlighted character, trail points and progress
//! 3. **Controls runs** - start, unattended start with priming, stop, replay
//!
//! ## Sub-modules
//! - `types` - PlaybackState, Envelope, NoteEvent, VisualState
//! - `engine` - Note event planning (intro arpeggio, resolve cadence, ticks)
//! - `mixer` - Sample buffers, voices and the software mixer
//! - `context` - AudioContext trait and the in-memory OfflineContext
//! - `device` - cpal-backed DeviceContext (feature `device`)
//! - `samples` - Sample sources and the shared buffer cache
//! - `audio` - AudioEngine: scheduling, pending voices, cancellation
//! - `sync` - Monotonic step cursor
//! - `trail` - 12-spoke trail geometry
//! - `controller` - PlaybackController and the observer callbacks
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tonetoys::config::ToyConfig;
//! use tonetoys::playback::{
//!     AudioEngine, BufferCache, OfflineContext, PlaybackController, PlaybackState, SynthSamples,
//! };
//!
//! let cache = BufferCache::inline(Arc::new(SynthSamples::new(8_000)));
//! let mut engine = AudioEngine::new(OfflineContext::new(8_000), cache);
//! let mut toy = PlaybackController::new(ToyConfig::preset("date-harmony").unwrap());
//!
//! toy.start(&mut engine, "2025").unwrap();
//! let mut frame_ms = 0.0;
//! while toy.frame(&mut engine, frame_ms, &mut ()).unwrap() == PlaybackState::Playing {
//!     engine.context_mut().advance(1.0 / 60.0);
//!     frame_ms += 1000.0 / 60.0;
//! }
//!
//! assert_eq!(toy.state(), PlaybackState::Done);
//! ```
//!
//! ## Timing
//! Step `i` sounds at `t0 + starts_ms[i] / 1000` where `t0` is the audio
//! clock at scheduling time plus the toy's latency. The frame loop computes
//! `elapsed = (now - t0) * 1000` and never counts frames, so frame drops delay
//! visual callbacks without reordering or skipping them.
//!
//! ## Related Modules
//! - `phrase` - Builds the schedule and character map consumed here
//! - `harmony` - Voices tokens into pitches
//! - `config` - Latency, tail, priming and trail style per toy

mod types;
mod engine;
mod mixer;
mod context;
#[cfg(feature = "device")]
mod device;
mod samples;
mod audio;
mod sync;
mod trail;
mod controller;


pub use types::{Envelope, EnvelopeKind, NoteEvent, PlaybackState, RunId, VisualState};
pub use engine::{plan_events, INTRO_STAGGER_MS, RESOLVE_GAP_MS};
pub use mixer::{Mixer, SampleBuffer, Voice};
pub use context::{AudioContext, ContextState, OfflineContext};
#[cfg(feature = "device")]
pub use device::DeviceContext;
pub use samples::{sample_path, sample_paths, BufferCache, DirectorySamples, LoadState, SampleSource, SynthSamples};
pub use audio::{chord_gain, AudioEngine};
pub use sync::SyncCursor;
pub use trail::{spoke_angle, spoke_for, trail_point, TrailPoint, TrailStyle, SPOKES};
pub use controller::{CancelHandle, PlaybackController, PlaybackObserver};
