//! Note samples and the buffer cache
//!
//! One short sample per note, addressed as `/<notes_dir>/<Label>.<ext>` with
//! `#` percent-escaped (`/notes/F%234.wav`). Samples are loaded once per note
//! and shared by every run and every toy for the lifetime of the cache.
//!
//! Loading never blocks the frame loop: [`BufferCache::request`] starts a load
//! and returns immediately, and finished loads are collected by
//! [`BufferCache::drain`] on a later frame. Failed loads are remembered and
//! never retried.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use super::mixer::SampleBuffer;
use super::types::NoteEvent;
use crate::config::SampleConfig;
use crate::error::ToyError;
use crate::harmony::Pitch;

fn escape_label(label: &str) -> String {
    label.replace('#', "%23")
}

/// URL path of a note sample
pub fn sample_path(config: &SampleConfig, pitch: Pitch) -> String {
    format!("/{}/{}.{}", config.notes_dir, escape_label(&pitch.label()), config.extension)
}

/// Every sample URL a set of events needs, first use first, without repeats
pub fn sample_paths(config: &SampleConfig, events: &[NoteEvent]) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for &pitch in events.iter().flat_map(|e| &e.pitches) {
        let path = sample_path(config, pitch);
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

/// Anything that can produce the sample for a note
pub trait SampleSource: Send + Sync {
    fn load(&self, pitch: Pitch) -> Result<SampleBuffer, ToyError>;
}

/// WAV samples on disk under `<root>/<notes_dir>/<Label>.<ext>`
#[derive(Debug, Clone)]
pub struct DirectorySamples {
    root: PathBuf,
    config: SampleConfig,
}

impl DirectorySamples {
    pub fn new(root: impl AsRef<Path>, config: SampleConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config,
        }
    }

    /// Filesystem path of a note (the label is used verbatim, unescaped)
    pub fn path_for(&self, pitch: Pitch) -> PathBuf {
        self.root
            .join(&self.config.notes_dir)
            .join(format!("{}.{}", pitch.label(), self.config.extension))
    }
}

impl SampleSource for DirectorySamples {
    fn load(&self, pitch: Pitch) -> Result<SampleBuffer, ToyError> {
        let path = self.path_for(pitch);
        let fail = |message: String| ToyError::SampleLoad { label: pitch.label(), message };

        let mut reader = hound::WavReader::open(&path).map_err(|e| fail(format!("{}: {}", path.display(), e)))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| fail(e.to_string()))?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| fail(e.to_string()))?
            }
        };

        // Downmix to mono
        let samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Ok(SampleBuffer::new(spec.sample_rate, samples))
    }
}

/// Generated tones: a decaying sine with two soft partials
#[derive(Debug, Clone, Copy)]
pub struct SynthSamples {
    pub sample_rate: u32,
    pub length: f32,
}

impl SynthSamples {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate, length: 0.4 }
    }
}

impl SampleSource for SynthSamples {
    fn load(&self, pitch: Pitch) -> Result<SampleBuffer, ToyError> {
        let freq = pitch.frequency();
        let rate = self.sample_rate.max(1) as f32;
        let count = (self.length * rate) as usize;
        let samples = (0..count)
            .map(|i| {
                let t = i as f32 / rate;
                let phase = std::f32::consts::TAU * freq * t;
                let tone = phase.sin() + 0.3 * (2.0 * phase).sin() + 0.1 * (3.0 * phase).sin();
                tone * (-3.0 * t).exp() / 1.4
            })
            .collect();
        Ok(SampleBuffer::new(self.sample_rate, samples))
    }
}

/// Outcome of one load, delivered through the results channel
#[derive(Debug)]
struct Loaded {
    label: String,
    result: Result<SampleBuffer, ToyError>,
}

enum Loader {
    /// Loads on the caller's thread; results still arrive on the next drain
    Inline(Arc<dyn SampleSource>),
    Worker {
        requests: Option<Sender<Pitch>>,
        handle: Option<JoinHandle<()>>,
    },
}

#[derive(Debug, Clone)]
enum Entry {
    Loading,
    Ready(Arc<SampleBuffer>),
    Failed,
}

/// Load state of a note in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Missing,
    Loading,
    Ready,
    Failed,
}

/// Note-label-keyed cache of sample buffers
pub struct BufferCache {
    entries: HashMap<String, Entry>,
    loader: Loader,
    results_tx: Sender<Loaded>,
    results_rx: Receiver<Loaded>,
}

impl BufferCache {
    /// Cache that loads synchronously inside `request` but reports on `drain`
    pub fn inline(source: Arc<dyn SampleSource>) -> Self {
        let (results_tx, results_rx) = crossbeam_channel::unbounded();
        Self {
            entries: HashMap::new(),
            loader: Loader::Inline(source),
            results_tx,
            results_rx,
        }
    }

    /// Cache backed by a background loader thread
    pub fn threaded(source: Arc<dyn SampleSource>) -> Self {
        let (results_tx, results_rx) = crossbeam_channel::unbounded::<Loaded>();
        let (requests_tx, requests_rx) = crossbeam_channel::unbounded::<Pitch>();
        let worker_tx = results_tx.clone();

        let handle = std::thread::Builder::new()
            .name("tonetoys-sample-loader".to_string())
            .spawn(move || {
                for pitch in requests_rx {
                    let loaded = Loaded {
                        label: pitch.label(),
                        result: source.load(pitch),
                    };
                    if worker_tx.send(loaded).is_err() {
                        break;
                    }
                }
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "failed to spawn sample loader thread");
                None
            }
        };

        Self {
            entries: HashMap::new(),
            loader: Loader::Worker {
                requests: Some(requests_tx),
                handle,
            },
            results_tx,
            results_rx,
        }
    }

    pub fn state(&self, label: &str) -> LoadState {
        match self.entries.get(label) {
            None => LoadState::Missing,
            Some(Entry::Loading) => LoadState::Loading,
            Some(Entry::Ready(_)) => LoadState::Ready,
            Some(Entry::Failed) => LoadState::Failed,
        }
    }

    pub fn get(&self, label: &str) -> Option<Arc<SampleBuffer>> {
        match self.entries.get(label) {
            Some(Entry::Ready(buffer)) => Some(Arc::clone(buffer)),
            _ => None,
        }
    }

    /// Return the buffer if it is ready, otherwise make sure a load is under way
    pub fn request(&mut self, pitch: Pitch) -> Option<Arc<SampleBuffer>> {
        let label = pitch.label();
        match self.entries.get(&label) {
            Some(Entry::Ready(buffer)) => return Some(Arc::clone(buffer)),
            Some(Entry::Loading) | Some(Entry::Failed) => return None,
            None => {}
        }

        debug!(%label, "loading sample");
        self.entries.insert(label.clone(), Entry::Loading);
        match &self.loader {
            Loader::Inline(source) => {
                let loaded = Loaded { label, result: source.load(pitch) };
                // Receiver lives in self, so this cannot fail
                let _ = self.results_tx.send(loaded);
            }
            Loader::Worker { requests: Some(tx), .. } => {
                if tx.send(pitch).is_err() {
                    self.entries.insert(label, Entry::Failed);
                }
            }
            Loader::Worker { requests: None, .. } => {
                self.entries.insert(label, Entry::Failed);
            }
        }
        None
    }

    /// Collect finished loads; returns the labels that changed state
    pub fn drain(&mut self) -> Vec<String> {
        let mut changed = Vec::new();
        while let Ok(Loaded { label, result }) = self.results_rx.try_recv() {
            let entry = match result {
                Ok(buffer) => Entry::Ready(Arc::new(buffer)),
                Err(e) => {
                    debug!(%label, error = %e, "sample load failed");
                    Entry::Failed
                }
            };
            self.entries.insert(label.clone(), entry);
            changed.push(label);
        }
        changed
    }

    /// Stop the loader thread; pending loads are abandoned
    pub fn shutdown(&mut self) {
        if let Loader::Worker { requests, handle } = &mut self.loader {
            requests.take();
            if let Some(handle) = handle.take() {
                if handle.join().is_err() {
                    warn!("sample loader thread panicked");
                }
            }
        }
    }
}

impl Drop for BufferCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    struct Missing;

    impl SampleSource for Missing {
        fn load(&self, pitch: Pitch) -> Result<SampleBuffer, ToyError> {
            Err(ToyError::SampleLoad { label: pitch.label(), message: "not found".to_string() })
        }
    }

    #[test]
    fn test_sample_path_escapes_sharps() {
        let config = SampleConfig::default();
        assert_eq!(sample_path(&config, Pitch::folded(66)), "/notes/F%234.wav");
        assert_eq!(sample_path(&config, Pitch::folded(60)), "/notes/C4.wav");
    }

    #[test]
    fn test_sample_paths_for_a_phrase() {
        use crate::config::ToyConfig;
        use crate::phrase::Phrase;
        use crate::playback::engine::plan_events;

        let config = ToyConfig::default();
        // Both steps voice the same tonic triad
        let phrase = Phrase::build("11", &config);
        let events = plan_events(&phrase, config.key, config.zero_policy);
        let paths = sample_paths(&config.samples, &events);
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0], sample_path(&config.samples, events[0].pitches[0]));
    }

    #[test]
    fn test_directory_path_is_unescaped() {
        let samples = DirectorySamples::new("/srv/toys", SampleConfig::default());
        assert_eq!(samples.path_for(Pitch::folded(61)), PathBuf::from("/srv/toys/notes/C#4.wav"));
    }

    #[test]
    fn test_inline_cache_reports_on_drain() {
        let mut cache = BufferCache::inline(Arc::new(SynthSamples::new(1_000)));
        let pitch = Pitch::folded(60);
        assert!(cache.request(pitch).is_none());
        assert_eq!(cache.state("C4"), LoadState::Loading);
        assert_eq!(cache.drain(), vec!["C4".to_string()]);
        assert_eq!(cache.state("C4"), LoadState::Ready);
        assert!(cache.request(pitch).is_some());
    }

    #[test]
    fn test_buffers_are_shared() {
        let mut cache = BufferCache::inline(Arc::new(SynthSamples::new(1_000)));
        cache.request(Pitch::folded(64));
        cache.drain();
        let a = cache.get("E4").unwrap();
        let b = cache.request(Pitch::folded(64)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_failed_load_is_not_retried() {
        let mut cache = BufferCache::inline(Arc::new(Missing));
        cache.request(Pitch::folded(60));
        cache.drain();
        assert_eq!(cache.state("C4"), LoadState::Failed);
        assert!(cache.request(Pitch::folded(60)).is_none());
        assert!(cache.drain().is_empty());
    }

    #[test]
    fn test_threaded_cache_loads_in_background() {
        let mut cache = BufferCache::threaded(Arc::new(SynthSamples::new(1_000)));
        cache.request(Pitch::folded(67));
        let deadline = Instant::now() + Duration::from_secs(5);
        while cache.state("G4") == LoadState::Loading && Instant::now() < deadline {
            cache.drain();
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(cache.state("G4"), LoadState::Ready);
        cache.shutdown();
    }

    #[test]
    fn test_synth_sample_length() {
        let buffer = SynthSamples::new(8_000).load(Pitch::folded(69)).unwrap();
        assert_eq!(buffer.samples.len(), 3_200);
        assert!(buffer.samples.iter().all(|s| s.abs() <= 1.0));
    }
}
