//! Sound-card output through `cpal`
//!
//! The audio callback renders the shared [`Mixer`], so the audio clock is
//! driven by the device. The stream is built paused; [`AudioContext::resume`]
//! starts it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use tracing::{debug, warn};

use super::context::{AudioContext, ContextState};
use super::mixer::{Mixer, Voice};
use super::types::RunId;
use crate::error::ToyError;

pub struct DeviceContext {
    mixer: Arc<Mutex<Mixer>>,
    stream: Option<Stream>,
    state: ContextState,
}

fn lock(mixer: &Mutex<Mixer>) -> MutexGuard<'_, Mixer> {
    mixer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mixer: Arc<Mutex<Mixer>>,
) -> Result<Stream, ToyError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                lock(&mixer).render(&mut scratch, channels);
                for (out, sample) in data.iter_mut().zip(&scratch) {
                    *out = T::from_sample(*sample);
                }
            },
            |err| warn!(error = %err, "audio output stream error"),
            Some(Duration::from_millis(200)),
        )
        .map_err(|e| ToyError::Output(e.to_string()))
}

impl DeviceContext {
    /// Open the default output device
    pub fn open_default() -> Result<Self, ToyError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| ToyError::Output("no default output device".to_string()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| ToyError::Output(e.to_string()))?;
        let format = supported.sample_format();
        let config: StreamConfig = supported.into();
        debug!(?format, sample_rate = config.sample_rate.0, channels = config.channels, "opening output");

        let mixer = Arc::new(Mutex::new(Mixer::new(config.sample_rate.0)));
        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, Arc::clone(&mixer))?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, Arc::clone(&mixer))?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, Arc::clone(&mixer))?,
            other => return Err(ToyError::Output(format!("unsupported sample format: {other:?}"))),
        };
        stream.pause().map_err(|e| ToyError::Output(e.to_string()))?;

        Ok(Self {
            mixer,
            stream: Some(stream),
            state: ContextState::Suspended,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        lock(&self.mixer).sample_rate()
    }
}

impl AudioContext for DeviceContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> ContextState {
        if self.state != ContextState::Suspended {
            return self.state;
        }
        if let Some(stream) = &self.stream {
            match stream.play() {
                Ok(()) => self.state = ContextState::Running,
                Err(e) => warn!(error = %e, "output refused to start"),
            }
        }
        self.state
    }

    fn current_time(&self) -> f64 {
        lock(&self.mixer).current_time()
    }

    fn play(&mut self, voice: Voice) -> Result<(), ToyError> {
        if self.state == ContextState::Closed {
            return Err(ToyError::ContextClosed);
        }
        lock(&self.mixer).add(voice);
        Ok(())
    }

    fn silence_run(&mut self, run: RunId) {
        lock(&self.mixer).silence_run(run);
    }

    fn close(&mut self) {
        self.stream.take();
        lock(&self.mixer).clear();
        self.state = ContextState::Closed;
    }
}
