use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tonetoys::playback::{
    sample_paths, AudioContext, AudioEngine, BufferCache, DirectorySamples, OfflineContext, PlaybackController,
    PlaybackObserver, PlaybackState, SampleSource, SynthSamples, TrailPoint,
};
use tonetoys::{plan_events, Phrase, ToyConfig, PRESET_NAMES};

const OFFLINE_RATE: u32 = 22_050;
const FRAME_MS: f64 = 1000.0 / 60.0;

#[derive(Debug, Parser)]
#[command(name = "tonetoys")]
#[command(about = "Turn dates, phone numbers and words into short musical phrases")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Args)]
struct ToyArgs {
    /// Built-in toy preset
    #[arg(long, default_value = "date-harmony")]
    toy: String,

    /// YAML toy configuration (overrides --toy)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ToyArgs {
    fn load(&self) -> Result<ToyConfig, Box<dyn Error>> {
        match &self.config {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .map_err(|e| format!("Error reading file '{}': {}", path.display(), e))?;
                Ok(ToyConfig::from_yaml(&content)?)
            }
            None => Ok(ToyConfig::preset(&self.toy)?),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the tokens and step timing of a phrase
    Tokens {
        text: String,
        #[command(flatten)]
        toy: ToyArgs,
    },
    /// Print the phrase and its note events as JSON
    Inspect {
        text: String,
        #[command(flatten)]
        toy: ToyArgs,
    },
    /// List the built-in presets as YAML
    Presets,
    /// Play a phrase, highlighting characters as they sound
    Play {
        text: String,
        #[command(flatten)]
        toy: ToyArgs,
        /// Directory containing `<notes-dir>/<Label>.<ext>` samples
        #[arg(long)]
        samples: Option<PathBuf>,
        /// Render offline instead of using the sound card
        #[arg(long)]
        offline: bool,
        /// Write the offline render to a WAV file
        #[arg(long)]
        wav: Option<PathBuf>,
    },
}

/// Prints each highlight as the text with the active character bracketed
struct Printer {
    chars: Vec<char>,
}

impl PlaybackObserver for Printer {
    fn on_char(&mut self, index: usize) {
        let line: String = self
            .chars
            .iter()
            .enumerate()
            .map(|(i, c)| if i == index { format!("[{}]", c) } else { c.to_string() })
            .collect();
        println!("{}", line);
    }

    fn on_trail(&mut self, point: &TrailPoint) {
        info!(step = point.step, spoke = point.spoke, outer = point.outer, "trail");
    }

    fn on_done(&mut self) {
        println!("done");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Tokens { text, toy } => {
            let config = toy.load()?;
            let phrase = Phrase::build(&text, &config);
            println!("{}", phrase.source_text);
            if phrase.is_empty() {
                println!("(no tokens)");
            }
            for (step, item) in phrase.schedule.iter().enumerate() {
                let at = phrase
                    .char_for_step(step)
                    .map_or_else(|| "-".to_string(), |i| i.to_string());
                println!(
                    "{:>3}  {:>8.1}ms  +{:>6.1}ms  char {:>3}  {:?}",
                    step, phrase.starts_ms[step], item.duration_ms, at, item.token
                );
            }
            println!("total {:.1}ms", phrase.total_duration_ms);
        }
        Command::Inspect { text, toy } => {
            let config = toy.load()?;
            let phrase = Phrase::build(&text, &config);
            let events = plan_events(&phrase, config.key, config.zero_policy);
            let report = serde_json::json!({
                "toy": config.name,
                "phrase": phrase,
                "events": events,
                "samples": sample_paths(&config.samples, &events),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Presets => {
            for name in PRESET_NAMES {
                let config = ToyConfig::preset(name)?;
                println!("---\n{}", serde_yaml::to_string(&config)?);
            }
        }
        Command::Play { text, toy, samples, offline, wav } => {
            let config = toy.load()?;
            if offline || wav.is_some() || !cfg!(feature = "device") {
                play_offline(&text, config, samples, wav)?;
            } else {
                play_device(&text, config, samples)?;
            }
        }
    }
    Ok(())
}

fn sample_source(config: &ToyConfig, samples: Option<PathBuf>, sample_rate: u32) -> Arc<dyn SampleSource> {
    match samples {
        Some(root) => Arc::new(DirectorySamples::new(root, config.samples.clone())),
        None => Arc::new(SynthSamples::new(sample_rate)),
    }
}

fn drive<C: AudioContext>(
    toy: &mut PlaybackController,
    engine: &mut AudioEngine<C>,
    printer: &mut Printer,
    mut tick: impl FnMut(&mut AudioEngine<C>) -> f64,
) -> Result<PlaybackState, Box<dyn Error>> {
    let mut frame_ms = 0.0;
    loop {
        let state = toy.frame(engine, frame_ms, &mut *printer)?;
        if state != PlaybackState::Playing {
            return Ok(state);
        }
        frame_ms += tick(engine);
    }
}

fn play_offline(
    text: &str,
    config: ToyConfig,
    samples: Option<PathBuf>,
    wav: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let source = sample_source(&config, samples, OFFLINE_RATE);
    // Offline time runs faster than a loader thread, so load on the frame loop
    let mut engine = AudioEngine::new(OfflineContext::new(OFFLINE_RATE), BufferCache::inline(source));
    let mut toy = PlaybackController::new(config);
    let mut printer = Printer { chars: Vec::new() };

    toy.start(&mut engine, text)?;
    printer.chars = toy.phrase().map(|p| p.source_text.chars().collect()).unwrap_or_default();
    drive(&mut toy, &mut engine, &mut printer, |engine| {
        engine.context_mut().advance(FRAME_MS / 1000.0);
        FRAME_MS
    })?;

    if let Some(path) = wav {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: OFFLINE_RATE,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec)?;
        for sample in engine.context().rendered() {
            writer.write_sample(*sample)?;
        }
        writer.finalize()?;
        eprintln!("Wrote {}", path.display());
    }

    engine.shutdown();
    Ok(())
}

#[cfg(feature = "device")]
fn play_device(text: &str, config: ToyConfig, samples: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    use std::time::{Duration, Instant};
    use tonetoys::playback::DeviceContext;

    let context = DeviceContext::open_default()?;
    let source = sample_source(&config, samples, context.sample_rate());
    let mut engine = AudioEngine::new(context, BufferCache::threaded(source));
    let mut toy = PlaybackController::new(config);
    let mut printer = Printer { chars: Vec::new() };

    toy.start(&mut engine, text)?;
    printer.chars = toy.phrase().map(|p| p.source_text.chars().collect()).unwrap_or_default();
    let frame = Duration::from_secs_f64(FRAME_MS / 1000.0);
    drive(&mut toy, &mut engine, &mut printer, |_| {
        let started = Instant::now();
        std::thread::sleep(frame);
        started.elapsed().as_secs_f64() * 1000.0
    })?;

    engine.shutdown();
    Ok(())
}

#[cfg(not(feature = "device"))]
fn play_device(text: &str, config: ToyConfig, samples: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    play_offline(text, config, samples, None)
}
