//! # Toy Configuration
//!
//! Every toy runs the same engine; what differs is configuration: the key,
//! the zero policy, the step timing, the allowed characters and the visual
//! style. This module holds the built-in presets and a YAML loader that
//! overrides one of them.
//!
//! ## Presets
//! | name            | key   | zero      | timing            | trail    |
//! |-----------------|-------|-----------|-------------------|----------|
//! | `date-harmony`  | major | chromatic | digit runs, 260ms | path     |
//! | `phone-melody`  | major | ticks     | fixed, 250ms      | path     |
//! | `calendar`      | minor | rest      | fixed, 260ms      | spiral   |
//! | `daily-phrase`  | major | chromatic | fixed, 250ms      | dissolve |
//! | `postcard`      | minor | chromatic | digit runs, 250ms | path     |
//!
//! ## YAML
//! ```rust
//! use tonetoys::config::ToyConfig;
//! use tonetoys::harmony::Key;
//!
//! let yaml = r#"
//! base: phone-melody
//! key: minor
//! step-ms: 240
//! "#;
//! let config = ToyConfig::from_yaml(yaml)?;
//! assert_eq!(config.key, Key::Minor);
//! assert_eq!(config.timing.step_ms(), 240.0);
//! # Ok::<(), tonetoys::ToyError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ToyError;
use crate::harmony::Key;
use crate::lexer::ZeroPolicy;
use crate::playback::TrailStyle;
use crate::sanitize::CharSet;
use crate::schedule::StepTiming;

/// Names accepted by [`ToyConfig::preset`]
pub const PRESET_NAMES: [&str; 5] = ["date-harmony", "phone-melody", "calendar", "daily-phrase", "postcard"];

/// Where note samples live: `/<notes_dir>/<Label>.<extension>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SampleConfig {
    pub notes_dir: String,
    pub extension: String,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            notes_dir: "notes".to_string(),
            extension: "wav".to_string(),
        }
    }
}

/// Complete configuration for one toy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ToyConfig {
    pub name: String,
    pub key: Key,
    pub zero_policy: ZeroPolicy,
    pub timing: StepTiming,
    pub charset: CharSet,
    /// Let `+ # *` move the character highlight too
    pub highlight_controls: bool,
    pub trail: TrailStyle,
    /// Gap between scheduling and the first note
    pub latency_ms: f64,
    /// Silence after the last step before the run completes
    pub tail_ms: f64,
    /// Delay before unattended playback starts
    pub priming_ms: f64,
    pub samples: SampleConfig,
}

impl Default for ToyConfig {
    fn default() -> Self {
        Self {
            name: "custom".to_string(),
            key: Key::Major,
            zero_policy: ZeroPolicy::Chromatic,
            timing: StepTiming::default(),
            charset: CharSet::default(),
            highlight_controls: false,
            trail: TrailStyle::Path,
            latency_ms: 50.0,
            tail_ms: 300.0,
            priming_ms: 600.0,
            samples: SampleConfig::default(),
        }
    }
}

impl ToyConfig {
    /// Look up a built-in preset by name
    pub fn preset(name: &str) -> Result<Self, ToyError> {
        let base = Self { name: name.to_string(), ..Self::default() };
        let config = match name {
            "date-harmony" => Self {
                timing: StepTiming::DigitRuns { step_ms: 260.0 },
                charset: CharSet::dates(),
                ..base
            },
            "phone-melody" => Self {
                zero_policy: ZeroPolicy::Ticks,
                charset: CharSet::phone(),
                highlight_controls: true,
                ..base
            },
            "calendar" => Self {
                key: Key::Minor,
                zero_policy: ZeroPolicy::Rest,
                timing: StepTiming::Fixed { step_ms: 260.0 },
                charset: CharSet::dates(),
                trail: TrailStyle::Spiral,
                ..base
            },
            "daily-phrase" => Self {
                charset: CharSet::words(),
                trail: TrailStyle::Dissolve,
                ..base
            },
            "postcard" => Self {
                key: Key::Minor,
                timing: StepTiming::DigitRuns { step_ms: 250.0 },
                ..base
            },
            _ => return Err(ToyError::UnknownToy(name.to_string())),
        };
        Ok(config)
    }

    /// Parse a YAML document, applying its fields on top of `base` (or the
    /// default configuration when no base is named).
    pub fn from_yaml(content: &str) -> Result<Self, ToyError> {
        let raw: RawConfig = serde_yaml::from_str(content).map_err(|e| ToyError::Config(e.to_string()))?;
        raw.resolve()
    }
}

/// All-optional mirror of the YAML document
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    base: Option<String>,
    name: Option<String>,
    key: Option<String>,
    zero_policy: Option<String>,
    timing: Option<String>,
    step_ms: Option<f64>,
    letters: Option<bool>,
    digits: Option<bool>,
    punctuation: Option<String>,
    highlight_controls: Option<bool>,
    trail: Option<String>,
    latency_ms: Option<f64>,
    tail_ms: Option<f64>,
    priming_ms: Option<f64>,
    notes_dir: Option<String>,
    extension: Option<String>,
}

impl RawConfig {
    fn resolve(self) -> Result<ToyConfig, ToyError> {
        let mut config = match &self.base {
            Some(base) => ToyConfig::preset(base)?,
            None => ToyConfig::default(),
        };

        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(key) = &self.key {
            config.key = parse_key(key)?;
        }
        if let Some(policy) = &self.zero_policy {
            config.zero_policy = parse_zero_policy(policy)?;
        }

        let step_ms = match self.step_ms {
            Some(ms) if ms > 0.0 && ms.is_finite() => ms,
            Some(ms) => return Err(ToyError::Config(format!("step-ms must be positive, got {}", ms))),
            None => config.timing.step_ms(),
        };
        config.timing = match self.timing.as_deref().map(str::trim) {
            Some("fixed") => StepTiming::Fixed { step_ms },
            Some("digit-runs") => StepTiming::DigitRuns { step_ms },
            Some(other) => {
                return Err(ToyError::Config(format!(
                    "timing must be 'fixed' or 'digit-runs', got '{}'",
                    other
                )))
            }
            None => match config.timing {
                StepTiming::Fixed { .. } => StepTiming::Fixed { step_ms },
                StepTiming::DigitRuns { .. } => StepTiming::DigitRuns { step_ms },
            },
        };

        if let Some(letters) = self.letters {
            config.charset.letters = letters;
        }
        if let Some(digits) = self.digits {
            config.charset.digits = digits;
        }
        if let Some(punctuation) = self.punctuation {
            config.charset.punctuation = punctuation;
        }
        if let Some(highlight) = self.highlight_controls {
            config.highlight_controls = highlight;
        }
        if let Some(trail) = &self.trail {
            config.trail = parse_trail(trail)?;
        }

        config.latency_ms = non_negative("latency-ms", self.latency_ms, config.latency_ms)?;
        config.tail_ms = non_negative("tail-ms", self.tail_ms, config.tail_ms)?;
        config.priming_ms = non_negative("priming-ms", self.priming_ms, config.priming_ms)?;

        if let Some(dir) = self.notes_dir {
            config.samples.notes_dir = dir.trim_matches('/').to_string();
        }
        if let Some(ext) = self.extension {
            config.samples.extension = ext.trim_start_matches('.').to_string();
        }

        Ok(config)
    }
}

fn parse_key(s: &str) -> Result<Key, ToyError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "major" | "happy" => Ok(Key::Major),
        "minor" | "calm" => Ok(Key::Minor),
        other => Err(ToyError::Config(format!("Unknown key '{}'", other))),
    }
}

fn parse_zero_policy(s: &str) -> Result<ZeroPolicy, ToyError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "chromatic" => Ok(ZeroPolicy::Chromatic),
        "ticks" => Ok(ZeroPolicy::Ticks),
        "rest" => Ok(ZeroPolicy::Rest),
        other => Err(ToyError::Config(format!("Unknown zero-policy '{}'", other))),
    }
}

fn parse_trail(s: &str) -> Result<TrailStyle, ToyError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "path" => Ok(TrailStyle::Path),
        "spiral" => Ok(TrailStyle::Spiral),
        "dissolve" => Ok(TrailStyle::Dissolve),
        other => Err(ToyError::Config(format!("Unknown trail '{}'", other))),
    }
}

fn non_negative(field: &str, value: Option<f64>, fallback: f64) -> Result<f64, ToyError> {
    match value {
        Some(v) if v >= 0.0 && v.is_finite() => Ok(v),
        Some(v) => Err(ToyError::Config(format!("{} must be zero or positive, got {}", field, v))),
        None => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_resolve() {
        for name in PRESET_NAMES {
            let config = ToyConfig::preset(name).unwrap();
            assert_eq!(config.name, name);
            assert!(config.timing.step_ms() > 0.0);
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert_eq!(ToyConfig::preset("kazoo"), Err(ToyError::UnknownToy("kazoo".to_string())));
    }

    #[test]
    fn test_yaml_overrides_base() {
        let yaml = r#"
base: calendar
zero-policy: ticks
timing: digit-runs
trail: path
notes-dir: /assets/notes/
extension: .mp3
"#;
        let config = ToyConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.name, "calendar");
        assert_eq!(config.key, Key::Minor);
        assert_eq!(config.zero_policy, ZeroPolicy::Ticks);
        assert_eq!(config.timing, StepTiming::DigitRuns { step_ms: 260.0 });
        assert_eq!(config.trail, TrailStyle::Path);
        assert_eq!(config.samples.notes_dir, "assets/notes");
        assert_eq!(config.samples.extension, "mp3");
    }

    #[test]
    fn test_yaml_without_base_uses_defaults() {
        let config = ToyConfig::from_yaml("key: calm").unwrap();
        assert_eq!(config.key, Key::Minor);
        assert_eq!(config.timing, StepTiming::Fixed { step_ms: 250.0 });
        assert_eq!(config.latency_ms, 50.0);
    }

    #[test]
    fn test_yaml_rejects_bad_values() {
        assert!(matches!(ToyConfig::from_yaml("step-ms: 0"), Err(ToyError::Config(_))));
        assert!(matches!(ToyConfig::from_yaml("timing: swing"), Err(ToyError::Config(_))));
        assert!(matches!(ToyConfig::from_yaml("tail-ms: -5"), Err(ToyError::Config(_))));
        assert!(matches!(ToyConfig::from_yaml("key: lydian"), Err(ToyError::Config(_))));
        assert!(matches!(ToyConfig::from_yaml("colour: red"), Err(ToyError::Config(_))));
        assert!(matches!(ToyConfig::from_yaml("base: kazoo"), Err(ToyError::UnknownToy(_))));
    }
}
