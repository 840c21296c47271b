use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::sampler::SamplerConfig;
use crate::dsp::spectrum::AnalyserConfig;
use crate::dsp::windowing::Window;
use crate::music::{Note, ReferencePitch, RoundingPolicy};
use crate::paths;

/// Application configuration, loaded from config.toml.
///
/// serde's `default` attribute means: if a field is missing from the TOML file,
/// use the value from the Default implementation instead of failing to parse.
/// This makes the config file optional; every field has a sensible default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reference: ReferenceConfig,
    pub conversion: ConversionConfig,
    pub capture: CaptureConfig,
}

/// Tuning anchor used by every conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub note: Note,
    pub frequency: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// "nearest" or "ceiling". See `RoundingPolicy` for how they differ.
    pub rounding: RoundingPolicy,
}

/// Live and file capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Input device name (substring match), or "default".
    pub device: String,
    pub duration_ms: u64,
    pub poll_interval_ms: u64,
    pub fft_size: usize,
    /// How many peaks the multi-peak mode keeps.
    pub top_k: usize,
    /// Weight of the previous frame in the analyser's running average.
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub window: Window,
}

// --- Default implementations ---

impl Default for ReferenceConfig {
    fn default() -> Self {
        let reference = ReferencePitch::default();
        Self {
            note: reference.note(),
            frequency: reference.frequency_hz(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let analyser = AnalyserConfig::default();
        Self {
            device: "default".into(),
            duration_ms: 5000,
            poll_interval_ms: 100,
            fft_size: analyser.fft_size,
            top_k: 7,
            smoothing: analyser.smoothing,
            min_decibels: analyser.min_decibels,
            max_decibels: analyser.max_decibels,
            window: analyser.window,
        }
    }
}

impl AppConfig {
    /// Reject settings the analyser or sampler cannot work with.
    pub fn validate(&self) -> Result<()> {
        let c = &self.capture;

        if !c.fft_size.is_power_of_two() || !(32..=32768).contains(&c.fft_size) {
            anyhow::bail!(
                "capture.fft_size must be a power of two between 32 and 32768, got {}",
                c.fft_size
            );
        }
        if c.duration_ms == 0 || c.poll_interval_ms == 0 {
            anyhow::bail!("capture.duration_ms and capture.poll_interval_ms must be positive");
        }
        if c.top_k == 0 {
            anyhow::bail!("capture.top_k must be at least 1");
        }
        if !(0.0..1.0).contains(&c.smoothing) {
            anyhow::bail!("capture.smoothing must be in [0, 1), got {}", c.smoothing);
        }
        if c.min_decibels >= c.max_decibels {
            anyhow::bail!(
                "capture.min_decibels ({}) must be below capture.max_decibels ({})",
                c.min_decibels,
                c.max_decibels
            );
        }

        self.reference_pitch()?;
        Ok(())
    }

    /// The configured reference pitch.
    pub fn reference_pitch(&self) -> Result<ReferencePitch> {
        ReferencePitch::new(self.reference.note, self.reference.frequency)
            .context("Invalid [reference] settings")
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            duration: Duration::from_millis(self.capture.duration_ms),
            poll_interval: Duration::from_millis(self.capture.poll_interval_ms),
            top_k: self.capture.top_k,
        }
    }
}

/// Bridge between the user-facing config format and the analyser parameters.
impl From<&CaptureConfig> for AnalyserConfig {
    fn from(cfg: &CaptureConfig) -> Self {
        AnalyserConfig {
            fft_size: cfg.fft_size,
            smoothing: cfg.smoothing,
            min_decibels: cfg.min_decibels,
            max_decibels: cfg.max_decibels,
            window: cfg.window,
        }
    }
}

/// Load the config from `path`, or from $XDG_CONFIG_HOME/pitchscope/config.toml
/// when no path is given. A missing default file means defaults; a missing
/// explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let default_path = paths::config_file();
    let (path, explicit) = match path {
        Some(p) => (p, true),
        None => (default_path.as_path(), false),
    };

    if !explicit && !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::PitchClass;

    #[test]
    fn default_config_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.reference.frequency, 440.0);
        assert_eq!(cfg.reference.note, Note::new(PitchClass::A, 4));
        assert_eq!(cfg.capture.fft_size, 2048);
        assert_eq!(cfg.capture.top_k, 7);
        assert_eq!(cfg.conversion.rounding, RoundingPolicy::Nearest);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parse_partial_toml() {
        // If the user only specifies some fields, the rest should use defaults
        let toml_str = r#"
[reference]
frequency = 432.0

[conversion]
rounding = "ceiling"

[capture]
duration_ms = 3500
window = "hann"
"#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.reference.frequency, 432.0);
        assert_eq!(cfg.conversion.rounding, RoundingPolicy::Ceiling);
        assert_eq!(cfg.capture.duration_ms, 3500);
        assert_eq!(cfg.capture.window, Window::Hann);
        // Unspecified fields should be defaults
        assert_eq!(cfg.reference.note.to_string(), "A4");
        assert_eq!(cfg.capture.poll_interval_ms, 100);
    }

    #[test]
    fn reference_note_is_parsed() {
        let cfg: AppConfig = toml::from_str("[reference]\nnote = \"C4\"\nfrequency = 256.0").unwrap();
        let reference = cfg.reference_pitch().unwrap();
        assert_eq!(reference.note(), Note::new(PitchClass::C, 4));
        assert!(toml::from_str::<AppConfig>("[reference]\nnote = \"H4\"").is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.capture.fft_size = 1000;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.capture.top_k = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.capture.smoothing = 1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.capture.min_decibels = -20.0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.reference.frequency = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn analyser_and_sampler_conversion() {
        let cfg = AppConfig::default();
        let analyser: AnalyserConfig = (&cfg.capture).into();
        assert_eq!(analyser, AnalyserConfig::default());
        assert_eq!(cfg.sampler_config(), SamplerConfig::default());
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[capture]\ntop_k = 3\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.capture.top_k, 3);
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn roundtrip_toml() {
        let cfg = AppConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let loaded: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(loaded.reference.note, cfg.reference.note);
        assert_eq!(loaded.capture.window, cfg.capture.window);
    }
}
