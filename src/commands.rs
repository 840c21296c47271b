use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::analysis::aggregate;
use crate::analysis::listener::Listener;
use crate::analysis::sampler::{Clock, ManualClock, SpectrumSampler, SpectrumSource, SystemClock};
use crate::audio::capture::MicrophoneSource;
use crate::audio::file_source::FileSource;
use crate::cli::CaptureArgs;
use crate::config::AppConfig;
use crate::dsp::spectrum::SpectrumAnalyser;
use crate::error::PitchError;
use crate::music::{self, ReferencePitch};
use crate::report::{self, MultiPeakReport, SinglePeakReport};
use crate::util;

/// Below this peak level a file is treated as silent.
const SILENT_PEAK_DB: f32 = -60.0;

/// What one capture produced.
pub enum CaptureOutcome {
    Single(Option<SinglePeakReport>),
    Multi(MultiPeakReport),
}

/// Apply per-command overrides on top of the loaded config.
fn with_overrides(
    config: &AppConfig,
    reference: Option<f64>,
    rounding: Option<music::RoundingPolicy>,
) -> AppConfig {
    let mut config = config.clone();
    if let Some(hz) = reference {
        config.reference.frequency = hz;
    }
    if let Some(rounding) = rounding {
        config.conversion.rounding = rounding;
    }
    config
}

fn capture_config(config: &AppConfig, args: &CaptureArgs) -> Result<AppConfig> {
    let mut config = with_overrides(config, args.reference, args.rounding);
    if let Some(k) = args.peaks {
        config.capture.top_k = k;
    }
    if let Some(seconds) = args.seconds {
        if !seconds.is_finite() || seconds <= 0.0 {
            anyhow::bail!("--seconds must be positive, got {seconds}");
        }
        config.capture.duration_ms = (seconds * 1000.0).round() as u64;
    }
    config.validate()?;
    Ok(config)
}

/// `pitchscope frequency`
pub fn frequency(
    config: &AppConfig,
    note: &str,
    octave: Option<i32>,
    reference: Option<f64>,
) -> Result<()> {
    let config = with_overrides(config, reference, None);
    let reference = config.reference_pitch()?;

    let (letter, octave) = match octave {
        Some(octave) => (note.trim().to_string(), octave),
        None => music::parse_note_name(note)?,
    };

    let hz = music::frequency_from_name(&letter, octave, &reference)?;
    println!("{}", report::format_frequency(hz));
    Ok(())
}

/// `pitchscope note`
pub fn note(
    config: &AppConfig,
    frequency: &str,
    reference: Option<f64>,
    rounding: Option<music::RoundingPolicy>,
) -> Result<()> {
    let config = with_overrides(config, reference, rounding);
    let reference = config.reference_pitch()?;

    let hz = music::parse_frequency(frequency)?;
    let note = music::note_from_frequency(hz, &reference, config.conversion.rounding)?;
    let cents = music::cents_offset(hz, note, &reference)?;

    println!(
        "{} {}",
        style(note.to_string()).cyan().bold(),
        style(format!("({})", report::format_cents(cents))).dim()
    );
    Ok(())
}

/// Run the sampler in the requested mode and label the result.
pub fn run_capture<S, C>(
    sampler: &mut SpectrumSampler<S, C>,
    single: bool,
    reference: &ReferencePitch,
    rounding: music::RoundingPolicy,
) -> Result<CaptureOutcome, PitchError>
where
    S: SpectrumSource,
    C: Clock,
{
    if single {
        let report = sampler
            .capture_peak()?
            .map(|peak| SinglePeakReport::new(&peak, reference, rounding))
            .transpose()?;
        return Ok(CaptureOutcome::Single(report));
    }

    let samples = sampler.capture_peaks()?;
    let peaks = aggregate::aggregate(&samples, reference, rounding)?;
    let chart = aggregate::chart_series(&peaks);
    Ok(CaptureOutcome::Multi(MultiPeakReport { peaks, chart }))
}

fn present(outcome: &CaptureOutcome, args: &CaptureArgs) -> Result<()> {
    if args.json {
        let json = match outcome {
            CaptureOutcome::Single(report) => serde_json::to_string_pretty(report)?,
            CaptureOutcome::Multi(report) => serde_json::to_string_pretty(report)?,
        };
        println!("{json}");
    } else {
        println!();
        match outcome {
            CaptureOutcome::Single(report) => report::print_single(report.as_ref()),
            CaptureOutcome::Multi(report) => report::print_multi(report),
        }
        println!();
    }

    if let (Some(path), CaptureOutcome::Multi(report)) = (&args.chart, outcome) {
        if report.chart.is_empty() {
            tracing::warn!("no peaks captured, skipping chart");
        } else {
            report::charts::render_peak_chart(&report.chart, path)?;
            if !args.json {
                println!("  Chart saved to {}", style(path.display()).green());
            }
        }
    }

    Ok(())
}

/// Wall clock that advances a progress bar while it sleeps.
struct ProgressClock {
    inner: SystemClock,
    bar: ProgressBar,
}

impl Clock for ProgressClock {
    fn now(&self) -> Duration {
        self.inner.now()
    }

    fn sleep(&mut self, duration: Duration) {
        self.inner.sleep(duration);
        self.bar.set_position(self.inner.now().as_millis() as u64);
    }
}

fn listening_bar(duration: Duration, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(duration.as_millis() as u64);
    // The template is a constant, so a parse failure falls back to the default style.
    if let Ok(bar_style) =
        ProgressStyle::with_template("  Listening {bar:30.green/dim} {elapsed_precise}")
    {
        bar.set_style(bar_style);
    }
    bar
}

/// Turn a capture failure into the message the user should see.
fn capture_failed(err: PitchError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

/// `pitchscope listen`
///
/// `listener` is shared by every capture in the process, so a capture
/// started while another holds the microphone is refused.
pub fn listen(
    config: &AppConfig,
    args: &CaptureArgs,
    skip_prompt: bool,
    listener: &Listener,
) -> Result<()> {
    let config = capture_config(config, args)?;
    let reference = config.reference_pitch()?;
    let sampler_config = config.sampler_config();

    if !args.json {
        println!(
            "  Device:    {}",
            style(&config.capture.device).cyan().bold()
        );
        println!(
            "  Duration:  {:.1}s, every {} ms",
            sampler_config.duration.as_secs_f64(),
            config.capture.poll_interval_ms
        );
        println!();
    }

    if !skip_prompt {
        println!("  Press {} and play.", style("Enter").green().bold());
        util::wait_for_enter()?;
    }

    let bar = listening_bar(sampler_config.duration, args.json);

    let outcome = listener.capture(|| {
        let analyser = SpectrumAnalyser::new((&config.capture).into());
        let source = MicrophoneSource::open(&config.capture.device, analyser)?;
        tracing::debug!(device = source.device_name(), "listening");

        let clock = ProgressClock {
            inner: SystemClock::new(),
            bar: bar.clone(),
        };
        let mut sampler = SpectrumSampler::new(source, clock, sampler_config.clone());
        let outcome = run_capture(&mut sampler, args.single, &reference, config.conversion.rounding);
        drop(sampler.into_source());
        outcome
    });

    bar.finish_and_clear();
    let outcome = outcome.map_err(capture_failed)?;
    present(&outcome, args)
}

/// `pitchscope analyze`
pub fn analyze(config: &AppConfig, path: &Path, args: &CaptureArgs) -> Result<()> {
    let config = capture_config(config, args)?;
    let reference = config.reference_pitch()?;
    let sampler_config = config.sampler_config();

    let analyser = SpectrumAnalyser::new((&config.capture).into());
    let source = FileSource::open(path, analyser, sampler_config.poll_interval)
        .with_context(|| format!("Cannot analyze {}", path.display()))?;

    let peak_db = util::peak_db(source.samples());
    if peak_db < SILENT_PEAK_DB {
        eprintln!(
            "  {} Recording appears silent (peak {:.1} dB).",
            style("WARNING").red().bold(),
            peak_db
        );
    }

    let mut sampler = SpectrumSampler::new(source, ManualClock::new(), sampler_config);
    let outcome = run_capture(&mut sampler, args.single, &reference, config.conversion.rounding)?;
    present(&outcome, args)
}

/// `pitchscope paths`
pub fn show_paths() {
    println!("  Config file:  {}", crate::paths::config_file().display());
}
