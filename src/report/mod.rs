pub mod charts;

use console::style;
use serde::Serialize;

use crate::analysis::aggregate::{BarColor, ChartSeries, PeakRecord};
use crate::analysis::sampler::FrequencySample;
use crate::error::PitchError;
use crate::music::{self, Note, ReferencePitch, RoundingPolicy};

/// "440.00 Hz"
pub fn format_frequency(frequency_hz: f64) -> String {
    format!("{frequency_hz:.2} Hz")
}

/// "+12 cents" / "-3 cents"
pub fn format_cents(cents: f64) -> String {
    // + 0.0 turns -0 into 0 so tiny flat offsets print as "+0"
    let rounded = cents.round() + 0.0;
    let sign = if rounded >= 0.0 { "+" } else { "" };
    format!("{sign}{rounded:.0} cents")
}

/// Result of a single-peak capture, as printed or emitted as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct SinglePeakReport {
    pub frequency_hz: f64,
    pub frequency: String,
    pub magnitude: u8,
    pub note: Note,
    pub cents: f64,
}

impl SinglePeakReport {
    pub fn new(
        sample: &FrequencySample,
        reference: &ReferencePitch,
        rounding: RoundingPolicy,
    ) -> Result<Self, PitchError> {
        let note = music::note_from_frequency(sample.frequency_hz, reference, rounding)?;
        Ok(Self {
            frequency_hz: sample.frequency_hz,
            frequency: format_frequency(sample.frequency_hz),
            magnitude: sample.magnitude,
            note,
            cents: music::cents_offset(sample.frequency_hz, note, reference)?,
        })
    }
}

/// Result of a multi-peak capture: ranked peaks plus the bar chart series.
#[derive(Debug, Clone, Serialize)]
pub struct MultiPeakReport {
    pub peaks: Vec<PeakRecord>,
    pub chart: ChartSeries,
}

pub fn print_single(report: Option<&SinglePeakReport>) {
    println!("  {}", style("Strongest sound").bold());
    println!();

    let Some(report) = report else {
        println!(
            "  {} Nothing above the noise floor. Try playing louder or closer to the mic.",
            style("NOTE").yellow().bold()
        );
        return;
    };

    println!("  {:12} {:>12}", style("Frequency").bold(), report.frequency);
    println!("  {:12} {:>12}", style("Magnitude").bold(), report.magnitude);
    println!(
        "  {:12} {:>12}",
        style("Note").bold(),
        style(report.note.to_string()).cyan().bold()
    );
    println!("  {:12} {:>12}", style("Offset").bold(), format_cents(report.cents));
}

pub fn print_multi(report: &MultiPeakReport) {
    println!("  {}", style("Dominant pitches").bold());
    println!();

    if report.peaks.is_empty() {
        println!(
            "  {} Nothing above the noise floor. Try playing louder or closer to the mic.",
            style("NOTE").yellow().bold()
        );
        return;
    }

    let max = report.chart.values.iter().copied().max().unwrap_or(0).max(1);
    for ((label, &value), color) in report
        .chart
        .labels
        .iter()
        .zip(report.chart.values.iter())
        .zip(report.chart.colors.iter())
    {
        let width = (value as usize * 30) / max as usize;
        let bar = "█".repeat(width.max(1));
        let bar = match color {
            BarColor::Highlight => style(bar).red().bold(),
            BarColor::Hue(_) => style(bar).cyan(),
        };
        println!("  {label:>18}  {bar} {value}");
    }
}
