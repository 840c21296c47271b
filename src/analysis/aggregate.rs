use serde::Serialize;

use crate::error::Result;
use crate::music::{self, Note, ReferencePitch, RoundingPolicy};

use super::sampler::FrequencySample;

/// A captured peak labelled with the note it falls on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakRecord {
    pub frequency_hz: f64,
    pub magnitude: u8,
    pub note: Note,
}

impl PeakRecord {
    /// Label a sample with its nearest note. Fails with `InvalidFrequency`
    /// for a 0 Hz sample.
    pub fn from_sample(
        sample: &FrequencySample,
        reference: &ReferencePitch,
        rounding: RoundingPolicy,
    ) -> Result<Self> {
        Ok(Self {
            frequency_hz: sample.frequency_hz,
            magnitude: sample.magnitude,
            note: music::note_from_frequency(sample.frequency_hz, reference, rounding)?,
        })
    }

    /// Chart label, e.g. "261.63 Hz C4".
    pub fn label(&self) -> String {
        format!("{:.2} Hz {}", self.frequency_hz, self.note)
    }
}

/// Sort peaks into musical pitch order.
///
/// Records with the same frequency are merged first, keeping the loudest.
/// The order is by octave, then by position in the chromatic scale; it does
/// not look at frequency or magnitude. The sort is stable, so records that
/// share a note keep their input order.
pub fn rank(records: Vec<PeakRecord>) -> Vec<PeakRecord> {
    let mut unique: Vec<PeakRecord> = Vec::with_capacity(records.len());
    for record in records {
        match unique
            .iter_mut()
            .find(|r| r.frequency_hz == record.frequency_hz)
        {
            Some(existing) if record.magnitude > existing.magnitude => *existing = record,
            Some(_) => {}
            None => unique.push(record),
        }
    }

    unique.sort_by_key(|r| (r.note.octave, r.note.pitch_class.index()));
    unique
}

/// Label every sample with its note and rank the result.
pub fn aggregate(
    samples: &[FrequencySample],
    reference: &ReferencePitch,
    rounding: RoundingPolicy,
) -> Result<Vec<PeakRecord>> {
    let records = samples
        .iter()
        .map(|s| PeakRecord::from_sample(s, reference, rounding))
        .collect::<Result<Vec<_>>>()?;
    Ok(rank(records))
}

/// Display colour for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "degrees")]
pub enum BarColor {
    /// The loudest peak.
    Highlight,
    /// Hue in degrees, spread by rank position; carries no magnitude meaning.
    Hue(f64),
}

/// Parallel arrays ready to feed a bar chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<u8>,
    pub colors: Vec<BarColor>,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Build chart data from ranked peaks.
///
/// The loudest record (the first one in rank order if several tie) is
/// highlighted. Every other record at rank `i` of `n` gets hue `i / n * 360`.
pub fn chart_series(ranked: &[PeakRecord]) -> ChartSeries {
    let count = ranked.len();
    let loudest = ranked
        .iter()
        .enumerate()
        .fold(None::<(usize, u8)>, |best, (i, r)| match best {
            Some((_, m)) if m >= r.magnitude => best,
            _ => Some((i, r.magnitude)),
        })
        .map(|(i, _)| i);

    let colors = (0..count)
        .map(|i| {
            if Some(i) == loudest {
                BarColor::Highlight
            } else {
                BarColor::Hue(i as f64 / count as f64 * 360.0)
            }
        })
        .collect();

    ChartSeries {
        labels: ranked.iter().map(PeakRecord::label).collect(),
        values: ranked.iter().map(|r| r.magnitude).collect(),
        colors,
    }
}
