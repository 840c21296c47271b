use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::analysis::sampler::SpectrumSource;
use crate::dsp::spectrum::SpectrumAnalyser;
use crate::error;

use super::wav;

/// A recording played through the analyser as if it were live input.
///
/// Each poll analyses the `fft_size` samples ending at the cursor, then moves
/// the cursor forward by one poll interval's worth of samples. Driven by a
/// `ManualClock`, a 5 s capture window reads the first 5 s of the file
/// without waiting. Past the end of the file the source reads silence.
pub struct FileSource {
    samples: Vec<f32>,
    sample_rate: u32,
    cursor: usize,
    hop: usize,
    analyser: SpectrumAnalyser,
}

impl FileSource {
    pub fn open(path: &Path, analyser: SpectrumAnalyser, poll_interval: Duration) -> Result<Self> {
        let (samples, sample_rate) = wav::load_mono(path)?;
        Ok(Self::from_samples(samples, sample_rate, analyser, poll_interval))
    }

    pub fn from_samples(
        samples: Vec<f32>,
        sample_rate: u32,
        analyser: SpectrumAnalyser,
        poll_interval: Duration,
    ) -> Self {
        let hop = ((sample_rate as f64 * poll_interval.as_secs_f64()).round() as usize).max(1);
        let cursor = analyser.fft_size().min(samples.len());

        Self {
            samples,
            sample_rate,
            cursor,
            hop,
            analyser,
        }
    }

    /// All decoded samples, e.g. for level checks.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

impl SpectrumSource for FileSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn fft_size(&self) -> usize {
        self.analyser.fft_size()
    }

    fn poll(&mut self) -> error::Result<Vec<u8>> {
        let end = self.cursor;
        let start = end.saturating_sub(self.analyser.fft_size());
        let frame: Vec<f32> = (start..end)
            .map(|i| self.samples.get(i).copied().unwrap_or(0.0))
            .collect();

        self.cursor += self.hop;
        Ok(self.analyser.byte_frequency_data(&frame))
    }
}
