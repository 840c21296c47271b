use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};

/// Load a WAV file as mono f32 samples in [-1.0, 1.0].
///
/// Multi-channel files are downmixed by keeping the first channel, the same
/// way live input is handled. Returns (samples, sample_rate).
pub fn load_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<hound::Result<Vec<_>>>()
                .context("Failed to read WAV samples")?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<hound::Result<Vec<_>>>()
            .context("Failed to read WAV samples")?,
    };

    let mono = if channels > 1 {
        interleaved.into_iter().step_by(channels).collect()
    } else {
        interleaved
    };

    tracing::debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels,
        samples = mono.len(),
        "loaded WAV file"
    );

    Ok((mono, spec.sample_rate))
}
