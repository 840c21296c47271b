use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::windowing::Window;

/// Parameters of the byte-magnitude analyser.
///
/// The defaults mirror a browser analyser node: 2048-point transform,
/// 0.8 smoothing, and a -100..-30 dB window mapped onto 0..255.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyserConfig {
    pub fft_size: usize,
    /// Weight of the previous frame in the running average, in [0, 1).
    /// 0 disables smoothing.
    pub smoothing: f32,
    /// Level mapped to byte 0. Anything quieter reads as 0.
    pub min_decibels: f32,
    /// Level mapped to byte 255. Anything louder saturates.
    pub max_decibels: f32,
    pub window: Window,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            window: Window::Blackman,
        }
    }
}

/// Frequency in Hz at the start of an FFT bin.
///
/// Bin k of an N-point transform at sample rate sr covers
/// [k * sr / N, (k+1) * sr / N).
pub fn bin_frequency(bin: usize, sample_rate: u32, fft_size: usize) -> f64 {
    bin as f64 * sample_rate as f64 / fft_size as f64
}

/// Turns time-domain frames into quantized magnitude spectra.
///
/// Per frame:
/// 1. Window (Blackman by default)
/// 2. Forward FFT
/// 3. |X[k]| / N for the first N/2 bins
/// 4. Exponential smoothing against the previous frame
/// 5. dB, then linear map of [min_db, max_db] onto 0..=255
///
/// The smoothing state lives in the analyser, so one analyser should be used
/// for exactly one capture.
pub struct SpectrumAnalyser {
    config: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyser {
    pub fn new(config: AnalyserConfig) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let window = config.window.coefficients(config.fft_size);
        let bins = config.fft_size / 2;

        Self {
            fft,
            window,
            smoothed: vec![0.0; bins],
            buffer: vec![Complex::new(0.0, 0.0); config.fft_size],
            config,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    /// Number of magnitude bins produced per frame (fft_size / 2).
    #[allow(dead_code)]
    pub fn bin_count(&self) -> usize {
        self.config.fft_size / 2
    }

    /// Analyse one frame and return one byte per bin.
    ///
    /// Only the most recent `fft_size` samples of `frame` are used. A shorter
    /// frame is zero-padded at the front, as if the stream had been silent
    /// before it started.
    pub fn byte_frequency_data(&mut self, frame: &[f32]) -> Vec<u8> {
        let n = self.config.fft_size;
        let frame = &frame[frame.len().saturating_sub(n)..];
        let pad = n - frame.len();

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { frame[i - pad] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let norm = 1.0 / n as f32;
        let tau = self.config.smoothing;
        let min_db = self.config.min_decibels;
        let range = self.config.max_decibels - min_db;

        self.smoothed
            .iter_mut()
            .zip(self.buffer.iter())
            .map(|(state, c)| {
                let magnitude = c.norm() * norm;
                *state = tau * *state + (1.0 - tau) * magnitude;

                if *state <= 0.0 || !state.is_finite() {
                    return 0;
                }
                let db = 20.0 * state.log10();
                let scaled = 255.0 * (db - min_db) / range;
                scaled.clamp(0.0, 255.0) as u8
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn unsmoothed() -> AnalyserConfig {
        AnalyserConfig {
            smoothing: 0.0,
            ..AnalyserConfig::default()
        }
    }

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn bin_frequency_mapping() {
        assert_eq!(bin_frequency(0, 44100, 2048), 0.0);
        assert!((bin_frequency(1, 44100, 2048) - 21.533).abs() < 0.001);
        assert_eq!(bin_frequency(1024, 48000, 2048), 24000.0);
    }

    #[test]
    fn output_has_half_fft_size_bins() {
        let mut analyser = SpectrumAnalyser::new(AnalyserConfig::default());
        let data = analyser.byte_frequency_data(&vec![0.0; 2048]);
        assert_eq!(data.len(), 1024);
        assert_eq!(analyser.bin_count(), 1024);
    }

    #[test]
    fn silence_is_all_zero() {
        let mut analyser = SpectrumAnalyser::new(unsmoothed());
        let data = analyser.byte_frequency_data(&vec![0.0; 2048]);
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let sr = 44100;
        let bin = 100;
        let freq = bin_frequency(bin, sr, 2048) as f32;
        let mut analyser = SpectrumAnalyser::new(unsmoothed());

        // Quiet tone so the peak stays below saturation
        let data = analyser.byte_frequency_data(&sine(freq, 0.01, sr, 2048));

        let (peak_bin, &peak) = data
            .iter()
            .enumerate()
            .max_by_key(|&(_, m)| *m)
            .unwrap();
        assert_eq!(peak_bin, bin);
        assert!(peak > 0 && peak < 255, "peak byte = {peak}");
        assert!(data[bin + 1] < peak && data[bin - 1] < peak);
    }

    #[test]
    fn short_frame_is_zero_padded() {
        let mut analyser = SpectrumAnalyser::new(unsmoothed());
        let data = analyser.byte_frequency_data(&[0.0; 100]);
        assert_eq!(data.len(), 1024);
    }

    #[test]
    fn smoothing_carries_energy_forward() {
        let sr = 44100;
        let freq = bin_frequency(200, sr, 2048) as f32;
        let mut analyser = SpectrumAnalyser::new(AnalyserConfig::default());

        analyser.byte_frequency_data(&sine(freq, 0.5, sr, 2048));
        let after_silence = analyser.byte_frequency_data(&vec![0.0; 2048]);
        assert!(after_silence[200] > 0, "smoothed level should decay, not vanish");
    }
}
