use std::borrow::Borrow;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::dsp::spectrum::bin_frequency;
use crate::error::Result;

/// Anything that can hand out one magnitude spectrum per poll.
///
/// The microphone and WAV file sources implement this; tests use scripted
/// frames. `poll` returns one byte per bin (fft_size / 2 values).
pub trait SpectrumSource {
    fn sample_rate(&self) -> u32;
    fn fft_size(&self) -> usize;
    fn poll(&mut self) -> Result<Vec<u8>>;
}

/// Time as seen by the polling loop.
pub trait Clock {
    /// Time elapsed since some fixed starting point.
    fn now(&self) -> Duration;
    /// Suspend until `duration` has passed.
    fn sleep(&mut self, duration: Duration);
}

/// Wall-clock time with real sleeps. Used for live microphone capture.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual time that only moves when `sleep` is called.
///
/// Lets file analysis and tests run a 5-second window instantly and
/// deterministically.
#[derive(Debug, Default)]
pub struct ManualClock {
    elapsed: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.elapsed
    }

    fn sleep(&mut self, duration: Duration) {
        self.elapsed += duration;
    }
}

/// One analyser bin observed during a poll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencySample {
    pub bin: usize,
    pub frequency_hz: f64,
    pub magnitude: u8,
}

/// Timing and retention settings for one capture.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Total listening time.
    pub duration: Duration,
    /// Pause between polls.
    pub poll_interval: Duration,
    /// Number of bins kept per poll and in the final result (multi-peak mode).
    pub top_k: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(5000),
            poll_interval: Duration::from_millis(100),
            top_k: 7,
        }
    }
}

impl SamplerConfig {
    /// Upper bound on polls: one per interval plus the initial poll.
    /// Keeps the loop finite even if the clock never advances.
    pub fn max_polls(&self) -> usize {
        let interval = self.poll_interval.as_nanos().max(1);
        (self.duration.as_nanos().div_ceil(interval) + 1) as usize
    }
}

/// Polls a spectrum source over a fixed window and tracks the loudest bins.
///
/// The loop is: poll, stop if the window has elapsed, otherwise sleep one
/// interval. Nothing is shared between captures; every call returns fresh
/// values computed only from its own polls.
pub struct SpectrumSampler<S, C> {
    source: S,
    clock: C,
    config: SamplerConfig,
}

impl<S: SpectrumSource, C: Clock> SpectrumSampler<S, C> {
    pub fn new(source: S, clock: C, config: SamplerConfig) -> Self {
        Self {
            source,
            clock,
            config,
        }
    }

    /// Give the source back, e.g. to release it explicitly.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Run the polling loop, handing each spectrum to `visit`.
    /// Returns the number of polls made.
    fn run<F>(&mut self, mut visit: F) -> Result<usize>
    where
        F: FnMut(&[u8]),
    {
        let start = self.clock.now();
        let max_polls = self.config.max_polls();
        let mut polls = 0;

        while polls < max_polls {
            let spectrum = self.source.poll()?;
            visit(&spectrum);
            polls += 1;

            if self.clock.now().saturating_sub(start) >= self.config.duration {
                break;
            }
            self.clock.sleep(self.config.poll_interval);
        }

        tracing::debug!(polls, "capture window finished");
        Ok(polls)
    }

    fn sample(&self, bin: usize, magnitude: u8) -> FrequencySample {
        FrequencySample {
            bin,
            frequency_hz: bin_frequency(bin, self.source.sample_rate(), self.source.fft_size()),
            magnitude,
        }
    }

    /// The single loudest bin across the whole window.
    ///
    /// A later observation only replaces the current best if it is strictly
    /// louder, so the earliest poll and the lowest bin win ties. Returns
    /// `None` if nothing above zero was ever heard.
    pub fn capture_peak(&mut self) -> Result<Option<FrequencySample>> {
        let mut best: Option<(usize, u8)> = None;

        self.run(|spectrum| {
            for (bin, &magnitude) in candidate_bins(spectrum) {
                if best.map_or(true, |(_, m)| magnitude > m) {
                    best = Some((bin, magnitude));
                }
            }
        })?;

        Ok(best.map(|(bin, magnitude)| self.sample(bin, magnitude)))
    }

    /// The `top_k` loudest distinct bins across the whole window.
    ///
    /// Each poll contributes its own top-k to one window-wide pool; a bin
    /// seen in several polls keeps its loudest reading. The result is the
    /// top-k of that pool, loudest first.
    pub fn capture_peaks(&mut self) -> Result<Vec<FrequencySample>> {
        let k = self.config.top_k;
        let mut pool: HashMap<usize, u8> = HashMap::new();

        self.run(|spectrum| {
            for (bin, magnitude) in loudest(candidate_bins(spectrum), k) {
                let entry = pool.entry(bin).or_insert(magnitude);
                *entry = (*entry).max(magnitude);
            }
        })?;

        let peaks = loudest(pool.into_iter(), k)
            .into_iter()
            .map(|(bin, magnitude)| self.sample(bin, magnitude))
            .collect();

        Ok(peaks)
    }
}

/// Bins that can carry a pitch: skips DC (bin 0 is 0 Hz) and silent bins.
fn candidate_bins(spectrum: &[u8]) -> impl Iterator<Item = (usize, &u8)> {
    spectrum
        .iter()
        .enumerate()
        .skip(1)
        .filter(|&(_, m)| *m > 0)
}

/// The `k` loudest (bin, magnitude) pairs, loudest first, lower bin first
/// on equal magnitude.
fn loudest<I, M>(bins: I, k: usize) -> Vec<(usize, u8)>
where
    I: Iterator<Item = (usize, M)>,
    M: Borrow<u8>,
{
    let mut all: Vec<(usize, u8)> = bins.map(|(bin, m)| (bin, *m.borrow())).collect();
    all.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    all.truncate(k);
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::error::PitchError;

    /// Replays scripted spectra; repeats the last one once the script runs out.
    struct ScriptedSource {
        frames: VecDeque<Vec<u8>>,
        last: Vec<u8>,
        polls: usize,
    }

    impl ScriptedSource {
        fn new(frames: Vec<Vec<u8>>) -> Self {
            Self {
                frames: frames.into(),
                last: vec![0; 1024],
                polls: 0,
            }
        }
    }

    impl SpectrumSource for ScriptedSource {
        fn sample_rate(&self) -> u32 {
            44100
        }

        fn fft_size(&self) -> usize {
            2048
        }

        fn poll(&mut self) -> Result<Vec<u8>> {
            self.polls += 1;
            if let Some(frame) = self.frames.pop_front() {
                self.last = frame;
            }
            Ok(self.last.clone())
        }
    }

    struct FailingSource;

    impl SpectrumSource for FailingSource {
        fn sample_rate(&self) -> u32 {
            44100
        }

        fn fft_size(&self) -> usize {
            2048
        }

        fn poll(&mut self) -> Result<Vec<u8>> {
            Err(PitchError::DeviceUnavailable("unplugged".into()))
        }
    }

    /// A clock that never moves, to prove the loop is bounded anyway.
    struct FrozenClock;

    impl Clock for FrozenClock {
        fn now(&self) -> Duration {
            Duration::ZERO
        }

        fn sleep(&mut self, _duration: Duration) {}
    }

    fn frame(bins: &[(usize, u8)]) -> Vec<u8> {
        let mut f = vec![0; 1024];
        for &(bin, m) in bins {
            f[bin] = m;
        }
        f
    }

    #[test]
    fn polls_once_per_interval_over_window() {
        let mut sampler = SpectrumSampler::new(
            ScriptedSource::new(vec![]),
            ManualClock::new(),
            SamplerConfig::default(),
        );
        sampler.capture_peak().unwrap();
        // 0ms, 100ms, ..., 5000ms
        assert_eq!(sampler.into_source().polls, 51);
    }

    #[test]
    fn frozen_clock_still_terminates() {
        let mut sampler =
            SpectrumSampler::new(ScriptedSource::new(vec![]), FrozenClock, SamplerConfig::default());
        sampler.capture_peak().unwrap();
        assert_eq!(sampler.into_source().polls, SamplerConfig::default().max_polls());
    }

    #[test]
    fn single_peak_is_window_maximum() {
        let frames = vec![
            frame(&[(10, 100), (20, 50)]),
            frame(&[(20, 200), (30, 150)]),
            frame(&[(10, 120)]),
        ];
        let mut sampler =
            SpectrumSampler::new(ScriptedSource::new(frames), ManualClock::new(), SamplerConfig::default());

        let peak = sampler.capture_peak().unwrap().unwrap();
        assert_eq!(peak.bin, 20);
        assert_eq!(peak.magnitude, 200);
        assert_eq!(peak.frequency_hz, 20.0 * 44100.0 / 2048.0);
    }

    #[test]
    fn single_peak_tie_keeps_earliest() {
        let frames = vec![frame(&[(40, 90)]), frame(&[(12, 90)])];
        let mut sampler =
            SpectrumSampler::new(ScriptedSource::new(frames), ManualClock::new(), SamplerConfig::default());
        assert_eq!(sampler.capture_peak().unwrap().unwrap().bin, 40);
    }

    #[test]
    fn silence_has_no_peak() {
        let mut sampler = SpectrumSampler::new(
            ScriptedSource::new(vec![]),
            ManualClock::new(),
            SamplerConfig::default(),
        );
        assert!(sampler.capture_peak().unwrap().is_none());
        assert!(sampler.capture_peaks().unwrap().is_empty());
    }

    #[test]
    fn dc_bin_is_never_a_peak() {
        let frames = vec![frame(&[(0, 255), (5, 10)])];
        let mut sampler =
            SpectrumSampler::new(ScriptedSource::new(frames), ManualClock::new(), SamplerConfig::default());
        assert_eq!(sampler.capture_peak().unwrap().unwrap().bin, 5);
    }

    #[test]
    fn multi_peak_pools_whole_window() {
        // First poll has 7 moderate bins; the second has 3 louder ones.
        // The result must mix both polls, not just echo the last poll.
        let first: Vec<(usize, u8)> = (1..=7).map(|i| (i * 10, 100 + i as u8)).collect();
        let second = vec![(200, 250), (210, 240), (220, 230)];
        let frames = vec![frame(&first), frame(&second), vec![0; 1024]];
        let mut sampler =
            SpectrumSampler::new(ScriptedSource::new(frames), ManualClock::new(), SamplerConfig::default());

        let peaks = sampler.capture_peaks().unwrap();
        let bins: Vec<usize> = peaks.iter().map(|p| p.bin).collect();
        assert_eq!(bins, vec![200, 210, 220, 70, 60, 50, 40]);
    }

    #[test]
    fn multi_peak_deduplicates_bins() {
        let frames = vec![frame(&[(50, 100), (60, 90)]), frame(&[(50, 180)])];
        let mut sampler =
            SpectrumSampler::new(ScriptedSource::new(frames), ManualClock::new(), SamplerConfig::default());

        let peaks = sampler.capture_peaks().unwrap();
        assert_eq!(peaks.len(), 2);
        assert_eq!((peaks[0].bin, peaks[0].magnitude), (50, 180));
        assert_eq!((peaks[1].bin, peaks[1].magnitude), (60, 90));
    }

    #[test]
    fn multi_peak_retains_top_k_per_poll() {
        // 10 bins in one poll: only the 7 loudest may enter the pool.
        let bins: Vec<(usize, u8)> = (1..=10).map(|i| (i * 3, i as u8 * 10)).collect();
        let mut sampler = SpectrumSampler::new(
            ScriptedSource::new(vec![frame(&bins)]),
            ManualClock::new(),
            SamplerConfig::default(),
        );

        let peaks = sampler.capture_peaks().unwrap();
        assert_eq!(peaks.len(), 7);
        assert_eq!(peaks[0].magnitude, 100);
        assert_eq!(peaks[6].magnitude, 40);
    }

    #[test]
    fn source_error_propagates() {
        let mut sampler =
            SpectrumSampler::new(FailingSource, ManualClock::new(), SamplerConfig::default());
        assert!(matches!(
            sampler.capture_peak(),
            Err(PitchError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn max_polls_rounds_up() {
        let cfg = SamplerConfig {
            duration: Duration::from_millis(3500),
            poll_interval: Duration::from_millis(100),
            top_k: 7,
        };
        assert_eq!(cfg.max_polls(), 36);
        let cfg = SamplerConfig {
            duration: Duration::from_millis(250),
            ..cfg
        };
        assert_eq!(cfg.max_polls(), 4);
    }
}
