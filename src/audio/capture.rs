use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;

use crate::analysis::sampler::SpectrumSource;
use crate::dsp::spectrum::SpectrumAnalyser;
use crate::error::{classify_capture_error, PitchError, Result};

/// Live microphone input exposed as a spectrum source.
///
/// Architecture:
///   cpal audio callback (audio thread)
///     → keeps the first channel only and appends it to a rolling buffer of
///       fft_size samples
///   cpal error callback
///     → records the first stream failure
///   poll() (main thread)
///     → fails with that recorded error, otherwise snapshots the buffer and
///       runs it through the analyser
///
/// The cpal stream is owned here and stopped exactly once, when the source
/// is dropped. Since the sampler owns the source for the length of one
/// capture, the microphone is released on every exit path.
pub struct MicrophoneSource {
    stream: Option<cpal::Stream>,
    buffer: Arc<Mutex<VecDeque<f32>>>,
    stream_error: Arc<Mutex<Option<String>>>,
    analyser: SpectrumAnalyser,
    sample_rate: u32,
    device_name: String,
}

impl MicrophoneSource {
    /// Open an input device and start streaming into the analyser.
    ///
    /// `device` is matched case-insensitively as a substring of the device
    /// name; "default" picks the system default input. Any failure is
    /// classified into `PermissionDenied` or `DeviceUnavailable`.
    pub fn open(device: &str, analyser: SpectrumAnalyser) -> Result<Self> {
        let host = cpal::default_host();
        let device = find_input_device(&host, device)?;
        let device_name = device.name().unwrap_or_else(|_| "<unknown>".into());

        let config = device
            .default_input_config()
            .map_err(|e| classify_capture_error(&e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let format = config.sample_format();
        let capacity = analyser.fft_size();

        let buffer = Arc::new(Mutex::new(VecDeque::with_capacity(capacity)));
        let stream_error = Arc::new(Mutex::new(None));

        let stream = match format {
            SampleFormat::F32 => {
                let buffer = Arc::clone(&buffer);
                device.build_input_stream(
                    &config.into(),
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        push_mono(&buffer, capacity, data.iter().step_by(channels).copied());
                    },
                    error_callback(Arc::clone(&stream_error)),
                    None,
                )
            }
            SampleFormat::I16 => {
                let buffer = Arc::clone(&buffer);
                device.build_input_stream(
                    &config.into(),
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        push_mono(
                            &buffer,
                            capacity,
                            data.iter()
                                .step_by(channels)
                                .map(|&s| s as f32 / i16::MAX as f32),
                        );
                    },
                    error_callback(Arc::clone(&stream_error)),
                    None,
                )
            }
            other => {
                return Err(PitchError::DeviceUnavailable(format!(
                    "Unsupported sample format: {other:?}"
                )))
            }
        }
        .map_err(|e| classify_capture_error(&e.to_string()))?;

        stream
            .play()
            .map_err(|e| classify_capture_error(&e.to_string()))?;

        tracing::info!(
            device = %device_name,
            sample_rate,
            channels,
            format = ?format,
            "input stream started"
        );

        Ok(Self {
            stream: Some(stream),
            buffer,
            stream_error,
            analyser,
            sample_rate,
            device_name,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl SpectrumSource for MicrophoneSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn fft_size(&self) -> usize {
        self.analyser.fft_size()
    }

    fn poll(&mut self) -> Result<Vec<u8>> {
        check_stream(&self.stream_error)?;
        let frame: Vec<f32> = self
            .buffer
            .lock()
            .map(|buf| buf.iter().copied().collect())
            .map_err(|_| PitchError::DeviceUnavailable("audio buffer poisoned".into()))?;
        Ok(self.analyser.byte_frequency_data(&frame))
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            // Pausing first stops callbacks before the backend tears down.
            let _ = stream.pause();
            drop(stream);
            tracing::info!(device = %self.device_name, "input stream released");
        }
    }
}

/// Find an input device by (partial, case-insensitive) name.
fn find_input_device(host: &cpal::Host, name: &str) -> Result<cpal::Device> {
    if name.is_empty() || name.eq_ignore_ascii_case("default") {
        return host
            .default_input_device()
            .ok_or_else(|| PitchError::DeviceUnavailable("No default input device found".into()));
    }

    let wanted = name.to_lowercase();
    let devices = host
        .input_devices()
        .map_err(|e| classify_capture_error(&e.to_string()))?;

    for device in devices {
        if let Ok(device_name) = device.name() {
            if device_name.to_lowercase().contains(&wanted) {
                return Ok(device);
            }
        }
    }

    Err(PitchError::DeviceUnavailable(format!(
        "No input device matching {name:?}"
    )))
}

/// Append mono samples, keeping only the newest `capacity`.
///
/// Called from the audio thread, so it uses `try_lock` and drops the chunk
/// rather than block if the main thread is reading.
fn push_mono<I>(buffer: &Mutex<VecDeque<f32>>, capacity: usize, samples: I)
where
    I: Iterator<Item = f32>,
{
    if let Ok(mut buf) = buffer.try_lock() {
        buf.extend(samples);
        let excess = buf.len().saturating_sub(capacity);
        buf.drain(..excess);
    }
}

/// Error callback for the input stream: logs and keeps the first failure
/// so the next poll can report it.
fn error_callback(slot: Arc<Mutex<Option<String>>>) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| record_stream_error(&slot, &err.to_string())
}

fn record_stream_error(slot: &Mutex<Option<String>>, message: &str) {
    tracing::warn!(error = %message, "input stream error");
    if let Ok(mut recorded) = slot.lock() {
        recorded.get_or_insert_with(|| message.to_string());
    }
}

/// Fail with the recorded stream error, if any.
fn check_stream(slot: &Mutex<Option<String>>) -> Result<()> {
    let recorded = slot
        .lock()
        .map_err(|_| PitchError::DeviceUnavailable("stream error slot poisoned".into()))?;
    match recorded.as_deref() {
        Some(message) => Err(classify_capture_error(message)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_mono_keeps_newest_samples() {
        let buffer = Mutex::new(VecDeque::new());
        push_mono(&buffer, 4, [1.0, 2.0, 3.0].into_iter());
        push_mono(&buffer, 4, [4.0, 5.0, 6.0].into_iter());
        let buf = buffer.lock().unwrap();
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn push_mono_skips_when_locked() {
        let buffer = Mutex::new(VecDeque::new());
        let guard = buffer.lock().unwrap();
        push_mono(&buffer, 4, [1.0].into_iter());
        drop(guard);
        assert!(buffer.lock().unwrap().is_empty());
    }

    #[test]
    fn stereo_downmix_takes_first_channel() {
        let buffer = Mutex::new(VecDeque::new());
        let interleaved = [0.1_f32, 0.9, 0.2, 0.8];
        push_mono(&buffer, 8, interleaved.iter().step_by(2).copied());
        let buf = buffer.lock().unwrap();
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![0.1, 0.2]);
    }

    #[test]
    fn healthy_stream_polls_normally() {
        let slot = Mutex::new(None);
        assert_eq!(check_stream(&slot), Ok(()));
    }

    #[test]
    fn stream_failure_surfaces_on_next_poll() {
        let slot = Mutex::new(None);
        record_stream_error(&slot, "The requested device is no longer available");
        record_stream_error(&slot, "Permission denied");
        assert_eq!(
            check_stream(&slot),
            Err(PitchError::DeviceUnavailable(
                "The requested device is no longer available".into()
            ))
        );
    }

    #[test]
    fn stream_permission_failure_is_classified() {
        let slot = Mutex::new(None);
        record_stream_error(&slot, "ALSA function 'snd_pcm_open' failed: Permission denied");
        assert!(matches!(check_stream(&slot), Err(PitchError::PermissionDenied(_))));
    }
}
