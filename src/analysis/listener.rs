use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{PitchError, Result};

/// Guards the "listen" action against running twice at once.
///
/// A capture holds the audio device for several seconds; starting a second
/// one while the first is running is rejected instead of queued. The busy
/// flag is cleared by a drop guard, so it is restored on success, on error,
/// and while unwinding from a panic.
#[derive(Debug, Default)]
pub struct Listener {
    busy: AtomicBool,
}

/// Clears the busy flag when the capture ends, however it ends.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Listener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a capture is currently running.
    #[allow(dead_code)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run `capture` with the busy flag set.
    ///
    /// Fails with `CaptureInProgress` without calling `capture` if another
    /// capture holds the flag.
    pub fn capture<T, F>(&self, capture: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("capture requested while another is running");
            return Err(PitchError::CaptureInProgress);
        }

        let _guard = BusyGuard { flag: &self.busy };
        capture()
    }
}
