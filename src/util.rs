use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};

/// Compute peak amplitude in dB (relative to full scale).
/// Returns -infinity for all-zero input.
pub fn peak_db(samples: &[f32]) -> f32 {
    let peak = samples
        .iter()
        .fold(0.0_f32, |max, &s| max.max(s.abs()));

    if peak == 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * peak.log10()
    }
}

/// Block until the user presses Enter, using crossterm raw mode.
///
/// Raw mode is switched off again even if reading the terminal fails.
pub fn wait_for_enter() -> Result<()> {
    crossterm::terminal::enable_raw_mode()?;

    let outcome = (|| -> Result<()> {
        loop {
            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && key.code == KeyCode::Enter {
                        return Ok(());
                    }
                }
            }
        }
    })();

    crossterm::terminal::disable_raw_mode()?;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_db_full_scale() {
        // A signal that hits exactly 1.0 should be 0 dB
        let samples = vec![0.0, 0.5, 1.0, -0.5];
        assert!((peak_db(&samples) - 0.0).abs() < 0.01);
    }

    #[test]
    fn peak_db_half_scale() {
        // Peak of 0.5 → 20*log10(0.5) ≈ -6.02 dB
        let samples = vec![0.0, -0.5, 0.3];
        assert!((peak_db(&samples) - (-6.02)).abs() < 0.1);
    }

    #[test]
    fn peak_db_silence() {
        let samples = vec![0.0, 0.0, 0.0];
        assert!(peak_db(&samples).is_infinite());
        assert!(peak_db(&samples).is_sign_negative());
    }
}
