use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// Window function applied to each frame before the FFT.
///
/// Chopping audio into frames creates sharp edges, and those edges smear
/// energy into neighbouring bins (spectral leakage). A window tapers the
/// frame to zero at both ends so a pure tone shows up as one narrow peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    /// w(n) = 0.5 * (1 - cos(2πn / (N-1)))
    Hann,
    /// w(n) = 0.42 - 0.5 cos(2πn / (N-1)) + 0.08 cos(4πn / (N-1))
    ///
    /// Lower side lobes than Hann at the cost of a slightly wider main lobe.
    /// This is what browser analyser nodes use.
    #[default]
    Blackman,
}

impl Window {
    /// Precompute the window coefficients for a frame of `n` samples.
    pub fn coefficients(self, n: usize) -> Vec<f32> {
        if n <= 1 {
            return vec![1.0; n];
        }

        let scale = 2.0 * PI / (n - 1) as f32;

        (0..n)
            .map(|i| {
                let x = scale * i as f32;
                match self {
                    Window::Hann => 0.5 * (1.0 - x.cos()),
                    Window::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                }
            })
            .collect()
    }
}
