use crate::prelude::{IqSample, Waveform, WaveformError, WaveformResult};
use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Helper that wraps the `rustfft` planner for reuse.
pub struct FftHelper {
    fft: Arc<dyn Fft<f64>>,
    size: usize,
}

/// One bin of a centered spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumBin {
    pub frequency: f64,
    pub magnitude: f64,
}

/// Magnitude spectrum ordered from the most negative frequency upward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    bins: Vec<SpectrumBin>,
    resolution: f64,
}

impl Spectrum {
    pub fn bins(&self) -> &[SpectrumBin] {
        &self.bins
    }

    /// Bin spacing in Hz.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn peak(&self) -> Option<&SpectrumBin> {
        self.bins
            .iter()
            .max_by(|a, b| a.magnitude.total_cmp(&b.magnitude))
    }
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self { fft, size }
    }

    /// Forward transform of `I + jQ`, zero-padded or truncated to the plan size.
    pub fn forward(&self, samples: &[IqSample]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = samples
            .iter()
            .take(self.size)
            .map(|s| Complex64::new(s.i, s.q))
            .collect();
        buffer.resize(self.size, Complex64::zero());
        self.fft.process(&mut buffer);
        buffer
    }

    /// Spectrum normalized by length and shifted so DC sits in the middle,
    /// matching the display a plotting consumer would draw.
    pub fn centered_spectrum(waveform: &Waveform) -> WaveformResult<Spectrum> {
        let n = waveform.len();
        if n == 0 {
            return Err(WaveformError::DegenerateWaveform(
                "cannot transform an empty waveform".into(),
            ));
        }
        let helper = FftHelper::new(n);
        let transformed = helper.forward(waveform.samples());
        let resolution = waveform.sample_rate() / n as f64;
        let half = n / 2;

        let bins = (0..n)
            .map(|index| {
                let source = (index + n - half) % n;
                SpectrumBin {
                    frequency: (index as f64 - half as f64) * resolution,
                    magnitude: transformed[source].norm() / n as f64,
                }
            })
            .collect();

        Ok(Spectrum { bins, resolution })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::single_tone;

    #[test]
    fn fft_helper_returns_same_length() {
        let helper = FftHelper::new(4);
        let output = helper.forward(&[IqSample::new(1.0, 0.0), IqSample::new(-1.0, 0.0)]);
        assert_eq!(output.len(), 4);
    }

    #[test]
    fn centered_spectrum_locates_tone() {
        let wave = single_tone(100.0, 1000.0, 100).unwrap();
        let spectrum = FftHelper::centered_spectrum(&wave).unwrap();
        assert_eq!(spectrum.bins().len(), 100);
        assert_eq!(spectrum.resolution(), 10.0);
        assert_eq!(spectrum.bins()[0].frequency, -500.0);

        let peak = spectrum.peak().unwrap();
        assert!((peak.frequency - 100.0).abs() < 1e-9);
        assert!((peak.magnitude - 1.0).abs() < 1e-9);
    }

    #[test]
    fn negative_tone_lands_below_dc() {
        let wave = single_tone(-200.0, 1000.0, 50).unwrap();
        let spectrum = FftHelper::centered_spectrum(&wave).unwrap();
        assert!((spectrum.peak().unwrap().frequency + 200.0).abs() < 1e-9);
    }
}
