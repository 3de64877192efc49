use crate::prelude::{WaveformError, WaveformResult};
use crate::synth::whole_count;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-tone amplitude convention. The generators never pick one on their own;
/// each experiment variant names the factor it was built with.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmplitudeScale {
    #[default]
    Unity,
    Half,
    InverseSqrt2,
    /// The literal 0.707 used by the swept chirp variant.
    Legacy0707,
    Custom(f64),
}

impl AmplitudeScale {
    pub fn factor(self) -> f64 {
        match self {
            AmplitudeScale::Unity => 1.0,
            AmplitudeScale::Half => 0.5,
            AmplitudeScale::InverseSqrt2 => std::f64::consts::FRAC_1_SQRT_2,
            AmplitudeScale::Legacy0707 => 0.707,
            AmplitudeScale::Custom(value) => value,
        }
    }

    pub(crate) fn checked_factor(self) -> WaveformResult<f64> {
        let factor = self.factor();
        if !factor.is_finite() || factor < 0.0 {
            return Err(WaveformError::InvalidParameter(format!(
                "amplitude scale must be finite and non-negative, got {}",
                factor
            )));
        }
        Ok(factor)
    }
}

/// Generation parameters shared by every waveform kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformParams {
    /// Clipping amplitude, used only when clipping is requested.
    pub max_ampl: f64,
    /// Sample rate as a multiple of `freq1`.
    pub oversampling: f64,
    /// Tone 1 / carrier / chirp start frequency in Hz.
    pub freq1: f64,
    /// Tone 2 / chirp stop frequency in Hz.
    pub freq2: f64,
    pub num_periods: f64,
    /// Chirp ramp time in seconds.
    pub ramp_duration: f64,
    pub mod_freq: f64,
    pub mod_index: f64,
    pub phase_angle_deg: f64,
    pub step_samples: usize,
    /// Reserved; no generator applies a window yet.
    pub filter_beta: f64,
}

impl Default for WaveformParams {
    fn default() -> Self {
        Self {
            max_ampl: 1.0,
            oversampling: 100.0,
            freq1: 5.0e6,
            freq2: 500.0e6,
            num_periods: 10.0,
            ramp_duration: 10e-6,
            mod_freq: 10e3,
            mod_index: 3.0,
            phase_angle_deg: 87.0,
            step_samples: 100,
            filter_beta: 0.0,
        }
    }
}

impl WaveformParams {
    /// `oversampling × |freq1|`.
    pub fn sample_rate(&self) -> WaveformResult<f64> {
        self.require_oversampling()?;
        let base = self.period_frequency()?;
        Ok(self.oversampling * base)
    }

    /// Time covered by `num_periods` cycles of `freq1`.
    pub fn stop_time(&self) -> WaveformResult<f64> {
        let base = self.period_frequency()?;
        Ok(self.num_periods / base)
    }

    /// `oversampling × num_periods`, which must be a positive integer.
    pub fn sample_count(&self) -> WaveformResult<usize> {
        self.require_oversampling()?;
        let product = self.oversampling * self.num_periods;
        let count = whole_count(product, "sample count")?;
        if count == 0 || (product - count as f64).abs() > 1e-6 {
            return Err(WaveformError::InvalidParameter(format!(
                "oversampling {} x periods {} must give a positive whole sample count",
                self.oversampling, self.num_periods
            )));
        }
        Ok(count)
    }

    fn period_frequency(&self) -> WaveformResult<f64> {
        if !self.freq1.is_finite() {
            return Err(WaveformError::InvalidParameter(format!(
                "freq1 must be finite, got {}",
                self.freq1
            )));
        }
        if self.freq1 == 0.0 {
            return Err(WaveformError::DomainError(
                "period-based timing needs a non-zero freq1".into(),
            ));
        }
        Ok(self.freq1.abs())
    }

    fn require_oversampling(&self) -> WaveformResult<()> {
        if !self.oversampling.is_finite() || self.oversampling <= 0.0 {
            return Err(WaveformError::InvalidParameter(format!(
                "oversampling must be positive, got {}",
                self.oversampling
            )));
        }
        Ok(())
    }
}

impl fmt::Display for WaveformParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "maxAmpl     : {:5.2}", self.max_ampl)?;
        writeln!(f, "OverSamp    : {:5.2}", self.oversampling)?;
        writeln!(f, "FC1         : {:5.2}", self.freq1)?;
        writeln!(f, "FC2         : {:5.2}", self.freq2)?;
        writeln!(f, "NumPeriods  : {:5.2}", self.num_periods)?;
        writeln!(f, "RampTime    : {:e}", self.ramp_duration)?;
        writeln!(f, "FMod        : {:5.2}", self.mod_freq)?;
        writeln!(f, "ModIndex    : {:5.2}", self.mod_index)?;
        writeln!(f, "PhaseAngle  : {:5.2}", self.phase_angle_deg)?;
        writeln!(f, "StepSamples : {}", self.step_samples)?;
        writeln!(f, "fBeta       : {:5.2}", self.filter_beta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_derive_rate_and_count() {
        let params = WaveformParams::default();
        assert_eq!(params.sample_rate().unwrap(), 500e6);
        assert_eq!(params.sample_count().unwrap(), 1000);
        assert!((params.stop_time().unwrap() - 2e-6).abs() < 1e-18);
    }

    #[test]
    fn zero_frequency_is_a_domain_error() {
        let params = WaveformParams {
            freq1: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            params.sample_rate(),
            Err(WaveformError::DomainError(_))
        ));
        assert!(matches!(
            params.stop_time(),
            Err(WaveformError::DomainError(_))
        ));
    }

    #[test]
    fn negative_frequency_uses_magnitude_for_timing() {
        let params = WaveformParams {
            freq1: -500e6,
            oversampling: 4.0,
            ..Default::default()
        };
        assert_eq!(params.sample_rate().unwrap(), 2e9);
    }

    #[test]
    fn fractional_sample_count_is_rejected() {
        let params = WaveformParams {
            oversampling: 2.5,
            num_periods: 3.0,
            ..Default::default()
        };
        assert!(matches!(
            params.sample_count(),
            Err(WaveformError::InvalidParameter(_))
        ));

        let empty = WaveformParams {
            num_periods: 0.0,
            ..Default::default()
        };
        assert!(empty.sample_count().is_err());
    }

    #[test]
    fn display_echoes_key_values() {
        let echo = WaveformParams::default().to_string();
        assert!(echo.contains("maxAmpl     :  1.00"));
        assert!(echo.contains("OverSamp    : 100.00"));
        assert!(echo.lines().count() >= 6);
    }

    #[test]
    fn scale_factors_are_explicit() {
        assert_eq!(AmplitudeScale::Half.factor(), 0.5);
        assert_eq!(AmplitudeScale::Legacy0707.factor(), 0.707);
        assert!(AmplitudeScale::Custom(-1.0).checked_factor().is_err());
    }
}
