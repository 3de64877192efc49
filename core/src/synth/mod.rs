//! Waveform generators. Every function here is a pure function of its
//! arguments and returns a freshly owned [`Waveform`](crate::Waveform).

pub mod chirp;
pub mod clip;
pub mod modulation;
pub mod params;
pub mod tone;

pub use chirp::{linear_chirp, swept_chirp, ChirpJunction, ChirpSweep};
pub use clip::clip_amplitude;
pub use modulation::{frequency_modulated, phase_step, ModulatorShape};
pub use params::{AmplitudeScale, WaveformParams};
pub use tone::{dual_tone, scaled_tone, single_tone};

use crate::prelude::{WaveformError, WaveformResult};

pub(crate) fn require_sample_rate(sample_rate: f64) -> WaveformResult<()> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(WaveformError::InvalidParameter(format!(
            "sample rate must be positive and finite, got {}",
            sample_rate
        )));
    }
    Ok(())
}

pub(crate) fn require_count(count: usize, what: &str) -> WaveformResult<()> {
    if count == 0 {
        return Err(WaveformError::InvalidParameter(format!(
            "{} must be at least 1",
            what
        )));
    }
    Ok(())
}

pub(crate) fn require_finite(value: f64, what: &str) -> WaveformResult<()> {
    if !value.is_finite() {
        return Err(WaveformError::InvalidParameter(format!(
            "{} must be finite, got {}",
            what, value
        )));
    }
    Ok(())
}

/// Converts a real-valued sample count to an integer. Products within 1e-6 of
/// an integer snap to it so `2e9 * 10e-6` yields 20000 rather than 19999.
pub(crate) fn whole_count(value: f64, what: &str) -> WaveformResult<usize> {
    if !value.is_finite() || value < 0.0 {
        return Err(WaveformError::InvalidParameter(format!(
            "{} must be a finite non-negative number, got {}",
            what, value
        )));
    }
    let nearest = value.round();
    let count = if (value - nearest).abs() < 1e-6 {
        nearest
    } else {
        value.floor()
    };
    Ok(count as usize)
}

/// Number of samples covering `duration` seconds at `sample_rate`, i.e.
/// `floor(sample_rate * duration)`.
pub fn segment_len(sample_rate: f64, duration: f64) -> WaveformResult<usize> {
    require_sample_rate(sample_rate)?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(WaveformError::InvalidParameter(format!(
            "duration must be positive, got {}",
            duration
        )));
    }
    let count = whole_count(sample_rate * duration, "segment length")?;
    require_count(count, "segment length")?;
    Ok(count)
}

#[inline]
pub(crate) fn sample_time(index: usize, sample_rate: f64) -> f64 {
    index as f64 / sample_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_len_snaps_near_integers() {
        assert_eq!(segment_len(2e9, 10e-6).unwrap(), 20_000);
        assert_eq!(segment_len(1000.0, 0.0105).unwrap(), 10);
    }

    #[test]
    fn segment_len_rejects_empty_segments() {
        assert!(segment_len(1000.0, 0.0001).is_err());
        assert!(segment_len(1000.0, -1.0).is_err());
        assert!(segment_len(0.0, 1.0).is_err());
    }
}
