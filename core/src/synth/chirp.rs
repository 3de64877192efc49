use crate::prelude::{IqSample, Waveform, WaveformError, WaveformResult};
use crate::synth::params::AmplitudeScale;
use crate::synth::{require_finite, sample_time, segment_len};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// How the down-sweep of an up/down chirp is produced.
///
/// Neither strategy keeps phase continuous across the midpoint; they differ in
/// what the second half looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChirpJunction {
    /// Regenerate the segment from `f1` to `f0` with the mirrored phase law,
    /// restarting phase at zero.
    Mirrored,
    /// Play the up segment backwards.
    Reversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChirpSweep {
    #[default]
    Up,
    UpDown(ChirpJunction),
}

impl ChirpSweep {
    /// `true` selects an up/down sweep with the mirrored junction.
    pub fn from_flag(sweep_both_directions: bool) -> Self {
        if sweep_both_directions {
            ChirpSweep::UpDown(ChirpJunction::Mirrored)
        } else {
            ChirpSweep::Up
        }
    }
}

/// Linear FM chirp, `phase(t) = 2π(f0·t + k·t²/2)` with `k = (f1 - f0) / T`.
///
/// Each segment holds `floor(sample_rate × ramp_duration)` samples, so an
/// up/down sweep is exactly twice that long.
pub fn linear_chirp(
    freq_start: f64,
    freq_stop: f64,
    sample_rate: f64,
    ramp_duration: f64,
    sweep: ChirpSweep,
) -> WaveformResult<Waveform> {
    require_finite(freq_start, "chirp start frequency")?;
    require_finite(freq_stop, "chirp stop frequency")?;
    let points = segment_len(sample_rate, ramp_duration)?;
    let rate = (freq_stop - freq_start) / ramp_duration;

    let mut samples: Vec<IqSample> = (0..points)
        .map(|n| {
            let t = sample_time(n, sample_rate);
            IqSample::from_polar(1.0, TAU * (freq_start * t + rate * t * t / 2.0))
        })
        .collect();

    if let ChirpSweep::UpDown(junction) = sweep {
        let down: Vec<IqSample> = match junction {
            ChirpJunction::Mirrored => (0..points)
                .map(|n| {
                    let t = sample_time(n, sample_rate);
                    IqSample::from_polar(1.0, TAU * (freq_stop * t - rate * t * t / 2.0))
                })
                .collect(),
            ChirpJunction::Reversed => samples.iter().rev().copied().collect(),
        };
        samples.extend(down);
    }

    let comment = format!(
        "linear_chirp:{:.3} to {:.3}MHz sweep in {:.3}msec",
        freq_start / 1e6,
        freq_stop / 1e6,
        ramp_duration * 1e3
    );
    log::debug!(
        "linear chirp {:.3}s ramp at {:.0} MHz/s, {} samples",
        ramp_duration,
        rate / 1e6,
        samples.len()
    );
    Waveform::new(samples, sample_rate, comment)
}

/// Chirp built by integrating a linear frequency ramp from `-span/2` to
/// `+span/2`; phase is the running sum `2π/fs · Σf`.
pub fn swept_chirp(
    span: f64,
    sample_rate: f64,
    ramp_duration: f64,
    scale: AmplitudeScale,
    both_directions: bool,
) -> WaveformResult<Waveform> {
    require_finite(span, "sweep span")?;
    let amplitude = scale.checked_factor()?;
    let points = segment_len(sample_rate, ramp_duration)?;
    if points < 2 {
        return Err(WaveformError::InvalidParameter(format!(
            "swept chirp needs at least 2 samples per segment, got {}",
            points
        )));
    }
    let step = span / (points - 1) as f64;

    let mut samples = accumulate_ramp(-span / 2.0, step, points, sample_rate, amplitude);
    if both_directions {
        samples.extend(accumulate_ramp(span / 2.0, -step, points, sample_rate, amplitude));
    }

    let comment = format!(
        "swept_chirp:{:.3}MHz span sweep in {:.6}sec",
        span / 1e6,
        ramp_duration
    );
    Waveform::new(samples, sample_rate, comment)
}

fn accumulate_ramp(
    start: f64,
    step: f64,
    points: usize,
    sample_rate: f64,
    amplitude: f64,
) -> Vec<IqSample> {
    let mut frequency_sum = 0.0;
    (0..points)
        .map(|n| {
            frequency_sum += start + n as f64 * step;
            IqSample::from_polar(amplitude, TAU / sample_rate * frequency_sum)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapped(phase: f64) -> f64 {
        (phase + std::f64::consts::PI).rem_euclid(TAU) - std::f64::consts::PI
    }

    #[test]
    fn up_down_chirp_has_two_full_segments() {
        let wave = linear_chirp(1e6, 2e6, 2e9, 10e-6, ChirpSweep::from_flag(true)).unwrap();
        assert_eq!(wave.len(), 2 * 20_000);
        assert!((wave.sample_rate() - 2e9).abs() < f64::EPSILON);

        // both segments restart their own phase law at zero
        assert_eq!(wave.samples()[0], IqSample::new(1.0, 0.0));
        assert_eq!(wave.samples()[20_000], IqSample::new(1.0, 0.0));
    }

    #[test]
    fn segments_follow_their_own_start_frequency() {
        let fs = 2e9;
        let wave = linear_chirp(1e6, 2e6, fs, 10e-6, ChirpSweep::from_flag(true)).unwrap();
        let up_step = wave.samples()[1].phase();
        let down_step = wave.samples()[20_001].phase();
        let t = 1.0 / fs;
        let k = 1e6 / 10e-6;
        assert!((up_step - wrapped(TAU * (1e6 * t + k * t * t / 2.0))).abs() < 1e-9);
        assert!((down_step - wrapped(TAU * (2e6 * t - k * t * t / 2.0))).abs() < 1e-9);
    }

    #[test]
    fn up_only_chirp_has_one_segment() {
        let wave = linear_chirp(1e6, 2e6, 2e9, 10e-6, ChirpSweep::Up).unwrap();
        assert_eq!(wave.len(), 20_000);
        assert!(wave.comment().contains("1.000 to 2.000MHz sweep in 0.010msec"));
        for sample in wave.samples() {
            assert!((sample.power() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn reversed_junction_mirrors_the_up_segment() {
        let sweep = ChirpSweep::UpDown(ChirpJunction::Reversed);
        let wave = linear_chirp(-5e6, 5e6, 100e6, 1e-6, sweep).unwrap();
        let half = wave.len() / 2;
        assert_eq!(half, 100);
        for n in 0..half {
            assert_eq!(wave.samples()[n], wave.samples()[wave.len() - 1 - n]);
        }
    }

    #[test]
    fn invalid_ramp_is_rejected() {
        assert!(linear_chirp(1e6, 2e6, 2e9, 0.0, ChirpSweep::Up).is_err());
        assert!(linear_chirp(1e6, f64::NAN, 2e9, 1e-6, ChirpSweep::Up).is_err());
    }

    #[test]
    fn swept_chirp_uses_requested_scale() {
        let wave = swept_chirp(5e6, 2e9, 10e-6, AmplitudeScale::Legacy0707, true).unwrap();
        assert_eq!(wave.len(), 40_000);
        for sample in wave.samples() {
            assert!((sample.magnitude() - 0.707).abs() < 1e-9);
        }
    }

    #[test]
    fn swept_chirp_first_phase_is_first_ramp_value() {
        let fs = 1e6;
        let wave = swept_chirp(100e3, fs, 1e-3, AmplitudeScale::Unity, false).unwrap();
        assert_eq!(wave.len(), 1000);
        let expected = wrapped(TAU / fs * -50e3);
        assert!((wave.samples()[0].phase() - expected).abs() < 1e-12);
    }
}
