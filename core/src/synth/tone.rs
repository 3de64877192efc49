use crate::prelude::{IqSample, Waveform, WaveformResult};
use crate::synth::params::AmplitudeScale;
use crate::synth::{require_count, require_finite, require_sample_rate, sample_time};
use std::f64::consts::TAU;

/// Unit-amplitude complex tone: `I = cos(2πft)`, `Q = sin(2πft)`.
pub fn single_tone(freq: f64, sample_rate: f64, sample_count: usize) -> WaveformResult<Waveform> {
    scaled_tone(freq, sample_rate, sample_count, AmplitudeScale::Unity)
}

/// Complex tone with an explicit amplitude convention.
pub fn scaled_tone(
    freq: f64,
    sample_rate: f64,
    sample_count: usize,
    scale: AmplitudeScale,
) -> WaveformResult<Waveform> {
    require_finite(freq, "tone frequency")?;
    require_sample_rate(sample_rate)?;
    require_count(sample_count, "sample count")?;
    let amplitude = scale.checked_factor()?;

    let samples = tone_samples(freq, amplitude, sample_rate, sample_count);
    let comment = format!(
        "single_tone:{:.3}MHz tone {} samples @ {:.3}MHz",
        freq / 1e6,
        sample_count,
        sample_rate / 1e6
    );
    Waveform::new(samples, sample_rate, comment)
}

/// Sum of two complex tones, each multiplied by `scale`.
pub fn dual_tone(
    freq1: f64,
    freq2: f64,
    sample_rate: f64,
    sample_count: usize,
    scale: AmplitudeScale,
) -> WaveformResult<Waveform> {
    require_finite(freq1, "tone 1 frequency")?;
    require_finite(freq2, "tone 2 frequency")?;
    require_sample_rate(sample_rate)?;
    require_count(sample_count, "sample count")?;
    let amplitude = scale.checked_factor()?;

    let first = tone_samples(freq1, amplitude, sample_rate, sample_count);
    let second = tone_samples(freq2, amplitude, sample_rate, sample_count);
    let samples = first.into_iter().zip(second).map(|(a, b)| a + b).collect();

    let comment = format!(
        "dual_tone:{:.3}MHz {:.3}MHz tones @ {:.3}MHz",
        freq1 / 1e6,
        freq2 / 1e6,
        sample_rate / 1e6
    );
    Waveform::new(samples, sample_rate, comment)
}

fn tone_samples(freq: f64, amplitude: f64, sample_rate: f64, count: usize) -> Vec<IqSample> {
    (0..count)
        .map(|n| IqSample::from_polar(amplitude, TAU * freq * sample_time(n, sample_rate)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::StatsHelper;
    use crate::prelude::WaveformError;

    #[test]
    fn single_tone_has_unit_magnitude() {
        for &(freq, rate, count) in &[(5e6, 500e6, 1000), (-2.5e6, 10e6, 333), (0.0, 1.0, 8)] {
            let wave = single_tone(freq, rate, count).unwrap();
            assert_eq!(wave.len(), count);
            for sample in wave.samples() {
                assert!((sample.power() - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn single_tone_advances_phase_per_sample() {
        let wave = single_tone(1e3, 8e3, 8).unwrap();
        let quarter = wave.samples()[2];
        assert!(quarter.i.abs() < 1e-12);
        assert!((quarter.q - 1.0).abs() < 1e-12);
        assert_eq!(wave.samples()[0], IqSample::new(1.0, 0.0));
    }

    #[test]
    fn negative_frequency_rotates_clockwise() {
        let wave = single_tone(-1e3, 8e3, 4).unwrap();
        assert!((wave.samples()[2].q + 1.0).abs() < 1e-12);
    }

    #[test]
    fn dual_tone_peak_is_bounded_by_scale() {
        for scale in [AmplitudeScale::Half, AmplitudeScale::InverseSqrt2] {
            let wave = dual_tone(2e6, 3e6, 200e6, 2000, scale).unwrap();
            let peak = StatsHelper::peak_magnitude(wave.samples());
            assert!(peak <= 2.0 * scale.factor() + 1e-12);
        }
    }

    #[test]
    fn dual_tone_with_half_scale_starts_at_full_scale() {
        let wave = dual_tone(2e6, 3e6, 200e6, 10, AmplitudeScale::Half).unwrap();
        assert!((wave.samples()[0].i - 1.0).abs() < 1e-12);
        assert!(wave.comment().starts_with("dual_tone:"));
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        assert!(matches!(
            single_tone(1e6, 10e6, 0),
            Err(WaveformError::InvalidParameter(_))
        ));
        assert!(single_tone(f64::NAN, 10e6, 10).is_err());
        assert!(single_tone(1e6, -10e6, 10).is_err());
        assert!(scaled_tone(1e6, 10e6, 10, AmplitudeScale::Custom(f64::INFINITY)).is_err());
    }
}
