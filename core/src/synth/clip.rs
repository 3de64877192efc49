use crate::prelude::{IqSample, Waveform, WaveformError, WaveformResult};

/// Saturates I and Q independently to `±max_ampl`. Applying it twice with the
/// same limit gives the same result as applying it once.
pub fn clip_amplitude(waveform: &Waveform, max_ampl: f64) -> WaveformResult<Waveform> {
    if !max_ampl.is_finite() || max_ampl < 0.0 {
        return Err(WaveformError::InvalidParameter(format!(
            "clip amplitude must be finite and non-negative, got {}",
            max_ampl
        )));
    }

    let mut clipped = 0usize;
    let samples = waveform
        .samples()
        .iter()
        .map(|s| {
            let out = IqSample::new(s.i.clamp(-max_ampl, max_ampl), s.q.clamp(-max_ampl, max_ampl));
            if out != *s {
                clipped += 1;
            }
            out
        })
        .collect();

    if clipped > 0 {
        log::debug!("clipped {} samples to +/-{}", clipped, max_ampl);
    }
    Waveform::new(samples, waveform.sample_rate(), waveform.comment())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::tone::dual_tone;
    use crate::synth::AmplitudeScale;

    #[test]
    fn clipping_saturates_components_independently() {
        let wave = Waveform::from_components(&[1.5, -0.2], &[0.3, -2.0], 1e3, "c").unwrap();
        let out = clip_amplitude(&wave, 1.0).unwrap();
        assert_eq!(out.samples()[0], IqSample::new(1.0, 0.3));
        assert_eq!(out.samples()[1], IqSample::new(-0.2, -1.0));
        assert_eq!(out.comment(), "c");
    }

    #[test]
    fn clipping_is_idempotent() {
        let wave = dual_tone(2e6, 3e6, 100e6, 500, AmplitudeScale::Unity).unwrap();
        let once = clip_amplitude(&wave, 0.8).unwrap();
        let twice = clip_amplitude(&once, 0.8).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn negative_limit_is_rejected() {
        let wave = Waveform::from_components(&[0.1], &[0.1], 1e3, "").unwrap();
        assert!(clip_amplitude(&wave, -0.5).is_err());
        assert!(clip_amplitude(&wave, f64::NAN).is_err());
    }
}
