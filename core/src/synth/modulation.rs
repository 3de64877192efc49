use crate::prelude::{IqSample, Waveform, WaveformResult};
use crate::synth::params::AmplitudeScale;
use crate::synth::{require_count, require_finite, require_sample_rate, sample_time};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Shape of the modulating signal `m(t)`; both have unit amplitude and
/// start at zero heading positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulatorShape {
    #[default]
    Sine,
    Triangle,
}

impl ModulatorShape {
    pub fn value(self, mod_freq: f64, t: f64) -> f64 {
        match self {
            ModulatorShape::Sine => (TAU * mod_freq * t).sin(),
            ModulatorShape::Triangle => triangle(mod_freq * t),
        }
    }

    fn label(self) -> &'static str {
        match self {
            ModulatorShape::Sine => "sine",
            ModulatorShape::Triangle => "triangle",
        }
    }
}

/// Unit triangle over one cycle of `cycles`: 0 → 1 → 0 → -1 → 0.
fn triangle(cycles: f64) -> f64 {
    let x = cycles - cycles.floor();
    if x < 0.25 {
        4.0 * x
    } else if x < 0.75 {
        2.0 - 4.0 * x
    } else {
        4.0 * x - 4.0
    }
}

/// FM tone, `phase(t) = 2π·fc·t + index·m(t)`.
pub fn frequency_modulated(
    carrier_freq: f64,
    mod_freq: f64,
    modulation_index: f64,
    sample_rate: f64,
    sample_count: usize,
    shape: ModulatorShape,
) -> WaveformResult<Waveform> {
    require_finite(carrier_freq, "carrier frequency")?;
    require_finite(mod_freq, "modulation frequency")?;
    require_finite(modulation_index, "modulation index")?;
    require_sample_rate(sample_rate)?;
    require_count(sample_count, "sample count")?;

    let samples = (0..sample_count)
        .map(|n| {
            let t = sample_time(n, sample_rate);
            let phase = TAU * carrier_freq * t + modulation_index * shape.value(mod_freq, t);
            IqSample::from_polar(1.0, phase)
        })
        .collect();

    let comment = format!(
        "frequency_modulated:FC:{:.3}MHz FMod:{:.3}MHz index {:.2} {}",
        carrier_freq / 1e6,
        mod_freq / 1e6,
        modulation_index,
        shape.label()
    );
    Waveform::new(samples, sample_rate, comment)
}

/// Constant-envelope phase step: `step` samples at `angle_degrees` followed by
/// `step` samples at zero phase.
pub fn phase_step(
    angle_degrees: f64,
    step_sample_count: usize,
    sample_rate: f64,
    scale: AmplitudeScale,
) -> WaveformResult<Waveform> {
    require_finite(angle_degrees, "phase angle")?;
    require_count(step_sample_count, "step sample count")?;
    require_sample_rate(sample_rate)?;
    let amplitude = scale.checked_factor()?;

    let stepped = IqSample::from_polar(amplitude, angle_degrees.to_radians());
    let reference = IqSample::from_polar(amplitude, 0.0);
    let mut samples = vec![stepped; step_sample_count];
    samples.extend(std::iter::repeat(reference).take(step_sample_count));

    let comment = format!(
        "phase_step:{:.2}deg step every {} samples",
        angle_degrees, step_sample_count
    );
    Waveform::new(samples, sample_rate, comment)
}
