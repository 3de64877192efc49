use anyhow::Context;
use iqwavecore::synth::{
    dual_tone, frequency_modulated, linear_chirp, phase_step, scaled_tone, swept_chirp,
    AmplitudeScale, ChirpJunction, ChirpSweep, ModulatorShape, WaveformParams,
};
use iqwavecore::Waveform;
use serde::{Deserialize, Serialize};

fn default_half() -> AmplitudeScale {
    AmplitudeScale::Half
}

fn default_legacy_scale() -> AmplitudeScale {
    AmplitudeScale::Legacy0707
}

fn default_chirp_rate() -> f64 {
    2.0e9
}

fn default_true() -> bool {
    true
}

/// Which generator a job runs, with the knobs that are not part of
/// [`WaveformParams`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaveformKind {
    /// Complex tone at `freq1`.
    SingleTone {
        #[serde(default)]
        scale: AmplitudeScale,
    },
    /// Tones at `freq1` and `freq2`.
    DualTone {
        #[serde(default = "default_half")]
        scale: AmplitudeScale,
    },
    /// Linear FM ramp from `freq1` to `freq2` over `ramp_duration`.
    LinearChirp {
        #[serde(default = "default_chirp_rate")]
        sample_rate: f64,
        /// Adds a down segment built with the given junction.
        #[serde(default)]
        down_sweep: Option<ChirpJunction>,
    },
    /// Cumulative-sum chirp spanning `freq1` around DC.
    SweptChirp {
        #[serde(default = "default_chirp_rate")]
        sample_rate: f64,
        #[serde(default = "default_legacy_scale")]
        scale: AmplitudeScale,
        #[serde(default = "default_true")]
        both_directions: bool,
    },
    /// FM carrier at `freq1`, modulated at `mod_freq`.
    FrequencyModulated {
        #[serde(default)]
        shape: ModulatorShape,
    },
    /// `phase_angle_deg` for `step_samples`, then zero phase.
    PhaseStep {
        #[serde(default = "default_half")]
        scale: AmplitudeScale,
    },
}

impl WaveformKind {
    pub fn label(&self) -> &'static str {
        match self {
            WaveformKind::SingleTone { .. } => "single_tone",
            WaveformKind::DualTone { .. } => "dual_tone",
            WaveformKind::LinearChirp { .. } => "linear_chirp",
            WaveformKind::SweptChirp { .. } => "swept_chirp",
            WaveformKind::FrequencyModulated { .. } => "frequency_modulated",
            WaveformKind::PhaseStep { .. } => "phase_step",
        }
    }

    /// Source frequencies worth listing in the exchange banner.
    pub fn banner_frequencies(&self, params: &WaveformParams) -> Vec<(&'static str, f64)> {
        match self {
            WaveformKind::SingleTone { .. } => vec![("Tone Freq", params.freq1)],
            WaveformKind::DualTone { .. } => {
                vec![("Tone1 Freq", params.freq1), ("Tone2 Freq", params.freq2)]
            }
            WaveformKind::LinearChirp { .. } => {
                vec![("Start Freq", params.freq1), ("Stop  Freq", params.freq2)]
            }
            WaveformKind::SweptChirp { .. } => vec![("Sweep Span", params.freq1)],
            WaveformKind::FrequencyModulated { .. } => {
                vec![("Carrier", params.freq1), ("Mod Freq", params.mod_freq)]
            }
            WaveformKind::PhaseStep { .. } => Vec::new(),
        }
    }
}

impl Default for WaveformKind {
    fn default() -> Self {
        WaveformKind::SingleTone {
            scale: AmplitudeScale::Unity,
        }
    }
}

/// Runs the generator selected by `kind` against `params`.
pub fn build_waveform(kind: &WaveformKind, params: &WaveformParams) -> anyhow::Result<Waveform> {
    let waveform = match kind {
        WaveformKind::SingleTone { scale } => {
            let (sample_rate, count) = period_timing(params)?;
            scaled_tone(params.freq1, sample_rate, count, *scale)?
        }
        WaveformKind::DualTone { scale } => {
            let (sample_rate, count) = period_timing(params)?;
            dual_tone(params.freq1, params.freq2, sample_rate, count, *scale)?
        }
        WaveformKind::LinearChirp {
            sample_rate,
            down_sweep,
        } => {
            let sweep = match down_sweep {
                Some(junction) => ChirpSweep::UpDown(*junction),
                None => ChirpSweep::Up,
            };
            linear_chirp(
                params.freq1,
                params.freq2,
                *sample_rate,
                params.ramp_duration,
                sweep,
            )?
        }
        WaveformKind::SweptChirp {
            sample_rate,
            scale,
            both_directions,
        } => swept_chirp(
            params.freq1,
            *sample_rate,
            params.ramp_duration,
            *scale,
            *both_directions,
        )?,
        WaveformKind::FrequencyModulated { shape } => {
            let (sample_rate, count) = period_timing(params)?;
            frequency_modulated(
                params.freq1,
                params.mod_freq,
                params.mod_index,
                sample_rate,
                count,
                *shape,
            )?
        }
        WaveformKind::PhaseStep { scale } => {
            let sample_rate = params
                .sample_rate()
                .context("deriving phase step sample rate")?;
            phase_step(params.phase_angle_deg, params.step_samples, sample_rate, *scale)?
        }
    };

    log::debug!(
        "{}: {} samples @ {} Hz",
        kind.label(),
        waveform.len(),
        waveform.sample_rate()
    );
    Ok(waveform)
}

fn period_timing(params: &WaveformParams) -> anyhow::Result<(f64, usize)> {
    let sample_rate = params.sample_rate().context("deriving sample rate")?;
    let count = params.sample_count().context("deriving sample count")?;
    Ok((sample_rate, count))
}
