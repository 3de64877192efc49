use crate::math::StatsHelper;
use crate::prelude::{IqSample, Waveform, WaveformError, WaveformResult};
use serde::{Deserialize, Serialize};

/// RMS and peak headroom written to `{LEVEL OFFS:...}`.
///
/// Both figures are `10·log10(full scale / level)`, so samples inside the
/// unit circle give non-negative offsets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelStatistics {
    pub rms_db: f64,
    pub peak_db: f64,
}

impl LevelStatistics {
    pub fn compute(waveform: &Waveform) -> WaveformResult<Self> {
        Self::from_samples(waveform.samples())
    }

    pub fn from_samples(samples: &[IqSample]) -> WaveformResult<Self> {
        if samples.is_empty() {
            return Err(WaveformError::DegenerateWaveform(
                "no samples to measure".into(),
            ));
        }
        let total = StatsHelper::total_power(samples);
        let peak = StatsHelper::max_power(samples);
        if !(total > 0.0) || !(peak > 0.0) {
            return Err(WaveformError::DegenerateWaveform(
                "all-zero waveform has no defined RMS or peak level".into(),
            ));
        }

        Ok(Self {
            rms_db: 10.0 * (samples.len() as f64 / total).log10(),
            peak_db: 10.0 * (1.0 / peak).log10(),
        })
    }

    /// Header value, both figures to four decimals.
    pub fn level_offs(&self) -> String {
        format!("{:.4},{:.4}", self.rms_db, self.peak_db)
    }
}
