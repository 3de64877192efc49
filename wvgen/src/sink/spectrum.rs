use iqwavecore::container::WaveformFile;
use iqwavecore::math::{FftHelper, SpectrumBin};
use iqwavecore::telemetry::LogManager;
use iqwavecore::{Waveform, WaveformResult, WaveformSink};

/// Reports the dominant spectral line of each waveform instead of plotting it.
pub struct SpectrumSink {
    logger: LogManager,
    peaks: Vec<SpectrumBin>,
}

impl SpectrumSink {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("spectrum"),
            peaks: Vec::new(),
        }
    }

    pub fn last_peak(&self) -> Option<&SpectrumBin> {
        self.peaks.last()
    }
}

impl Default for SpectrumSink {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveformSink for SpectrumSink {
    fn consume(&mut self, waveform: &Waveform, file: &WaveformFile) -> WaveformResult<()> {
        let spectrum = FftHelper::centered_spectrum(waveform)?;
        if let Some(peak) = spectrum.peak() {
            self.logger.record(&format!(
                "peak {:.3} MHz at {:.4} (resolution {:.3} kHz, level offs {})",
                peak.frequency / 1e6,
                peak.magnitude,
                spectrum.resolution() / 1e3,
                file.levels().level_offs()
            ));
            self.peaks.push(*peak);
        }
        Ok(())
    }
}
