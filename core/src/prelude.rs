use crate::container::WaveformFile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One complex baseband sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IqSample {
    pub i: f64,
    pub q: f64,
}

impl IqSample {
    pub fn new(i: f64, q: f64) -> Self {
        Self { i, q }
    }

    /// Sample on a circle of radius `amplitude` at `phase` radians.
    pub fn from_polar(amplitude: f64, phase: f64) -> Self {
        Self {
            i: amplitude * phase.cos(),
            q: amplitude * phase.sin(),
        }
    }

    /// Instantaneous power, `I² + Q²`.
    pub fn power(&self) -> f64 {
        self.i * self.i + self.q * self.q
    }

    pub fn magnitude(&self) -> f64 {
        self.power().sqrt()
    }

    pub fn phase(&self) -> f64 {
        self.q.atan2(self.i)
    }

    /// True when either component falls outside the int16 encoding range.
    pub fn exceeds_unit_range(&self) -> bool {
        !(self.i.abs() <= 1.0 && self.q.abs() <= 1.0)
    }
}

impl std::ops::Add for IqSample {
    type Output = IqSample;

    fn add(self, rhs: IqSample) -> IqSample {
        IqSample::new(self.i + rhs.i, self.q + rhs.q)
    }
}

/// Sampled I/Q sequence with its clock and a free-text comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    samples: Vec<IqSample>,
    sample_rate: f64,
    comment: String,
}

impl Waveform {
    pub fn new(
        samples: Vec<IqSample>,
        sample_rate: f64,
        comment: impl Into<String>,
    ) -> WaveformResult<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(WaveformError::InvalidParameter(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            comment: comment.into(),
        })
    }

    /// Builds a waveform from separate I and Q arrays of equal length.
    pub fn from_components(
        i: &[f64],
        q: &[f64],
        sample_rate: f64,
        comment: impl Into<String>,
    ) -> WaveformResult<Self> {
        if i.len() != q.len() {
            return Err(WaveformError::InvalidParameter(format!(
                "I and Q lengths differ ({} vs {})",
                i.len(),
                q.len()
            )));
        }
        let samples = i
            .iter()
            .zip(q)
            .map(|(&i, &q)| IqSample::new(i, q))
            .collect();
        Self::new(samples, sample_rate, comment)
    }

    pub fn samples(&self) -> &[IqSample] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Concatenates `other` after this waveform. Both must share a clock.
    pub fn append(&mut self, other: Waveform) -> WaveformResult<()> {
        if other.sample_rate != self.sample_rate {
            return Err(WaveformError::InvalidParameter(format!(
                "cannot append waveform at {} Hz to one at {} Hz",
                other.sample_rate, self.sample_rate
            )));
        }
        self.samples.extend(other.samples);
        Ok(())
    }
}

/// Error taxonomy shared by synthesis and encoding.
#[derive(thiserror::Error, Debug)]
pub enum WaveformError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("domain error: {0}")]
    DomainError(String),
    #[error("degenerate waveform: {0}")]
    DegenerateWaveform(String),
    #[error("malformed waveform container: {0}")]
    Format(String),
    #[error("i/o failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WaveformError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        WaveformError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type WaveformResult<T> = Result<T, WaveformError>;

/// Downstream consumer of a finished waveform, e.g. a file writer or an
/// instrument transport. Sinks receive the synthesized samples together with
/// the encoded container so they never re-derive byte counts.
pub trait WaveformSink {
    fn consume(&mut self, waveform: &Waveform, file: &WaveformFile) -> WaveformResult<()>;

    fn finish(&mut self) -> WaveformResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_components_rejects_length_mismatch() {
        let err = Waveform::from_components(&[0.1, 0.2], &[0.1], 1000.0, "").unwrap_err();
        assert!(matches!(err, WaveformError::InvalidParameter(_)));
    }

    #[test]
    fn new_rejects_non_positive_rate() {
        assert!(Waveform::new(Vec::new(), 0.0, "").is_err());
        assert!(Waveform::new(Vec::new(), f64::NAN, "").is_err());
    }

    #[test]
    fn append_requires_matching_clock() {
        let mut a = Waveform::new(vec![IqSample::new(1.0, 0.0)], 1000.0, "a").unwrap();
        let b = Waveform::new(vec![IqSample::new(0.0, 1.0)], 2000.0, "b").unwrap();
        assert!(a.append(b).is_err());

        let c = Waveform::new(vec![IqSample::new(0.0, 1.0)], 1000.0, "c").unwrap();
        a.append(c).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a.comment(), "a");
        assert_eq!(a.samples()[1], IqSample::new(0.0, 1.0));
    }

    #[test]
    fn overflow_detection_covers_both_signs() {
        assert!(!IqSample::new(1.0, -1.0).exceeds_unit_range());
        assert!(IqSample::new(-1.01, 0.0).exceeds_unit_range());
        assert!(IqSample::new(0.0, f64::NAN).exceeds_unit_range());
    }
}
