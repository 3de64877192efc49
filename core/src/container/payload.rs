use crate::prelude::{IqSample, Waveform, WaveformError, WaveformResult};
use crate::telemetry::LogManager;
use serde::{Deserialize, Serialize};

/// Normalized ±1.0 maps to ±32767.
pub const FULL_SCALE: f64 = 32767.0;
pub const TERMINATOR: u8 = b'}';

/// What happens to a value that rounds outside the int16 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Two's-complement wrap, the behavior existing waveform files were
    /// produced with.
    #[default]
    Wrap,
    /// Clamp to `i16::MIN..=i16::MAX`.
    Saturate,
}

/// A sample whose I or Q magnitude exceeded 1.0 when it was encoded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmplitudeOverflow {
    pub index: usize,
    pub sample: IqSample,
}

/// Interleaved little-endian int16 I/Q bytes plus the closing `}`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPayload {
    bytes: Vec<u8>,
    overflows: Vec<AmplitudeOverflow>,
}

impl EncodedPayload {
    /// Everything that follows the `#`, terminator included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw I/Q bytes without the terminator, for transports that frame the
    /// data themselves.
    pub fn iq_bytes(&self) -> &[u8] {
        &self.bytes[..self.bytes.len() - 1]
    }

    /// Length announced in `{WAVEFORM-N:`; equals `as_bytes().len()`.
    pub fn declared_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn overflows(&self) -> &[AmplitudeOverflow] {
        &self.overflows
    }

    pub fn has_overflow(&self) -> bool {
        !self.overflows.is_empty()
    }
}

/// Scales and rounds one component to int16. Ties round to even.
pub fn quantize(value: f64, policy: OverflowPolicy) -> i16 {
    let scaled = (value * FULL_SCALE).round_ties_even();
    match policy {
        OverflowPolicy::Wrap => scaled as i64 as i16,
        OverflowPolicy::Saturate => scaled.clamp(i16::MIN as f64, i16::MAX as f64) as i16,
    }
}

pub fn encode_payload(waveform: &Waveform, policy: OverflowPolicy) -> EncodedPayload {
    let samples = waveform.samples();
    let mut bytes = Vec::with_capacity(4 * samples.len() + 1);
    let mut overflows = Vec::new();

    for (index, sample) in samples.iter().enumerate() {
        if sample.exceeds_unit_range() {
            overflows.push(AmplitudeOverflow {
                index,
                sample: *sample,
            });
        }
        bytes.extend_from_slice(&quantize(sample.i, policy).to_le_bytes());
        bytes.extend_from_slice(&quantize(sample.q, policy).to_le_bytes());
    }
    bytes.push(TERMINATOR);

    if let Some(first) = overflows.first() {
        LogManager::new("payload").warn(&format!(
            "{} samples exceed the [-1, 1] range and were encoded with {:?}; first at {}: {:.6}, {:.6}",
            overflows.len(),
            policy,
            first.index,
            first.sample.i,
            first.sample.q
        ));
    }

    EncodedPayload { bytes, overflows }
}

/// Inverse of the payload packing: int16 pairs back to normalized samples.
pub fn decode_payload(iq_bytes: &[u8]) -> WaveformResult<Vec<IqSample>> {
    if iq_bytes.len() % 4 != 0 {
        return Err(WaveformError::Format(format!(
            "payload length {} is not a whole number of I/Q pairs",
            iq_bytes.len()
        )));
    }
    Ok(iq_bytes
        .chunks_exact(4)
        .map(|pair| {
            let i = i16::from_le_bytes([pair[0], pair[1]]);
            let q = i16::from_le_bytes([pair[2], pair[3]]);
            IqSample::new(i as f64 / FULL_SCALE, q as f64 / FULL_SCALE)
        })
        .collect())
}
