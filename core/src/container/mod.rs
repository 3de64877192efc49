//! The instrument waveform container: an ASCII tagged header followed by an
//! interleaved int16 I/Q payload.
//!
//! ```text
//! {TYPE: SMU-WV,0}{COMMENT: ...}{DATE:...}...{WAVEFORM-<4n+1>: #<4n bytes>}
//! ```

pub mod file;
pub mod header;
pub mod levels;
pub mod payload;

pub use file::{
    read_waveform_file, write_waveform_file, EncodeOptions, ParsedWaveformFile, WaveformFile,
};
pub use header::{encode_header, encode_header_now, HeaderTag, MarkerLists, WaveformHeader};
pub use levels::LevelStatistics;
pub use payload::{
    decode_payload, encode_payload, AmplitudeOverflow, EncodedPayload, OverflowPolicy,
};
