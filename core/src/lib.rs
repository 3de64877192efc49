//! Baseband IQ waveform synthesis and instrument waveform container encoding.
//!
//! Generators in [`synth`] produce a [`Waveform`] from explicit parameters; the
//! [`container`] module turns it into the tagged-header `*.wv` file consumed by
//! vector signal generators. [`exchange`] reads and writes the plaintext I/Q
//! handoff format that sits between the two.

pub mod container;
pub mod exchange;
pub mod math;
pub mod prelude;
pub mod synth;
pub mod telemetry;

pub use prelude::{IqSample, Waveform, WaveformError, WaveformResult, WaveformSink};
