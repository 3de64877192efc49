//! Consumers that receive finished waveforms from the runner.

pub mod file;
pub mod spectrum;

pub use file::FileSink;
pub use spectrum::SpectrumSink;
