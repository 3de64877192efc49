pub mod fft;
pub mod stats;

pub use fft::{FftHelper, Spectrum, SpectrumBin};
pub use stats::StatsHelper;
