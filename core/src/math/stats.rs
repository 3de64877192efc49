use crate::prelude::IqSample;

/// Power statistics over I/Q sample slices.
pub struct StatsHelper;

impl StatsHelper {
    /// `Σ(I² + Q²)`.
    pub fn total_power(samples: &[IqSample]) -> f64 {
        samples.iter().map(IqSample::power).sum()
    }

    /// Largest instantaneous power; zero for an empty slice.
    pub fn max_power(samples: &[IqSample]) -> f64 {
        samples.iter().map(IqSample::power).fold(0.0, f64::max)
    }

    pub fn peak_magnitude(samples: &[IqSample]) -> f64 {
        Self::max_power(samples).sqrt()
    }
}
