//! Per-window signal conditioning.
//!
//! Each acceleration axis has its least-squares linear trend removed so that
//! sensor bias and slow drift do not integrate into phantom motion. The
//! conditioned axes are then combined into a magnitude series used for
//! strike detection.
//!
//! Conditioning is recomputed over the whole window every cycle. A sample's
//! conditioned value therefore moves as the window slides.

use crate::source::types::{norm, Sample, Vec3};
use statrs::statistics::Statistics;

/// Conditioned acceleration for every sample of a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionedWindow {
    /// Detrended acceleration per sample
    pub acc: Vec<Vec3>,
    /// Euclidean magnitude of the detrended acceleration
    pub magnitude: Vec<f64>,
}

impl ConditionedWindow {
    pub fn len(&self) -> usize {
        self.acc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acc.is_empty()
    }
}

/// Detrend every acceleration axis of the window and compute magnitudes.
///
/// Windows shorter than two samples are passed through unchanged.
pub fn condition<'a, I>(samples: I) -> ConditionedWindow
where
    I: IntoIterator<Item = &'a Sample>,
{
    let mut axes: [Vec<f64>; 3] = Default::default();
    for sample in samples {
        for (axis, value) in axes.iter_mut().zip(sample.acc) {
            axis.push(value);
        }
    }

    let [x, y, z] = axes.map(|axis| detrend(&axis));
    let acc: Vec<Vec3> = x
        .into_iter()
        .zip(y)
        .zip(z)
        .map(|((x, y), z)| [x, y, z])
        .collect();
    let magnitude = acc.iter().map(norm).collect();

    ConditionedWindow { acc, magnitude }
}

/// Remove the ordinary-least-squares line over sample index.
pub fn detrend(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return values.to_vec();
    }

    let index: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let slope = index.iter().covariance(values.iter()) / index.iter().variance();
    let intercept = values.iter().mean() - slope * index.iter().mean();

    values
        .iter()
        .zip(&index)
        .map(|(v, i)| v - (intercept + slope * i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn sample(acc: Vec3) -> Sample {
        Sample::new(NaiveDateTime::default(), acc, [0.0; 3])
    }

    #[test]
    fn test_detrend_removes_line() {
        let values: Vec<f64> = (0..50).map(|i| 3.0 + 0.5 * i as f64).collect();
        for v in detrend(&values) {
            assert!(v.abs() < 1e-9);
        }
    }

    #[test]
    fn test_detrend_short_input_unchanged() {
        assert!(detrend(&[]).is_empty());
        assert_eq!(detrend(&[4.2]), vec![4.2]);
    }

    #[test]
    fn test_condition_at_rest_is_flat() {
        // Gravity on z plus a constant bias on x.
        let samples: Vec<Sample> = (0..100).map(|_| sample([0.3, 0.0, 9.81])).collect();
        let conditioned = condition(&samples);

        assert_eq!(conditioned.len(), 100);
        for m in &conditioned.magnitude {
            assert!(m.abs() < 1e-9);
        }
    }

    #[test]
    fn test_condition_keeps_impulse() {
        let mut samples: Vec<Sample> = (0..200).map(|_| sample([0.0; 3])).collect();
        samples[100] = sample([0.0, 0.0, 15.0]);
        let conditioned = condition(&samples);

        let peak = conditioned.magnitude[100];
        assert!((peak - 14.925).abs() < 0.01, "got {peak}");
        assert!(conditioned.magnitude[99] < 0.1);
    }

    #[test]
    fn test_condition_empty() {
        let conditioned = condition(&Vec::<Sample>::new());
        assert!(conditioned.is_empty());
        assert!(conditioned.magnitude.is_empty());
    }
}
