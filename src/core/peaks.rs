//! Strike detection on the conditioned magnitude series.

use crate::core::kinematics::KinematicState;
use crate::source::types::Vec3;
use serde::{Deserialize, Serialize};

/// Peak detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Minimum magnitude for a local maximum to count as a strike.
    /// Raising it suppresses hand tremor.
    pub height_threshold: f64,
    /// Minimum spacing in samples between reported peaks.
    /// Raising it stops one strike from registering several times.
    pub min_distance: usize,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            height_threshold: 6.0,
            min_distance: 1,
        }
    }
}

/// A detected strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Index into the processed window
    pub index: usize,
    /// Integrated position at the peak
    pub position: Vec3,
    /// Conditioned acceleration magnitude at the peak
    pub intensity: f64,
}

impl Peak {
    /// Assemble a peak from the per-sample stage outputs.
    ///
    /// Returns `None` if `index` is outside either series.
    pub fn at(index: usize, magnitude: &[f64], states: &[KinematicState]) -> Option<Self> {
        Some(Self {
            index,
            position: states.get(index)?.position,
            intensity: *magnitude.get(index)?,
        })
    }
}

/// Find peak indices in `signal`, sorted ascending.
///
/// A peak is a local maximum (strictly above both neighbours; a flat top
/// resolves to its middle sample) whose value is at least the height
/// threshold. Candidates closer than `min_distance` to a higher peak are
/// dropped, highest first, with ties going to the earlier sample.
pub fn find_peaks(signal: &[f64], config: &PeakConfig) -> Vec<usize> {
    let mut peaks: Vec<usize> = local_maxima(signal)
        .into_iter()
        .filter(|&i| signal[i] >= config.height_threshold)
        .collect();

    if config.min_distance > 1 && peaks.len() > 1 {
        peaks = suppress_close_peaks(signal, &peaks, config.min_distance);
    }

    peaks
}

fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if signal.len() < 3 {
        return maxima;
    }

    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }

    maxima
}

fn suppress_close_peaks(signal: &[f64], peaks: &[usize], min_distance: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| {
        signal[peaks[b]]
            .total_cmp(&signal[peaks[a]])
            .then(a.cmp(&b))
    });

    let mut keep = vec![true; peaks.len()];
    for &k in &order {
        if !keep[k] {
            continue;
        }
        let center = peaks[k];

        let mut j = k;
        while j > 0 && center - peaks[j - 1] < min_distance {
            keep[j - 1] = false;
            j -= 1;
        }
        let mut j = k + 1;
        while j < peaks.len() && peaks[j] - center < min_distance {
            keep[j] = false;
            j += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(height: f64, distance: usize) -> PeakConfig {
        PeakConfig {
            height_threshold: height,
            min_distance: distance,
        }
    }

    #[test]
    fn test_single_impulse() {
        let mut signal = vec![0.0; 200];
        signal[100] = 15.0;
        assert_eq!(find_peaks(&signal, &config(6.0, 1)), vec![100]);
    }

    #[test]
    fn test_height_threshold() {
        let mut signal = vec![0.0; 50];
        signal[10] = 5.9;
        signal[30] = 6.0;
        assert_eq!(find_peaks(&signal, &config(6.0, 1)), vec![30]);
    }

    #[test]
    fn test_endpoints_are_not_peaks() {
        let signal = vec![10.0, 1.0, 1.0, 10.0];
        assert!(find_peaks(&signal, &config(0.0, 1)).is_empty());
    }

    #[test]
    fn test_plateau_resolves_to_middle() {
        let signal = vec![0.0, 7.0, 7.0, 7.0, 0.0];
        assert_eq!(find_peaks(&signal, &config(6.0, 1)), vec![2]);

        let signal = vec![0.0, 7.0, 7.0, 0.0];
        assert_eq!(find_peaks(&signal, &config(6.0, 1)), vec![1]);
    }

    #[test]
    fn test_rising_plateau_is_not_a_peak() {
        let signal = vec![0.0, 7.0, 7.0, 9.0, 0.0];
        assert_eq!(find_peaks(&signal, &config(6.0, 1)), vec![3]);
    }

    #[test]
    fn test_distance_keeps_highest() {
        let mut signal = vec![0.0; 40];
        signal[10] = 8.0;
        signal[13] = 12.0;
        signal[16] = 9.0;
        signal[30] = 7.0;

        assert_eq!(find_peaks(&signal, &config(6.0, 5)), vec![13, 30]);
        assert_eq!(find_peaks(&signal, &config(6.0, 1)), vec![10, 13, 16, 30]);
    }

    #[test]
    fn test_distance_tie_prefers_earlier() {
        let mut signal = vec![0.0; 20];
        signal[5] = 9.0;
        signal[8] = 9.0;
        assert_eq!(find_peaks(&signal, &config(6.0, 4)), vec![5]);
    }

    #[test]
    fn test_peak_at() {
        let states = vec![KinematicState::default(); 3];
        let magnitude = vec![0.0, 7.0, 0.0];
        let peak = Peak::at(1, &magnitude, &states).unwrap();
        assert_eq!(peak.intensity, 7.0);
        assert!(Peak::at(3, &magnitude, &states).is_none());
    }
}
