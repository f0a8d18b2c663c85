//! Sliding sample window owned by a single device pipeline.
//!
//! Samples are kept in arrival order and evicted oldest-first once the
//! window exceeds its capacity. Every sample carries a sequence number
//! (its position among all samples ever appended) so that later stages can
//! tell new samples from ones already seen in an earlier cycle.
//!
//! Operational invariant: capacity should be at least the largest reset
//! interval of the integrator, otherwise reset boundaries fall outside the
//! window. This is checked at startup, not enforced here.

use crate::source::types::Sample;
use std::collections::VecDeque;

/// A capacity-bounded FIFO window of samples.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    /// Maximum number of samples held, `None` for unbounded
    capacity: Option<usize>,
    /// Samples currently in the window, oldest first
    samples: VecDeque<Sample>,
    /// Number of samples ever appended
    total_appended: u64,
}

impl WindowBuffer {
    /// Create a window holding at most `capacity` samples (`None` = unbounded).
    pub fn new(capacity: Option<usize>) -> Self {
        let capacity = capacity.map(|c| c.max(1));
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity.unwrap_or(0).min(4096)),
            total_appended: 0,
        }
    }

    /// Create a window that never evicts.
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Append samples in arrival order, then evict from the front.
    ///
    /// Returns the number of samples evicted.
    pub fn append<I>(&mut self, samples: I) -> usize
    where
        I: IntoIterator<Item = Sample>,
    {
        for sample in samples {
            self.samples.push_back(sample);
            self.total_appended += 1;
        }

        let mut evicted = 0;
        if let Some(capacity) = self.capacity {
            while self.samples.len() > capacity {
                self.samples.pop_front();
                evicted += 1;
            }
        }
        evicted
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate over the window, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    /// Total number of samples ever appended.
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Sequence number of the oldest sample in the window.
    pub fn first_sequence(&self) -> u64 {
        self.total_appended - self.samples.len() as u64
    }

    /// Sequence number of the sample at `index`.
    pub fn sequence_of(&self, index: usize) -> u64 {
        self.first_sequence() + index as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn sample(z: f64) -> Sample {
        Sample::new(NaiveDateTime::default(), [0.0, 0.0, z], [0.0; 3])
    }

    #[test]
    fn test_append_keeps_order() {
        let mut window = WindowBuffer::new(Some(10));
        window.append((0..5).map(|i| sample(i as f64)));

        let zs: Vec<f64> = window.iter().map(|s| s.acc[2]).collect();
        assert_eq!(zs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut window = WindowBuffer::new(Some(3));
        let evicted = window.append((0..5).map(|i| sample(i as f64)));

        assert_eq!(evicted, 2);
        assert_eq!(window.len(), 3);
        assert_eq!(window.get(0).unwrap().acc[2], 2.0);
        assert_eq!(window.first_sequence(), 2);
        assert_eq!(window.sequence_of(2), 4);
    }

    #[test]
    fn test_unbounded_never_evicts() {
        let mut window = WindowBuffer::unbounded();
        assert_eq!(window.append((0..1000).map(|i| sample(i as f64))), 0);
        assert_eq!(window.len(), 1000);
        assert_eq!(window.first_sequence(), 0);
    }

    #[test]
    fn test_sequences_span_appends() {
        let mut window = WindowBuffer::new(Some(4));
        window.append((0..3).map(|i| sample(i as f64)));
        window.append((3..6).map(|i| sample(i as f64)));

        assert_eq!(window.total_appended(), 6);
        assert_eq!(window.first_sequence(), 2);
        assert_eq!(window.get(0).unwrap().acc[2], 2.0);
    }
}
