//! Hit events handed from the classifier to the dispatcher.

use crate::source::types::Vec3;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One classified peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    /// Device whose pipeline produced the event
    pub device: String,
    /// Matched zone, `None` when the peak was not a strike
    pub zone: Option<String>,
    /// Intensity level, `None` when the peak was not a strike
    pub level: Option<usize>,
    /// Timestamp of the sample at the peak
    pub timestamp: NaiveDateTime,
    /// Sequence number of that sample within the device stream
    pub sequence: u64,
    /// Conditioned acceleration magnitude at the peak
    pub intensity: f64,
    /// Integrated position at the peak
    pub position: Vec3,
}

impl HitEvent {
    /// A strike is a peak that resolved to a zone and should sound.
    pub fn is_strike(&self) -> bool {
        self.zone.is_some()
    }
}
