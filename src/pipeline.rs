//! One device's processing cycle.
//!
//! ```text
//! poll → window → condition → integrate → find peaks → classify → dispatch
//! ```
//!
//! Every stage after the poll is recomputed over the whole window, so the
//! same strike stays detectable while it is in the window. The pipeline
//! remembers the sequence number of the last peak it emitted and only emits
//! peaks on newer samples.

use crate::core::{
    condition, find_peaks, Classifier, HitEvent, Integrator, KinematicsConfig, Peak, PeakConfig,
    WindowBuffer,
};
use crate::dispatch::{DispatchHandle, DispatchOutcome};
use crate::source::SampleSource;
use crate::stats::{create_shared_stats, SharedStats};
use std::sync::Arc;

/// Processing parameters shared by every device.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    /// Window capacity in samples, `None` for unbounded
    pub window_capacity: Option<usize>,
    pub kinematics: KinematicsConfig,
    pub peaks: PeakConfig,
    pub classifier: Classifier,
}

/// What one cycle did.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Well-formed samples appended this cycle
    pub new_samples: usize,
    /// Records dropped as malformed this cycle
    pub malformed: usize,
    /// Set when the poll failed; the offset was left untouched
    pub poll_error: Option<String>,
    /// Peaks not emitted in an earlier cycle
    pub peaks: Vec<Peak>,
    /// One event per entry of `peaks`
    pub hits: Vec<HitEvent>,
    /// Dispatch result for each strike, in `hits` order
    pub outcomes: Vec<DispatchOutcome>,
}

impl CycleReport {
    pub fn strikes(&self) -> impl Iterator<Item = &HitEvent> {
        self.hits.iter().filter(|hit| hit.is_strike())
    }
}

/// Per-device state: source cursor, window and emitted-peak cursor.
pub struct DevicePipeline {
    device: String,
    source: Box<dyn SampleSource>,
    offset: usize,
    window: WindowBuffer,
    integrator: Integrator,
    peak_config: PeakConfig,
    classifier: Classifier,
    dispatcher: Option<DispatchHandle>,
    last_emitted: Option<u64>,
    stats: SharedStats,
}

impl DevicePipeline {
    pub fn new(
        device: impl Into<String>,
        source: Box<dyn SampleSource>,
        settings: PipelineSettings,
    ) -> Self {
        let device = device.into();
        let stats = create_shared_stats(device.clone());
        Self {
            device,
            source,
            offset: 0,
            window: WindowBuffer::new(settings.window_capacity),
            integrator: Integrator::new(settings.kinematics),
            peak_config: settings.peaks,
            classifier: settings.classifier,
            dispatcher: None,
            last_emitted: None,
            stats,
        }
    }

    /// Send strikes to a dispatcher. Without one, hits are only reported.
    pub fn with_dispatcher(mut self, dispatcher: DispatchHandle) -> Self {
        self.dispatcher = Some(dispatcher.counting_into(Arc::clone(&self.stats)));
        self
    }

    /// Share counters with the caller.
    pub fn with_stats(mut self, stats: SharedStats) -> Self {
        self.stats = stats;
        self.dispatcher = self
            .dispatcher
            .take()
            .map(|dispatcher| dispatcher.counting_into(Arc::clone(&self.stats)));
        self
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Records consumed from the source so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }

    /// Sequence number of the most recently emitted peak.
    pub fn last_emitted(&self) -> Option<u64> {
        self.last_emitted
    }

    /// Run one poll-to-dispatch cycle.
    ///
    /// Never fails: a poll error leaves the offset unchanged and is reported
    /// in the returned [`CycleReport`] so the next tick can retry.
    pub fn cycle(&mut self) -> CycleReport {
        self.stats.record_cycle();
        let mut report = CycleReport::default();

        let batch = match self.source.poll(self.offset) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(device = %self.device, error = %e, "poll failed; retrying next tick");
                self.stats.record_poll_failure();
                report.poll_error = Some(e.to_string());
                return report;
            }
        };

        self.offset = batch.new_offset;
        report.new_samples = batch.samples.len();
        report.malformed = batch.malformed;
        self.stats
            .record_samples(batch.samples.len() as u64, batch.malformed as u64);

        if batch.samples.is_empty() {
            return report;
        }

        let evicted = self.window.append(batch.samples);
        tracing::debug!(
            device = %self.device,
            offset = self.offset,
            appended = report.new_samples,
            evicted,
            window = self.window.len(),
            "window updated"
        );

        let conditioned = condition(self.window.iter());
        let states = self.integrator.integrate(&conditioned.acc);

        for index in find_peaks(&conditioned.magnitude, &self.peak_config) {
            let sequence = self.window.sequence_of(index);
            if !self.is_new_peak(sequence) {
                continue;
            }
            let Some(peak) = Peak::at(index, &conditioned.magnitude, &states) else {
                continue;
            };
            let Some(sample) = self.window.get(index) else {
                continue;
            };
            self.last_emitted = Some(sequence);

            let classification = self.classifier.classify(&peak);
            let hit = HitEvent {
                device: self.device.clone(),
                zone: classification.zone,
                level: classification.level,
                timestamp: sample.timestamp,
                sequence,
                intensity: peak.intensity,
                position: peak.position,
            };
            self.stats.record_peak(hit.is_strike());

            if hit.is_strike() {
                tracing::info!(
                    device = %self.device,
                    zone = hit.zone.as_deref().unwrap_or_default(),
                    level = hit.level.unwrap_or_default(),
                    intensity = peak.intensity,
                    sequence,
                    "hit"
                );
                if let Some(dispatcher) = &self.dispatcher {
                    let outcome = dispatcher.dispatch(&hit);
                    self.record_outcome(&outcome);
                    report.outcomes.push(outcome);
                }
            } else {
                tracing::debug!(
                    device = %self.device,
                    x = peak.position[0],
                    y = peak.position[1],
                    z = peak.position[2],
                    intensity = peak.intensity,
                    "peak outside every zone"
                );
            }

            report.peaks.push(peak);
            report.hits.push(hit);
        }

        report
    }

    fn is_new_peak(&self, sequence: u64) -> bool {
        match self.last_emitted {
            None => true,
            Some(last) => {
                sequence > last && sequence - last >= self.peak_config.min_distance as u64
            }
        }
    }

    fn record_outcome(&self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Queued(_) => self.stats.record_trigger_queued(),
            DispatchOutcome::Dropped(_) => self.stats.record_trigger_dropped(),
            DispatchOutcome::NotAStrike | DispatchOutcome::Closed => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LevelTable, ZoneBoundary, ZoneLayout};
    use crate::source::{PollBatch, ReplaySource, SourceError};

    fn record(i: usize, z: f64) -> String {
        format!("2024-01-01T00:00:{:02}.{:02},0,0,{z},0,0,0", i / 100, i % 100)
    }

    fn origin_snare_settings() -> PipelineSettings {
        PipelineSettings {
            window_capacity: Some(200),
            kinematics: KinematicsConfig::default(),
            peaks: PeakConfig::default(),
            classifier: Classifier::new(
                ZoneLayout {
                    z_gate_threshold: -5.0,
                    boundaries: vec![ZoneBoundary::new("snare", -1.0, -1.0, 1.0, 1.0)],
                },
                LevelTable::new(vec![6.0, 8.0, 12.0, 16.0, 20.0]).unwrap(),
            ),
        }
    }

    fn impulse_records(len: usize, at: usize, value: f64) -> Vec<String> {
        (0..len)
            .map(|i| record(i, if i == at { value } else { 0.0 }))
            .collect()
    }

    #[test]
    fn test_impulse_is_emitted_once() {
        let source = ReplaySource::from_records("impulse", impulse_records(200, 100, 15.0), 50);
        let mut pipeline = DevicePipeline::new("left", Box::new(source), origin_snare_settings());

        let mut hits = Vec::new();
        for _ in 0..4 {
            hits.extend(pipeline.cycle().hits);
        }

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sequence, 100);
        assert_eq!(hits[0].zone.as_deref(), Some("snare"));
        assert_eq!(hits[0].level, Some(3));
        assert_eq!(pipeline.offset(), 200);
        assert_eq!(pipeline.last_emitted(), Some(100));
    }

    #[test]
    fn test_empty_poll_is_a_noop() {
        let source = ReplaySource::from_records("empty", Vec::new(), 10);
        let mut pipeline = DevicePipeline::new("left", Box::new(source), origin_snare_settings());

        let report = pipeline.cycle();
        assert_eq!(report.new_samples, 0);
        assert!(report.hits.is_empty());
        assert!(pipeline.window().is_empty());
    }

    struct FailingSource;

    impl SampleSource for FailingSource {
        fn poll(&mut self, _since_offset: usize) -> Result<PollBatch, SourceError> {
            Err(SourceError::Io {
                path: "missing.csv".to_string(),
                message: "not found".to_string(),
            })
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    #[test]
    fn test_poll_failure_keeps_offset() {
        let mut pipeline =
            DevicePipeline::new("left", Box::new(FailingSource), origin_snare_settings());

        let report = pipeline.cycle();
        assert!(report.poll_error.is_some());
        assert_eq!(pipeline.offset(), 0);
        assert_eq!(pipeline.stats().snapshot().poll_failures, 1);
    }

    #[test]
    fn test_dedup_respects_min_distance() {
        let mut settings = origin_snare_settings();
        settings.peaks.min_distance = 10;
        let mut pipeline = DevicePipeline::new(
            "left",
            Box::new(ReplaySource::from_records("x", Vec::new(), 1)),
            settings,
        );

        pipeline.last_emitted = Some(100);
        assert!(!pipeline.is_new_peak(100));
        assert!(!pipeline.is_new_peak(105));
        assert!(!pipeline.is_new_peak(90));
        assert!(pipeline.is_new_peak(110));
    }
}
