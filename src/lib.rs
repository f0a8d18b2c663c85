//! Airdrum - turns wearable IMU sample logs into percussion hits.
//!
//! An acquisition process appends accelerometer and gyroscope records to one
//! CSV log per sensor. For each sensor we periodically read the new records,
//! estimate where the hand is, detect strikes, work out which drum the
//! strike landed on and how hard it was, and trigger the matching sample.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                 DevicePipeline (one thread per device)            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌──────────┐   ┌──────────────┐   ┌──────────┐   │
//! │  │  Source  │──▶│  Window  │──▶│ Conditioning │──▶│Integrator│   │
//! │  │ (CSV log)│   │  (FIFO)  │   │  (detrend)   │   │ (v, p)   │   │
//! │  └──────────┘   └──────────┘   └──────────────┘   └──────────┘   │
//! │                                       │                 │        │
//! │                                       ▼                 ▼        │
//! │                                ┌──────────────┐   ┌──────────┐   │
//! │                                │    Peaks     │──▶│ Classify │   │
//! │                                │ (magnitude)  │   │zone/level│   │
//! │                                └──────────────┘   └──────────┘   │
//! └──────────────────────────────────────────────────────────┬───────┘
//!                                                            ▼
//!                                  ┌──────────────────────────────────┐
//!                                  │ Dispatcher (bounded queue, pool) │
//!                                  └──────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use airdrum::{Config, CsvLogSource, DevicePipeline};
//!
//! let config = Config::default();
//! let source = CsvLogSource::new("drum1.csv");
//! let mut pipeline = DevicePipeline::new("drum1", Box::new(source), config.pipeline_settings());
//!
//! for hit in pipeline.cycle().strikes() {
//!     println!("{:?} level {:?}", hit.zone, hit.level);
//! }
//! ```

pub mod config;
pub mod core;
pub mod dispatch;
pub mod pipeline;
pub mod scheduler;
pub mod source;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, DeviceConfig};
pub use core::{
    Classification, Classifier, HitEvent, Integrator, KinematicsConfig, LevelTable, Peak,
    PeakConfig, WindowBuffer, ZoneBoundary, ZoneLayout,
};
pub use dispatch::{
    AssetLayout, DispatchHandle, DispatchOutcome, Dispatcher, PlaybackConfig, PlaybackError,
    Player,
};
pub use pipeline::{CycleReport, DevicePipeline, PipelineSettings};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use source::{CsvLogSource, ReplaySource, Sample, SampleSource, SourceError};
pub use stats::{PipelineStats, SharedStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
