//! Core motion-to-hit processing.
//!
//! This module contains:
//! - The sliding sample window owned by each device pipeline
//! - Detrending and magnitude computation
//! - Drift-reset double integration
//! - Peak detection
//! - Zone and intensity classification into hit events

pub mod classify;
pub mod conditioning;
pub mod event;
pub mod kinematics;
pub mod peaks;
pub mod window;

// Re-export commonly used types
pub use classify::{Classification, Classifier, LevelTable, ZoneBoundary, ZoneLayout};
pub use conditioning::{condition, detrend, ConditionedWindow};
pub use event::HitEvent;
pub use kinematics::{Integrator, KinematicState, KinematicsConfig};
pub use peaks::{find_peaks, Peak, PeakConfig};
pub use window::WindowBuffer;
