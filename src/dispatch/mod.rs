//! Turning strikes into playback requests.
//!
//! The dispatcher resolves `(zone, level)` to an asset path and hands it to
//! a small pool of playback workers through a bounded queue. Pipelines never
//! wait on playback: a full queue drops the trigger.

pub mod dispatcher;
pub mod player;

pub use dispatcher::{DispatchHandle, DispatchOutcome, Dispatcher};
pub use player::{player_from_config, CommandPlayer, NullPlayer, PlaybackError, Player};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Directory holding one sub-directory of samples per zone
    pub asset_root: PathBuf,
    /// File extension of the samples
    pub extension: String,
    /// External player command; the asset path is appended as the last
    /// argument. `None` only logs what would be played.
    pub command: Option<Vec<String>>,
    /// Pending playback requests before new triggers are dropped
    pub queue_capacity: usize,
    /// Concurrent playback workers
    pub workers: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            extension: "wav".to_string(),
            command: None,
            queue_capacity: 16,
            workers: 4,
        }
    }
}

impl PlaybackConfig {
    pub fn asset_layout(&self) -> AssetLayout {
        AssetLayout::new(&self.asset_root, &self.extension)
    }
}

/// Naming convention `<root>/<zone>/<zone><level>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLayout {
    root: PathBuf,
    extension: String,
}

impl AssetLayout {
    pub fn new(root: impl AsRef<Path>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            root: root.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the sample for a zone and level.
    pub fn resolve(&self, zone: &str, level: usize) -> PathBuf {
        self.root
            .join(zone)
            .join(format!("{zone}{level}.{}", self.extension))
    }
}
