//! Bounded fire-and-forget playback queue.
//!
//! Pipelines only resolve the asset path and enqueue it. The existence
//! check and playback both happen on the workers, so a trigger costs the
//! pipeline thread no filesystem access.

use super::player::{PlaybackError, Player};
use super::AssetLayout;
use crate::core::HitEvent;
use crate::stats::SharedStats;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// What happened to one hit handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Accepted by the playback queue
    Queued(PathBuf),
    /// The hit had no zone; nothing to play
    NotAStrike,
    /// The queue was full and the trigger was dropped
    Dropped(PathBuf),
    /// The dispatcher has shut down
    Closed,
}

/// One queued trigger.
struct PlaybackRequest {
    asset: PathBuf,
    device: String,
    stats: Option<SharedStats>,
}

/// Owns the playback workers.
pub struct Dispatcher {
    handle: DispatchHandle,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start `workers` playback threads fed by a queue of `queue_capacity`.
    ///
    /// Both are clamped to at least one.
    pub fn new(
        player: Arc<dyn Player>,
        assets: AssetLayout,
        queue_capacity: usize,
        workers: usize,
    ) -> io::Result<Self> {
        let (sender, receiver) = bounded::<PlaybackRequest>(queue_capacity.max(1));

        let mut threads = Vec::with_capacity(workers.max(1));
        for i in 0..workers.max(1) {
            let receiver = receiver.clone();
            let player = Arc::clone(&player);
            let thread = thread::Builder::new()
                .name(format!("playback-{i}"))
                .spawn(move || playback_worker(receiver, player))?;
            threads.push(thread);
        }

        tracing::debug!(
            player = player.name(),
            workers = threads.len(),
            queue = queue_capacity.max(1),
            "dispatcher started"
        );

        Ok(Self {
            handle: DispatchHandle {
                sender,
                assets,
                stats: None,
            },
            workers: threads,
        })
    }

    /// A cloneable handle that pipelines use to submit hits.
    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// Stop accepting triggers and wait for queued playback to finish.
    ///
    /// Workers exit once every handle is dropped and the queue drains.
    pub fn shutdown(self) {
        drop(self.handle);
        for worker in self.workers {
            if worker.join().is_err() {
                tracing::error!("playback worker panicked");
            }
        }
    }
}

fn playback_worker(receiver: Receiver<PlaybackRequest>, player: Arc<dyn Player>) {
    for request in receiver {
        let result = if request.asset.is_file() {
            player.play(&request.asset)
        } else {
            Err(PlaybackError::Missing(request.asset.clone()))
        };

        match result {
            Ok(()) => {}
            Err(PlaybackError::Missing(asset)) => {
                tracing::warn!(
                    device = %request.device,
                    asset = %asset.display(),
                    "no sample for this hit"
                );
                if let Some(stats) = &request.stats {
                    stats.record_missing_asset();
                }
            }
            Err(e) => {
                tracing::warn!(
                    device = %request.device,
                    asset = %request.asset.display(),
                    error = %e,
                    "playback failed"
                );
            }
        }
    }
}

/// Submits hits to the playback queue without blocking.
#[derive(Clone)]
pub struct DispatchHandle {
    sender: Sender<PlaybackRequest>,
    assets: AssetLayout,
    stats: Option<SharedStats>,
}

impl DispatchHandle {
    pub fn assets(&self) -> &AssetLayout {
        &self.assets
    }

    /// Count missing assets for these triggers in `stats`.
    pub fn counting_into(mut self, stats: SharedStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Resolve the hit's asset and enqueue it for playback.
    pub fn dispatch(&self, hit: &HitEvent) -> DispatchOutcome {
        let (Some(zone), Some(level)) = (hit.zone.as_deref(), hit.level) else {
            return DispatchOutcome::NotAStrike;
        };

        let asset = self.assets.resolve(zone, level);
        let request = PlaybackRequest {
            asset: asset.clone(),
            device: hit.device.clone(),
            stats: self.stats.clone(),
        };

        match self.sender.try_send(request) {
            Ok(()) => {
                tracing::debug!(device = %hit.device, zone, level, "trigger queued");
                DispatchOutcome::Queued(asset)
            }
            Err(TrySendError::Full(request)) => {
                tracing::warn!(
                    device = %hit.device,
                    zone,
                    level,
                    "playback queue full; dropping trigger"
                );
                DispatchOutcome::Dropped(request.asset)
            }
            Err(TrySendError::Disconnected(_)) => DispatchOutcome::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::create_shared_stats;
    use chrono::NaiveDate;
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPlayer {
        played: Mutex<Vec<PathBuf>>,
    }

    impl Player for RecordingPlayer {
        fn play(&self, path: &Path) -> Result<(), PlaybackError> {
            self.played.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct BlockingPlayer {
        gate: Receiver<()>,
    }

    impl Player for BlockingPlayer {
        fn play(&self, _path: &Path) -> Result<(), PlaybackError> {
            let _ = self.gate.recv();
            Ok(())
        }

        fn name(&self) -> &str {
            "blocking"
        }
    }

    fn hit(zone: Option<&str>, level: Option<usize>) -> HitEvent {
        HitEvent {
            device: "left".to_string(),
            zone: zone.map(str::to_string),
            level,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            sequence: 100,
            intensity: 15.0,
            position: [0.2, -0.3, -1.0],
        }
    }

    fn asset_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("snare")).unwrap();
        std::fs::write(dir.path().join("snare").join("snare3.wav"), b"RIFF").unwrap();
        dir
    }

    #[test]
    fn test_dispatch_plays_existing_asset() {
        let dir = asset_dir();
        let player = Arc::new(RecordingPlayer::default());
        let dispatcher = Dispatcher::new(
            player.clone(),
            AssetLayout::new(dir.path(), "wav"),
            4,
            1,
        )
        .unwrap();

        let outcome = dispatcher.handle().dispatch(&hit(Some("snare"), Some(3)));
        let expected = dir.path().join("snare").join("snare3.wav");
        assert_eq!(outcome, DispatchOutcome::Queued(expected.clone()));

        dispatcher.shutdown();
        assert_eq!(*player.played.lock().unwrap(), vec![expected]);
    }

    #[test]
    fn test_missing_asset_is_counted_by_worker() {
        let dir = asset_dir();
        let player = Arc::new(RecordingPlayer::default());
        let stats = create_shared_stats("left");
        let dispatcher =
            Dispatcher::new(player.clone(), AssetLayout::new(dir.path(), "wav"), 4, 1).unwrap();

        // The pipeline thread only enqueues; it never looks at the disk.
        let outcome = dispatcher
            .handle()
            .counting_into(Arc::clone(&stats))
            .dispatch(&hit(Some("snare"), Some(8)));
        assert!(matches!(outcome, DispatchOutcome::Queued(_)));

        dispatcher.shutdown();
        assert!(player.played.lock().unwrap().is_empty());
        assert_eq!(stats.snapshot().missing_assets, 1);
    }

    #[test]
    fn test_enqueue_does_not_need_the_asset_root() {
        let player = Arc::new(RecordingPlayer::default());
        let dispatcher = Dispatcher::new(
            player.clone(),
            AssetLayout::new("/nonexistent/airdrum-assets", "wav"),
            4,
            1,
        )
        .unwrap();

        let outcome = dispatcher.handle().dispatch(&hit(Some("snare"), Some(3)));
        assert_eq!(
            outcome,
            DispatchOutcome::Queued(
                PathBuf::from("/nonexistent/airdrum-assets")
                    .join("snare")
                    .join("snare3.wav")
            )
        );

        dispatcher.shutdown();
        assert!(player.played.lock().unwrap().is_empty());
    }

    #[test]
    fn test_non_strike_is_ignored() {
        let dir = asset_dir();
        let dispatcher = Dispatcher::new(
            Arc::new(RecordingPlayer::default()),
            AssetLayout::new(dir.path(), "wav"),
            4,
            1,
        )
        .unwrap();

        assert_eq!(
            dispatcher.handle().dispatch(&hit(None, None)),
            DispatchOutcome::NotAStrike
        );
        dispatcher.shutdown();
    }

    #[test]
    fn test_full_queue_drops_trigger() {
        let dir = asset_dir();
        let (release, gate) = bounded(0);
        let dispatcher = Dispatcher::new(
            Arc::new(BlockingPlayer { gate }),
            AssetLayout::new(dir.path(), "wav"),
            1,
            1,
        )
        .unwrap();
        let handle = dispatcher.handle();
        let strike = hit(Some("snare"), Some(3));

        // One request occupies the worker, one fills the queue; after
        // that nothing fits until the worker is released.
        let mut dropped = 0;
        for _ in 0..10 {
            if matches!(handle.dispatch(&strike), DispatchOutcome::Dropped(_)) {
                dropped += 1;
            }
        }
        assert!(dropped >= 8);

        drop(handle);
        drop(release);
        dispatcher.shutdown();
    }
}
