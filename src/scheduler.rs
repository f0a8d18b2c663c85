//! Periodic execution of device pipelines.
//!
//! Each device runs on its own thread so a slow log read on one device
//! never delays another. Ticks for a device never overlap; when a cycle
//! overruns, the missed ticks are skipped rather than run back to back.

use crate::pipeline::DevicePipeline;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep, so shutdown is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Collects pipelines and starts one ticking thread per device.
pub struct Scheduler {
    poll_interval: Duration,
    pipelines: Vec<DevicePipeline>,
}

impl Scheduler {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            pipelines: Vec::new(),
        }
    }

    pub fn add(&mut self, pipeline: DevicePipeline) {
        self.pipelines.push(pipeline);
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Start ticking. Threads run until `running` is cleared.
    pub fn spawn(self, running: Arc<AtomicBool>) -> io::Result<SchedulerHandle> {
        let mut threads = Vec::with_capacity(self.pipelines.len());
        for pipeline in self.pipelines {
            let running = Arc::clone(&running);
            let interval = self.poll_interval;
            let name = format!("pipeline-{}", pipeline.device());
            let device = pipeline.device().to_string();
            let thread = thread::Builder::new()
                .name(name)
                .spawn(move || run_device(pipeline, interval, running))?;
            threads.push((device, thread));
        }
        Ok(SchedulerHandle { threads })
    }
}

/// Join handle for the scheduler's device threads.
pub struct SchedulerHandle {
    threads: Vec<(String, JoinHandle<DevicePipeline>)>,
}

impl SchedulerHandle {
    /// Wait for every device thread and hand the pipelines back.
    ///
    /// Callers clear the running flag first.
    pub fn join(self) -> Vec<DevicePipeline> {
        let mut pipelines = Vec::with_capacity(self.threads.len());
        for (device, thread) in self.threads {
            match thread.join() {
                Ok(pipeline) => pipelines.push(pipeline),
                Err(_) => tracing::error!(device = %device, "pipeline thread panicked"),
            }
        }
        pipelines
    }
}

fn run_device(
    mut pipeline: DevicePipeline,
    interval: Duration,
    running: Arc<AtomicBool>,
) -> DevicePipeline {
    tracing::info!(
        device = pipeline.device(),
        interval_ms = interval.as_millis() as u64,
        "pipeline started"
    );

    let mut next_tick = Instant::now();
    while running.load(Ordering::SeqCst) {
        pipeline.cycle();

        next_tick += interval;
        let now = Instant::now();
        if now > next_tick && !interval.is_zero() {
            let behind = now.duration_since(next_tick);
            let skipped = (behind.as_nanos() / interval.as_nanos()) as u64 + 1;
            next_tick += interval.saturating_mul(skipped.min(u32::MAX as u64) as u32);
            pipeline.stats().record_ticks_skipped(skipped);
            tracing::debug!(device = pipeline.device(), skipped, "cycle overran; skipping ticks");
        }

        sleep_until(next_tick, &running);
    }

    tracing::info!(device = pipeline.device(), "pipeline stopped");
    pipeline
}

fn sleep_until(deadline: Instant, running: &AtomicBool) {
    loop {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
