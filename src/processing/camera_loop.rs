use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument, Span};

use super::DetectionHandler;
use crate::{capture::CapturePipeline, model::CameraId};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, PartialEq, Eq, Serialize, Clone, Copy)]
pub enum LoopState {
    /// Never started
    Idle,
    /// Timer armed, no pass in flight
    Scheduled,
    /// Timer armed and a pass in flight
    Running,
    Stopped,
}

/// Periodic detection schedule for a single camera.
///
/// A pass runs as soon as the loop starts and then once per interval. A tick that arrives while
/// the previous pass is still in flight is dropped, never queued. Stopping only prevents future
/// ticks: a pass already in flight finishes and its handler still runs.
pub struct CameraLoop {
    camera_id: CameraId,
    stream_url: String,
    interval: Duration,
    pipeline: CapturePipeline,
    in_flight: Arc<AtomicBool>,
    completed: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
    cancel: Option<CancellationToken>,
    stopped: bool,
}

impl CameraLoop {
    pub fn new(
        camera_id: CameraId,
        stream_url: impl Into<String>,
        interval: Duration,
        pipeline: CapturePipeline,
    ) -> Self {
        // tokio intervals cannot be zero
        let interval = if interval.is_zero() {
            DEFAULT_INTERVAL
        } else {
            interval
        };
        Self {
            camera_id,
            stream_url: stream_url.into(),
            interval,
            pipeline,
            in_flight: Arc::new(AtomicBool::new(false)),
            completed: Arc::new(AtomicU64::new(0)),
            skipped: Arc::new(AtomicU64::new(0)),
            cancel: None,
            stopped: false,
        }
    }

    pub fn camera_id(&self) -> CameraId {
        self.camera_id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arms the schedule. Calling it on a loop that is already scheduled does nothing.
    pub fn start(&mut self, handler: Arc<dyn DetectionHandler>) {
        if self.is_running() {
            debug!(camera_id = self.camera_id, "Camera loop already scheduled");
            return;
        }

        let token = CancellationToken::new();
        let pass = Arc::new(Pass {
            camera_id: self.camera_id,
            stream_url: self.stream_url.clone(),
            pipeline: self.pipeline.clone(),
            handler,
            in_flight: self.in_flight.clone(),
            completed: self.completed.clone(),
            skipped: self.skipped.clone(),
        });
        let logging_span = info_span!("Camera loop", camera_id = self.camera_id);
        tokio::spawn(run_schedule(pass, self.interval, token.clone()).instrument(logging_span));

        self.cancel = Some(token);
        self.stopped = false;
    }

    /// Cancels future ticks. Idempotent.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
            self.stopped = true;
            info!(camera_id = self.camera_id, "Camera loop stopped");
        }
    }

    /// True while the timer is armed, whether or not a pass is in flight
    pub fn is_running(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |token| !token.is_cancelled())
    }

    /// True while a pass is in flight. Can outlive `stop`.
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> LoopState {
        match (self.is_running(), self.stopped) {
            (true, _) if self.is_processing() => LoopState::Running,
            (true, _) => LoopState::Scheduled,
            (false, true) => LoopState::Stopped,
            (false, false) => LoopState::Idle,
        }
    }

    pub fn completed_passes(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Ticks dropped because the previous pass was still running
    pub fn skipped_passes(&self) -> u64 {
        self.skipped.load(Ordering::SeqCst)
    }
}

impl Drop for CameraLoop {
    fn drop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

async fn run_schedule(pass: Arc<Pass>, period: Duration, token: CancellationToken) {
    info!(interval_secs = period.as_secs(), "Camera loop scheduled");
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            // The first tick completes immediately
            _ = ticker.tick() => pass.clone().fire(),
        }
    }
    debug!("Camera loop task exiting");
}

struct Pass {
    camera_id: CameraId,
    stream_url: String,
    pipeline: CapturePipeline,
    handler: Arc<dyn DetectionHandler>,
    in_flight: Arc<AtomicBool>,
    completed: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
}

/// Clears the in-flight flag when dropped, whichever way the pass ends
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Pass {
    fn fire(self: Arc<Self>) {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.skipped.fetch_add(1, Ordering::SeqCst);
            info!("Previous pass still in progress, skipping this tick");
            return;
        }
        let guard = InFlightGuard(self.in_flight.clone());
        tokio::spawn(
            async move {
                let _guard = guard;
                self.execute().await;
            }
            .instrument(Span::current()),
        );
    }

    async fn execute(&self) {
        let result = self.pipeline.run_detection(&self.stream_url).await;
        if let Err(e) = self.handler.on_detection(self.camera_id, result).await {
            error!(error = %e, "Detection handler failed, waiting for next tick");
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}
