//! Latest-value synchronizer and periodic driver.
//!
//! Producers overwrite one slot each; a single driver thread snapshots both
//! slots once per period and, when both are present, runs the pipeline and
//! publishes the result.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::OverlayConfig;
use crate::error::{OverlayError, Result};
use crate::field::ScalarField;
use crate::frame::{Frame, PixelFormat};
use crate::pipeline::Pipeline;
use crate::processing::hotspot::HotspotLocation;
use crate::sink::Sink;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A slot value with its arrival time.
#[derive(Debug)]
pub struct Stamped<T> {
    pub value: Arc<T>,
    pub received: Instant,
}

impl<T> Clone for Stamped<T> {
    fn clone(&self) -> Self {
        Stamped { value: Arc::clone(&self.value), received: self.received }
    }
}

impl<T> Stamped<T> {
    fn now(value: T) -> Self {
        Stamped { value: Arc::new(value), received: Instant::now() }
    }
}

/// Rejection counters for one producer.
#[derive(Default)]
struct Rejections {
    total: AtomicU64,
    /// Rejected updates since the last accepted one.
    streak: AtomicU64,
}

/// The two latest-value slots, one lock each.
struct Slots {
    frame: Mutex<Option<Stamped<Frame>>>,
    field: Mutex<Option<Stamped<ScalarField>>>,
    frame_rejections: Rejections,
    field_rejections: Rejections,
    /// Persistent-misconfiguration records emitted so far.
    alarms: AtomicU64,
    alarm_threshold: u64,
}

impl Slots {
    fn new(alarm_threshold: u64) -> Self {
        Slots {
            frame: Mutex::new(None),
            field: Mutex::new(None),
            frame_rejections: Rejections::default(),
            field_rejections: Rejections::default(),
            alarms: AtomicU64::new(0),
            alarm_threshold,
        }
    }

    fn accepted(&self, rejections: &Rejections) {
        rejections.streak.store(0, Ordering::Relaxed);
    }

    /// Count a rejected update. Warns until the streak reaches the threshold,
    /// then reports the producer as misconfigured once.
    fn rejected(&self, rejections: &Rejections, input: &'static str, e: &OverlayError) {
        rejections.total.fetch_add(1, Ordering::Relaxed);
        let streak = rejections.streak.fetch_add(1, Ordering::Relaxed) + 1;
        if streak == self.alarm_threshold {
            self.alarms.fetch_add(1, Ordering::Relaxed);
            error!(
                input,
                error = %e,
                updates = streak,
                "persistent producer misconfiguration: every recent update was rejected"
            );
        } else if streak < self.alarm_threshold {
            warn!(input, error = %e, "rejected update");
        }
    }

    /// Per-slot consistent copy; the pair may mix old and new values.
    fn snapshot(&self) -> (Option<Stamped<Frame>>, Option<Stamped<ScalarField>>) {
        let frame = lock(&self.frame).clone();
        let field = lock(&self.field).clone();
        (frame, field)
    }

    fn is_ready(&self) -> bool {
        lock(&self.frame).is_some() && lock(&self.field).is_some()
    }
}

/// Producer handle for the video stream.
#[derive(Clone)]
pub struct FrameInput {
    slots: Arc<Slots>,
}

impl FrameInput {
    /// Replace the latest frame.
    pub fn push(&self, frame: Frame) {
        *lock(&self.slots.frame) = Some(Stamped::now(frame));
        self.slots.accepted(&self.slots.frame_rejections);
    }

    /// Convert a raw producer buffer and replace the latest frame.
    pub fn push_raw(&self, bytes: &[u8], width: usize, height: usize, format: PixelFormat) -> Result<()> {
        match Frame::from_raw(bytes, width, height, format) {
            Ok(frame) => {
                self.push(frame);
                Ok(())
            }
            Err(e) => {
                self.slots.rejected(&self.slots.frame_rejections, "frame", &e);
                Err(e)
            }
        }
    }
}

/// Producer handle for the thermal stream.
#[derive(Clone)]
pub struct FieldInput {
    slots: Arc<Slots>,
    shape: (usize, usize),
}

impl FieldInput {
    /// Shape every update must declare.
    pub fn expected_shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Reshape `values` to the declared `(rows, cols)` and replace the latest
    /// field. Fails when the sample count does not match the declared shape
    /// or the declared shape differs from the configured sensor shape.
    pub fn push(&self, values: Vec<f32>, shape: (usize, usize)) -> Result<()> {
        let result = self.check_shape(shape).and_then(|()| ScalarField::from_flat(values, shape));
        match result {
            Ok(field) => {
                *lock(&self.slots.field) = Some(Stamped::now(field));
                self.slots.accepted(&self.slots.field_rejections);
                Ok(())
            }
            Err(e) => {
                self.slots.rejected(&self.slots.field_rejections, "field", &e);
                Err(e)
            }
        }
    }

    /// Push using the configured sensor shape.
    pub fn push_flat(&self, values: Vec<f32>) -> Result<()> {
        self.push(values, self.shape)
    }

    fn check_shape(&self, (rows, cols): (usize, usize)) -> Result<()> {
        if (rows, cols) != self.shape {
            return Err(OverlayError::UnexpectedShape {
                rows,
                cols,
                expected_rows: self.shape.0,
                expected_cols: self.shape.1,
            });
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// At least one slot has never been filled.
    WaitingForBoth,
    Ready,
    Stopped,
}

/// Result of a single tick.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    Stopped,
    /// A slot is empty; nothing to do.
    Waiting,
    /// Frame and field arrived too far apart.
    Stale { skew: Duration },
    /// A pipeline stage failed; slots are left as they were.
    Rejected(OverlayError),
    SinkFailed(String),
    Published(HotspotLocation),
}

/// Counters since construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub ticks: u64,
    pub published: u64,
    pub idle: u64,
    pub stale: u64,
    pub pipeline_errors: u64,
    pub sink_errors: u64,
    /// Ticks in a row that ended in a shape error.
    pub consecutive_shape_errors: u64,
    pub rejected_frames: u64,
    pub rejected_fields: u64,
    /// Rejected frame updates since the last accepted one.
    pub consecutive_rejected_frames: u64,
    /// Rejected field updates since the last accepted one.
    pub consecutive_rejected_fields: u64,
    /// Persistent-misconfiguration reports, from ticks or rejected updates.
    pub misconfiguration_alarms: u64,
}

struct Inner<S> {
    slots: Arc<Slots>,
    pipeline: Pipeline,
    config: OverlayConfig,
    sink: Mutex<S>,
    stats: Mutex<SyncStats>,
    stopped: AtomicBool,
}

impl<S: Sink> Inner<S> {
    fn tick(&self) -> TickOutcome {
        if self.stopped.load(Ordering::Acquire) {
            return TickOutcome::Stopped;
        }

        let outcome = match self.slots.snapshot() {
            (Some(frame), Some(field)) => self.process(&frame, &field),
            _ => TickOutcome::Waiting,
        };
        self.record(&outcome);
        outcome
    }

    fn process(&self, frame: &Stamped<Frame>, field: &Stamped<ScalarField>) -> TickOutcome {
        if let Some(max_skew) = self.config.max_input_skew {
            let skew = if frame.received >= field.received {
                frame.received - field.received
            } else {
                field.received - frame.received
            };
            if skew > max_skew {
                return TickOutcome::Stale { skew };
            }
        }

        let rendered = match self.pipeline.render(&frame.value, &field.value) {
            Ok(rendered) => rendered,
            Err(e) => return TickOutcome::Rejected(e),
        };

        match lock(&self.sink).publish(&rendered.frame) {
            Ok(()) => TickOutcome::Published(rendered.hotspot),
            Err(e) => TickOutcome::SinkFailed(format!("{:#}", e)),
        }
    }

    fn record(&self, outcome: &TickOutcome) {
        if matches!(outcome, TickOutcome::Stopped) {
            return;
        }

        let mut stats = lock(&self.stats);
        stats.ticks += 1;

        match outcome {
            TickOutcome::Stopped => {}
            TickOutcome::Waiting => stats.idle += 1,
            TickOutcome::Stale { skew } => {
                stats.stale += 1;
                debug!(skew_ms = skew.as_millis() as u64, "skipped stale frame/field pair");
            }
            TickOutcome::Published(hotspot) => {
                stats.published += 1;
                stats.consecutive_shape_errors = 0;
                debug!(x = hotspot.x, y = hotspot.y, max = hotspot.value, "published overlay");
            }
            TickOutcome::SinkFailed(msg) => {
                stats.sink_errors += 1;
                stats.consecutive_shape_errors = 0;
                warn!(error = %msg, "sink rejected overlay");
            }
            TickOutcome::Rejected(e) => {
                stats.pipeline_errors += 1;
                if e.is_shape_error() {
                    stats.consecutive_shape_errors += 1;
                    let threshold = u64::from(self.config.persistent_error_threshold);
                    if stats.consecutive_shape_errors == threshold {
                        self.slots.alarms.fetch_add(1, Ordering::Relaxed);
                        error!(
                            error = %e,
                            ticks = threshold,
                            "persistent producer misconfiguration: every recent tick failed with a shape error"
                        );
                    } else if stats.consecutive_shape_errors < threshold {
                        warn!(error = %e, "tick aborted");
                    }
                } else {
                    stats.consecutive_shape_errors = 0;
                    warn!(error = %e, "tick aborted");
                }
            }
        }
    }
}

struct Driver {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

fn run_driver<S: Sink>(inner: Arc<Inner<S>>, stop_rx: mpsc::Receiver<()>, period: Duration) {
    loop {
        let started = Instant::now();
        inner.tick();

        let wait = period.saturating_sub(started.elapsed());
        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Owns the latest-value slots, the pipeline and the sink, and drives ticks.
pub struct Synchronizer<S: Sink + 'static> {
    inner: Arc<Inner<S>>,
    driver: Option<Driver>,
}

impl<S: Sink + 'static> Synchronizer<S> {
    pub fn new(config: OverlayConfig, sink: S) -> Result<Self> {
        config.validate()?;
        let inner = Inner {
            slots: Arc::new(Slots::new(u64::from(config.persistent_error_threshold))),
            pipeline: Pipeline::from_config(&config),
            config,
            sink: Mutex::new(sink),
            stats: Mutex::new(SyncStats::default()),
            stopped: AtomicBool::new(false),
        };
        Ok(Synchronizer { inner: Arc::new(inner), driver: None })
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.inner.config
    }

    pub fn frame_input(&self) -> FrameInput {
        FrameInput { slots: Arc::clone(&self.inner.slots) }
    }

    pub fn field_input(&self) -> FieldInput {
        FieldInput {
            slots: Arc::clone(&self.inner.slots),
            shape: self.inner.config.field_shape,
        }
    }

    pub fn state(&self) -> SyncState {
        if self.inner.stopped.load(Ordering::Acquire) {
            SyncState::Stopped
        } else if self.inner.slots.is_ready() {
            SyncState::Ready
        } else {
            SyncState::WaitingForBoth
        }
    }

    pub fn stats(&self) -> SyncStats {
        let slots = &self.inner.slots;
        let mut stats = lock(&self.inner.stats).clone();
        stats.rejected_frames = slots.frame_rejections.total.load(Ordering::Relaxed);
        stats.rejected_fields = slots.field_rejections.total.load(Ordering::Relaxed);
        stats.consecutive_rejected_frames = slots.frame_rejections.streak.load(Ordering::Relaxed);
        stats.consecutive_rejected_fields = slots.field_rejections.streak.load(Ordering::Relaxed);
        stats.misconfiguration_alarms = slots.alarms.load(Ordering::Relaxed);
        stats
    }

    /// Run one tick on the calling thread.
    pub fn tick(&self) -> TickOutcome {
        self.inner.tick()
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_some()
    }

    /// Spawn the periodic driver thread.
    pub fn start(&mut self) -> Result<()> {
        if self.inner.stopped.load(Ordering::Acquire) {
            return Err(OverlayError::Stopped);
        }
        if self.driver.is_some() {
            return Err(OverlayError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let period = self.inner.config.tick_period();
        let handle = std::thread::Builder::new()
            .name("overlay-driver".to_string())
            .spawn(move || run_driver(inner, stop_rx, period))
            .map_err(|e| OverlayError::Spawn(e.to_string()))?;

        info!(tick_rate_hz = self.inner.config.tick_rate_hz, "overlay driver started");
        self.driver = Some(Driver { stop_tx, handle });
        Ok(())
    }

    /// Stop ticking, wait for an in-flight tick to finish and close the sink.
    /// Calling this again is a no-op.
    pub fn stop(&mut self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(driver) = self.driver.take() {
            // The driver may already be gone; the join below is what matters.
            let _ = driver.stop_tx.send(());
            if driver.handle.join().is_err() {
                error!("overlay driver thread panicked");
            }
        }

        if let Err(e) = lock(&self.inner.sink).close() {
            warn!(error = %format!("{:#}", e), "failed to close sink");
        }

        let stats = self.stats();
        info!(ticks = stats.ticks, published = stats.published, "overlay driver stopped");
    }
}

impl<S: Sink + 'static> Drop for Synchronizer<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
