//! Device orientation and screen resolution change detection via polling.
//!
//! The platform has no push notification for either property, so the
//! display is sampled at a fixed interval on a lightweight tokio task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::device::probe::DisplayProbe;
use crate::device::types::{DeviceChange, OrientationState};

/// Default polling interval (`checkDelay`).
pub const DEFAULT_CHECK_DELAY: Duration = Duration::from_millis(500);

/// Observer invoked synchronously on the watcher task for every change.
pub type ChangeCallback = Box<dyn Fn(&DeviceChange) + Send + Sync>;

/// Lifecycle of an [`OrientationWatcher`]. There is no restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Polling,
    Stopped,
}

/// Compares display samples against the last known state.
///
/// Ignored orientations (unknown, face up, face down) never replace the
/// stored orientation, so passing through one of them does not hide the
/// next real rotation.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    last: OrientationState,
}

impl ChangeDetector {
    pub fn new(baseline: OrientationState) -> Self {
        Self { last: baseline }
    }

    pub fn last(&self) -> OrientationState {
        self.last
    }

    /// Record a new sample and return the changes it represents, resolution
    /// first.
    pub fn observe(&mut self, sample: OrientationState) -> Vec<DeviceChange> {
        let mut changes = Vec::new();

        if sample.resolution != self.last.resolution {
            self.last.resolution = sample.resolution;
            changes.push(DeviceChange::ResolutionChanged(sample.resolution));
        }

        if !sample.orientation.is_ignored() && sample.orientation != self.last.orientation {
            self.last.orientation = sample.orientation;
            changes.push(DeviceChange::OrientationChanged(sample.orientation));
        }

        changes
    }
}

type SharedCallback = Arc<dyn Fn(&DeviceChange) + Send + Sync>;

/// Ordered observer list.
#[derive(Default)]
struct Subscribers {
    callbacks: Mutex<Vec<SharedCallback>>,
}

impl Subscribers {
    fn push(&self, callback: ChangeCallback) {
        self.callbacks.lock().push(Arc::from(callback));
    }

    /// Notify a snapshot of the list, so callbacks may subscribe others.
    fn notify(&self, change: &DeviceChange) {
        let callbacks = self.callbacks.lock().clone();
        for callback in &callbacks {
            callback(change);
        }
    }
}

/// Polls a [`DisplayProbe`] and notifies subscribers of changes.
///
/// Constructed once at wiring time and shared with the components that
/// need display changes.
pub struct OrientationWatcher {
    probe: Arc<dyn DisplayProbe>,
    interval: Duration,
    subscribers: Arc<Subscribers>,
    alive: Arc<AtomicBool>,
    state: WatcherState,
    task: Option<JoinHandle<()>>,
}

impl OrientationWatcher {
    /// Create an idle watcher. A zero interval falls back to the default.
    pub fn new(probe: Arc<dyn DisplayProbe>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            tracing::warn!(
                "orientation watcher interval must be positive, using {}ms",
                DEFAULT_CHECK_DELAY.as_millis()
            );
            DEFAULT_CHECK_DELAY
        } else {
            interval
        };

        Self {
            probe,
            interval,
            subscribers: Arc::new(Subscribers::default()),
            alive: Arc::new(AtomicBool::new(false)),
            state: WatcherState::Idle,
            task: None,
        }
    }

    /// Create a watcher and start polling immediately.
    pub fn spawn(probe: Arc<dyn DisplayProbe>, interval: Duration) -> Self {
        let mut watcher = Self::new(probe, interval);
        watcher.start();
        watcher
    }

    /// Start the polling task. Only valid from `Idle` and inside a tokio
    /// runtime; otherwise this logs and does nothing.
    pub fn start(&mut self) {
        if self.state != WatcherState::Idle {
            tracing::warn!("orientation watcher cannot start from {:?}", self.state);
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("orientation watcher needs a tokio runtime: {e}");
                return;
            }
        };

        self.alive.store(true, Ordering::Relaxed);
        let probe = Arc::clone(&self.probe);
        let subscribers = Arc::clone(&self.subscribers);
        let alive = Arc::clone(&self.alive);
        let interval = self.interval;

        self.task = Some(runtime.spawn(async move {
            poll_display(&*probe, &subscribers, &alive, interval).await;
        }));
        self.state = WatcherState::Polling;
    }

    /// Add an observer. Observers are notified in subscription order.
    /// Observers added from inside a callback see the next change onwards.
    pub fn subscribe(&self, callback: ChangeCallback) {
        self.subscribers.push(callback);
    }

    /// Subscribe through a channel, for consumers that drain changes on
    /// their own schedule.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<DeviceChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(Box::new(move |change| {
            let _ = tx.send(*change);
        }));
        rx
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ask the polling task to exit. It finishes its current sleep first.
    pub fn stop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
        self.state = WatcherState::Stopped;
    }

    /// Wait for the polling task to exit after [`OrientationWatcher::stop`].
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("orientation watcher task failed: {e}");
            }
        }
    }
}

impl Drop for OrientationWatcher {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
    }
}

/// Polling loop run by the watcher task.
async fn poll_display(
    probe: &dyn DisplayProbe,
    subscribers: &Subscribers,
    alive: &AtomicBool,
    interval: Duration,
) {
    let mut detector = ChangeDetector::new(probe.sample());
    let baseline = detector.last();
    tracing::debug!(
        "orientation watcher started at {} ({}), polling every {}ms",
        baseline.resolution,
        baseline.orientation,
        interval.as_millis()
    );

    while alive.load(Ordering::Relaxed) {
        for change in detector.observe(probe.sample()) {
            match change {
                DeviceChange::ResolutionChanged(resolution) => {
                    tracing::info!("screen resolution changed to {resolution}");
                }
                DeviceChange::OrientationChanged(orientation) => {
                    tracing::info!("device orientation changed to {orientation}");
                }
            }
            subscribers.notify(&change);
        }

        tokio::time::sleep(interval).await;
    }

    tracing::debug!("orientation watcher stopped");
}
