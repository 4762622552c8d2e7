//! The generic polling engine.
//!
//! A [`StatusTracker`] turns periodic snapshot fetches into change notifications. While at least one listener is
//! registered, a background task fetches the tracked status every poll interval. When a snapshot carries a higher
//! version than the last one delivered, it is cached and handed to every registered listener, in registration order.
//!
//! The first snapshot fetched after the task starts is always delivered. It is the baseline that later snapshots are
//! compared against, and listeners registered before it arrives get it as their first notification.
//!
//! Nothing that goes wrong while polling stops the task. Fetch failures and listener failures (including panics) go to
//! the tracker's [`ErrorHandler`], the cached snapshot is kept, and polling carries on. Consecutive fetch failures
//! stretch the poll interval exponentially, up to a ceiling.
//!
//! The task stops when
//! * the last listener is removed (registering a listener again restarts it, with a fresh baseline),
//! * a terminal snapshot has been delivered (no further change is possible),
//! * [`StatusTracker::shutdown`] is called, or the tracker is dropped.
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
        MutexGuard,
    },
    time::Duration,
};

use log::*;
use ride_matching_engine::status_types::{Status, Version};
use tokio::task::JoinHandle;

use crate::{ErrorHandler, StatusGetter, TrackerConfig, TrackerError};

/// Receives every new snapshot of a tracked status.
///
/// Listeners run on the tracker's task. They should return quickly; anything slow belongs on a task of its own.
pub trait StatusListener<S>: Send + Sync {
    fn on_status(&self, status: &S) -> Result<(), TrackerError>;
}

impl<S, F> StatusListener<S> for F
where F: Fn(&S) -> Result<(), TrackerError> + Send + Sync
{
    fn on_status(&self, status: &S) -> Result<(), TrackerError> {
        self(status)
    }
}

/// Identifies a registered listener. Registering the same listener again yields the same handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

#[derive(Debug, Clone, Copy)]
pub struct TrackerOptions {
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub max_backoff: Duration,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self::from(&TrackerConfig::default())
    }
}

impl From<&TrackerConfig> for TrackerOptions {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            fetch_timeout: config.fetch_timeout,
            max_backoff: config.max_backoff,
        }
    }
}

impl TrackerOptions {
    /// The wait before the next poll, after `failures` consecutive failed fetches.
    pub fn delay_after(&self, failures: u32) -> Duration {
        let factor = 2u32.saturating_pow(failures.min(16));
        self.poll_interval.saturating_mul(factor).min(self.max_backoff.max(self.poll_interval))
    }
}

/// The address of the listener's allocation. Two clones of one `Arc` share it.
pub(crate) fn identity<T: ?Sized>(listener: &Arc<T>) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

struct Entry<S> {
    handle: ListenerHandle,
    identity: usize,
    listener: Arc<dyn StatusListener<S>>,
}

struct Registry<S> {
    entries: Vec<Entry<S>>,
    task: Option<JoinHandle<()>>,
    /// A terminal snapshot has been delivered.
    finished: bool,
    shut_down: bool,
}

struct Shared<S> {
    registry: Mutex<Registry<S>>,
    latest: Mutex<Option<S>>,
    next_handle: AtomicU64,
}

impl<S> Shared<S> {
    fn registry(&self) -> MutexGuard<'_, Registry<S>> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn latest(&self) -> MutexGuard<'_, Option<S>> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A point-in-time copy of the listener list. Changes made during a dispatch apply from the next one.
    fn listeners(&self) -> Vec<Arc<dyn StatusListener<S>>> {
        self.registry().entries.iter().map(|e| Arc::clone(&e.listener)).collect()
    }
}

pub struct StatusTracker<G: StatusGetter> {
    getter: Arc<G>,
    shared: Arc<Shared<G::Status>>,
    options: TrackerOptions,
    error_handler: Arc<dyn ErrorHandler>,
}

impl<G: StatusGetter> StatusTracker<G> {
    pub fn new(getter: G, options: TrackerOptions, error_handler: Arc<dyn ErrorHandler>) -> Self {
        let registry = Registry { entries: Vec::new(), task: None, finished: false, shut_down: false };
        let shared =
            Shared { registry: Mutex::new(registry), latest: Mutex::new(None), next_handle: AtomicU64::new(1) };
        Self { getter: Arc::new(getter), shared: Arc::new(shared), options, error_handler }
    }

    pub fn getter(&self) -> &G {
        &self.getter
    }

    /// Registers `listener` and makes sure the polling task is running. Returns straight away.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_tracking(&self, listener: Arc<dyn StatusListener<G::Status>>) -> ListenerHandle {
        let id = identity(&listener);
        let mut registry = self.shared.registry();
        let handle = match registry.entries.iter().find(|e| e.identity == id) {
            Some(entry) => entry.handle,
            None => {
                let handle = ListenerHandle(self.shared.next_handle.fetch_add(1, Ordering::Relaxed));
                registry.entries.push(Entry { handle, identity: id, listener });
                trace!("📡 Listener {handle:?} added to tracker for {}", self.getter.describe());
                handle
            },
        };
        let idle = registry.task.as_ref().map_or(true, |t| t.is_finished());
        if idle && !registry.finished && !registry.shut_down {
            debug!("📡 Started tracking {}", self.getter.describe());
            let task = poll_loop(
                Arc::clone(&self.getter),
                Arc::clone(&self.shared),
                self.options,
                Arc::clone(&self.error_handler),
            );
            registry.task = Some(tokio::spawn(task));
        }
        handle
    }

    /// Unregisters a listener. Returns false if it was not registered. Polling stops once no listeners are left.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let mut registry = self.shared.registry();
        let before = registry.entries.len();
        registry.entries.retain(|e| e.handle != handle);
        let removed = registry.entries.len() < before;
        if registry.entries.is_empty() {
            if let Some(task) = registry.task.take() {
                task.abort();
                debug!("📡 No listeners left. Stopped tracking {}", self.getter.describe());
            }
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.shared.registry().entries.len()
    }

    /// The most recently delivered snapshot, if any.
    pub fn most_recent(&self) -> Option<G::Status> {
        self.shared.latest().clone()
    }

    /// Seeds the cache with a snapshot fetched outside the polling task. Older snapshots are ignored. Listeners are not
    /// notified, and the polling baseline is untouched: the task's first fetch is still delivered to every listener,
    /// even when it carries the primed version.
    pub fn prime(&self, snapshot: G::Status) {
        let mut latest = self.shared.latest();
        if latest.as_ref().map_or(true, |s| s.version() < snapshot.version()) {
            *latest = Some(snapshot);
        }
    }

    /// True while the polling task is alive.
    pub fn is_polling(&self) -> bool {
        self.shared.registry().task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// True once a terminal snapshot has been delivered.
    pub fn is_finished(&self) -> bool {
        self.shared.registry().finished
    }

    /// Stops polling for good. Listeners stay registered and the cached snapshot stays readable.
    pub fn shutdown(&self) {
        let mut registry = self.shared.registry();
        registry.shut_down = true;
        if let Some(task) = registry.task.take() {
            task.abort();
            debug!("📡 Tracker for {} shut down", self.getter.describe());
        }
    }
}

impl<G: StatusGetter> Drop for StatusTracker<G> {
    fn drop(&mut self) {
        if let Some(task) = self.shared.registry().task.take() {
            task.abort();
        }
    }
}

async fn poll_loop<G: StatusGetter>(
    getter: Arc<G>,
    shared: Arc<Shared<G::Status>>,
    options: TrackerOptions,
    error_handler: Arc<dyn ErrorHandler>,
) {
    let mut last_seen: Option<Version> = None;
    let mut failures = 0u32;
    loop {
        match tokio::time::timeout(options.fetch_timeout, getter.fetch()).await {
            Ok(Ok(snapshot)) => {
                failures = 0;
                if last_seen.map_or(true, |v| snapshot.version() > v) {
                    last_seen = Some(snapshot.version());
                    let terminal = snapshot.is_terminal();
                    *shared.latest() = Some(snapshot.clone());
                    dispatch(&shared, &snapshot, error_handler.as_ref());
                    if terminal {
                        shared.registry().finished = true;
                        debug!("📡 {} reached a terminal state. Polling stopped", getter.describe());
                        return;
                    }
                } else {
                    trace!("📡 No change to {} (v{})", getter.describe(), snapshot.version());
                }
            },
            Ok(Err(e)) => {
                failures = failures.saturating_add(1);
                error_handler.handle(e);
            },
            Err(_) => {
                failures = failures.saturating_add(1);
                error_handler.handle(TrackerError::Timeout(options.fetch_timeout));
            },
        }
        tokio::time::sleep(options.delay_after(failures)).await;
    }
}

fn dispatch<S: Status>(shared: &Shared<S>, snapshot: &S, error_handler: &dyn ErrorHandler) {
    let listeners = shared.listeners();
    trace!("📡 Delivering v{} of {} to {} listeners", snapshot.version(), snapshot.id(), listeners.len());
    for listener in listeners {
        match catch_unwind(AssertUnwindSafe(|| listener.on_status(snapshot))) {
            Ok(Ok(())) => {},
            Ok(Err(e)) => error_handler.handle(e),
            Err(panic) => error_handler.handle(TrackerError::ListenerPanic(panic_message(panic.as_ref()))),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
