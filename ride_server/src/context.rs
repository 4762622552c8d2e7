//! Process-wide server state.
//!
//! A [`ServerContext`] is built once at startup and owns everything that lives as long as the server: the ride API
//! (and through it the status store), the log of recent worker failures, and the background worker tasks. Handlers get
//! clones of the API and the error log as app data. [`ServerContext::shutdown`] tears it all down again.
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use log::*;
use ride_matching_engine::{RideMatchingApi, StatusStore};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

pub const DEFAULT_ERROR_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub time: DateTime<Utc>,
    /// The worker (or other component) that reported the failure.
    pub source: String,
    pub message: String,
}

/// A bounded queue of recent non-fatal failures. The oldest entry is dropped once the queue is full.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    capacity: usize,
    entries: Arc<Mutex<VecDeque<ErrorEntry>>>,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_LOG_CAPACITY)
    }
}

impl ErrorLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))) }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ErrorEntry>> {
        // A panic while holding the lock cannot leave the queue half-written
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record<S: Into<String>, M: ToString>(&self, source: S, message: M) {
        let entry = ErrorEntry { time: Utc::now(), source: source.into(), message: message.to_string() };
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// A copy of the current entries, oldest first.
    pub fn entries(&self) -> Vec<ErrorEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

pub struct ServerContext<B> {
    api: RideMatchingApi<B>,
    errors: ErrorLog,
    workers: Vec<JoinHandle<()>>,
}

impl<B> ServerContext<B> {
    pub fn new(api: RideMatchingApi<B>, errors: ErrorLog) -> Self {
        Self { api, errors, workers: Vec::new() }
    }

    pub fn api(&self) -> &RideMatchingApi<B> {
        &self.api
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    /// Hands a background task over to the context, which stops it at shutdown.
    pub fn add_worker(&mut self, worker: JoinHandle<()>) {
        self.workers.push(worker);
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl<B: StatusStore> ServerContext<B> {
    /// Stops every worker and closes the status store.
    pub async fn shutdown(mut self) {
        for worker in &self.workers {
            worker.abort();
        }
        for result in futures::future::join_all(self.workers.drain(..)).await {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    warn!("🚀️ A worker ended abnormally. {e}");
                }
            }
        }
        if let Err(e) = self.api.db_mut().close().await {
            warn!("🚀️ Could not close the status store cleanly. {e}");
        }
        info!("🚀️ Server context shut down");
    }
}
