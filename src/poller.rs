use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{RecvTimeoutError, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use crate::api::{ApiClient, Download, ResourceDownload};
use crate::error::ConsoleError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Latest successfully fetched download state. Both lists are replaced
/// together; a failed cycle leaves the previous snapshot in place.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub downloads: Vec<Download>,
    pub resource_downloads: Vec<ResourceDownload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Updated,
    /// Another cycle was in flight; nothing was fetched.
    Skipped,
}

/// Periodic download-status poller with an at-most-one-in-flight guarantee.
///
/// Cloning shares the snapshot; one clone runs the interval loop (see
/// [`Poller::start`]) while others read [`Poller::snapshot`].
pub struct Poller<C: ApiClient> {
    api: Arc<C>,
    state: Arc<PollerState>,
}

struct PollerState {
    snapshot: Mutex<Snapshot>,
    in_flight: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl<C: ApiClient> Clone for Poller<C> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            state: Arc::clone(&self.state),
        }
    }
}

impl<C: ApiClient> Poller<C> {
    pub fn new(api: C) -> Self {
        Self {
            api: Arc::new(api),
            state: Arc::new(PollerState {
                snapshot: Mutex::new(Snapshot::default()),
                in_flight: AtomicBool::new(false),
                last_error: Mutex::new(None),
            }),
        }
    }

    /// Runs one poll cycle: downloads first, then resource downloads; the
    /// snapshot is replaced only when both fetches succeed. If a cycle is
    /// already in flight this one is skipped entirely, issuing no requests.
    /// A failed cycle keeps the previous snapshot (stale but available) and
    /// records the error for [`Poller::last_error`].
    pub fn poll_once(&self) -> Result<PollOutcome, ConsoleError> {
        if self.state.in_flight.swap(true, Ordering::SeqCst) {
            debug!("poll cycle already in flight, skipping");
            return Ok(PollOutcome::Skipped);
        }
        let result = self.cycle();
        self.state.in_flight.store(false, Ordering::SeqCst);
        match result {
            Ok(()) => {
                *self.state.last_error.lock().unwrap() = None;
                Ok(PollOutcome::Updated)
            }
            Err(err) => {
                *self.state.last_error.lock().unwrap() = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn cycle(&self) -> Result<(), ConsoleError> {
        let downloads = self.api.fetch_downloads()?;
        let resource_downloads = self.api.fetch_resource_downloads()?;
        let mut snapshot = self.state.snapshot.lock().unwrap();
        *snapshot = Snapshot {
            downloads,
            resource_downloads,
        };
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot.lock().unwrap().clone()
    }

    /// Error recorded by the most recent failed cycle, cleared by the next
    /// successful one.
    pub fn last_error(&self) -> Option<String> {
        self.state.last_error.lock().unwrap().clone()
    }
}

impl<C: ApiClient + 'static> Poller<C> {
    /// Spawns the interval loop: one immediate cycle, then one per tick.
    /// Failed cycles are logged and polling continues. Dropping (or
    /// explicitly stopping) the returned handle wakes the loop so that no
    /// new cycle starts after the stop signal, then waits for the thread;
    /// an in-flight cycle finishes and its result dies with the handle.
    pub fn start(&self, interval: Duration) -> PollerHandle {
        let poller = self.clone();
        let (stop_tx, stop_rx) = channel::<()>();
        let join = std::thread::spawn(move || {
            loop {
                if let Err(err) = poller.poll_once() {
                    warn!(error = %err, "poll cycle failed");
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        PollerHandle {
            stop_tx,
            join: Some(join),
        }
    }
}

pub struct PollerHandle {
    stop_tx: Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn stop(self) {
        // Drop does the work.
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
