// src/fetch/manager.rs

use reqwest::Client;
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{payload, DownloadEvent, DownloadId, DownloadRequest};
use crate::error::DownloadError;

struct InFlight {
    destination: PathBuf,
    cancel: CancellationToken,
}

/// State shared between the manager and its transfer tasks.
///
/// Every event is sent while `active` is locked and only if the item is still
/// present, so cancellation and completion can never both win.
struct Shared {
    active: Mutex<HashMap<DownloadId, InFlight>>,
    events: mpsc::UnboundedSender<DownloadEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HashMap<DownloadId, InFlight>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, event: DownloadEvent) {
        // receiver gone means nobody is listening any more
        let _ = self.events.send(event);
    }

    fn progress(&self, id: DownloadId, percent: u8) {
        let active = self.lock();
        if active.contains_key(&id) {
            self.send(DownloadEvent::Progress { id, percent });
        }
    }

    fn complete(&self, id: DownloadId, outcome: Result<(), DownloadError>) {
        let mut active = self.lock();
        let Some(entry) = active.remove(&id) else {
            debug!(id = %id, "completion after cancellation dropped");
            return;
        };

        match outcome {
            Ok(()) => {
                info!(id = %id, dest = %entry.destination.display(), "download saved");
                self.send(DownloadEvent::Finished {
                    id,
                    destination: entry.destination,
                });
            }
            Err(err) => {
                warn!(id = %id, dest = %entry.destination.display(), error = %err, "download failed");
                self.send(DownloadEvent::Failed {
                    id,
                    message: err.to_string(),
                });
            }
        }

        if active.is_empty() {
            info!("all downloads finished");
            self.send(DownloadEvent::AllFinished);
        }
    }
}

/// Runs any number of concurrent GETs, each saved to its own destination,
/// and reports on them through the event channel returned by [`new`].
///
/// Must be used from within a tokio runtime.
///
/// [`new`]: DownloadManager::new
pub struct DownloadManager {
    client: Client,
    shared: Arc<Shared>,
    next_id: AtomicU64,
}

impl DownloadManager {
    pub fn new(client: Client) -> (Self, mpsc::UnboundedReceiver<DownloadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Self {
            client,
            shared: Arc::new(Shared {
                active: Mutex::new(HashMap::new()),
                events: tx,
            }),
            next_id: AtomicU64::new(1),
        };
        (manager, rx)
    }

    /// Register `request` and start fetching it in the background.
    pub fn submit(&self, request: DownloadRequest) -> DownloadId {
        self.submit_batch([request])[0]
    }

    /// Register every request of a batch, then start fetching them.
    ///
    /// All entries are in the active set before the first transfer starts, so
    /// an early completion cannot empty the set and close the batch too soon.
    pub fn submit_batch<I>(&self, requests: I) -> Vec<DownloadId>
    where
        I: IntoIterator<Item = DownloadRequest>,
    {
        let mut queued = Vec::new();
        {
            let mut active = self.shared.lock();
            for request in requests {
                let id = DownloadId(self.next_id.fetch_add(1, Ordering::Relaxed));
                let cancel = CancellationToken::new();
                active.insert(
                    id,
                    InFlight {
                        destination: request.destination.clone(),
                        cancel: cancel.clone(),
                    },
                );
                debug!(id = %id, url = %request.url, "download queued");
                queued.push((id, request, cancel));
            }
        }

        let ids = queued.iter().map(|(id, _, _)| *id).collect();
        for (id, request, cancel) in queued {
            self.spawn_transfer(id, request, cancel);
        }
        ids
    }

    fn spawn_transfer(&self, id: DownloadId, request: DownloadRequest, cancel: CancellationToken) {
        let shared = Arc::clone(&self.shared);
        let client = self.client.clone();
        tokio::spawn(async move {
            let start = Instant::now();
            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(id = %id, "download cancelled");
                    return;
                }
                outcome = fetch_to_disk(&shared, &client, id, &request) => outcome,
            };
            debug!(id = %id, elapsed = ?start.elapsed(), "transfer ended");
            shared.complete(id, outcome);
        });
    }

    /// Cancel every outstanding download and empty the active set.
    ///
    /// No event is delivered for the cancelled items afterwards, and no
    /// `AllFinished` is raised for the batch. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut active = self.shared.lock();
        let count = active.len();
        for (id, entry) in active.drain() {
            entry.cancel.cancel();
            debug!(id = %id, dest = %entry.destination.display(), "cancelling");
        }
        if count > 0 {
            info!(count, "cancelled downloads");
        }
        count
    }

    /// Number of downloads still in flight.
    pub fn active_count(&self) -> usize {
        self.shared.lock().len()
    }
}

async fn fetch_to_disk(
    shared: &Shared,
    client: &Client,
    id: DownloadId,
    request: &DownloadRequest,
) -> Result<(), DownloadError> {
    let mut last = None;
    let bytes = payload::download_payload(client, &request.url, |received, total| {
        if let Some(pct) = payload::percent(received, total) {
            if last != Some(pct) {
                last = Some(pct);
                shared.progress(id, pct);
            }
        }
    })
    .await?;

    payload::save_payload(&request.destination, &bytes).await
}
