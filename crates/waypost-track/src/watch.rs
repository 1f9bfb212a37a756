//! Watch lifecycle: the subscription handle and the staleness relay.
//!
//! A watch is a pair of tokio tasks (the source-specific feeder plus the
//! staleness relay below) feeding a bounded channel. The handle owns both
//! tasks and the source's single-watch slot; clearing it is idempotent and
//! releases the slot so a new watch can be started.

use crate::source::{tag_update, FixOrError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use waypost_core::error::GeolocationError;
use waypost_core::types::{PositionFix, WatchId};

/// Buffered updates per watch. The monitor drains promptly; a small buffer
/// only has to absorb scheduling jitter.
const WATCH_CHANNEL_CAPACITY: usize = 16;

/// An update delivered by a watch stream, tagged with the subscription that
/// produced it so late deliveries can be detected after the watch is cleared.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchUpdate {
    /// A position fix arrived.
    Fix { watch_id: WatchId, fix: PositionFix },
    /// The source reported a non-fatal error; the watch keeps running.
    Error {
        watch_id: WatchId,
        error: GeolocationError,
    },
}

impl WatchUpdate {
    /// Returns the id of the watch that produced this update.
    pub fn watch_id(&self) -> WatchId {
        match self {
            WatchUpdate::Fix { watch_id, .. } => *watch_id,
            WatchUpdate::Error { watch_id, .. } => *watch_id,
        }
    }
}

/// A live continuous position subscription.
#[derive(Debug)]
pub struct PositionWatch {
    /// Subscription token.
    pub id: WatchId,
    /// Stream of fixes and non-fatal errors.
    pub updates: ReceiverStream<WatchUpdate>,
    /// Handle owning the watch lifecycle.
    pub handle: WatchHandle,
}

/// Owns a live watch: clearing it cancels the feeder and relay tasks and
/// releases the source's single-watch slot.
///
/// `clear` is idempotent — clearing an already-cleared watch is a no-op,
/// never an error. Dropping the handle also clears it.
#[derive(Debug)]
pub struct WatchHandle {
    id: WatchId,
    cleared: AtomicBool,
    slot: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl WatchHandle {
    pub(crate) fn new(id: WatchId, slot: Arc<AtomicBool>, tasks: Vec<JoinHandle<()>>) -> Self {
        Self {
            id,
            cleared: AtomicBool::new(false),
            slot,
            tasks,
        }
    }

    /// Returns the subscription token this handle owns.
    pub fn id(&self) -> WatchId {
        self.id
    }

    /// Returns true if the watch has been cleared.
    pub fn is_cleared(&self) -> bool {
        self.cleared.load(Ordering::Acquire)
    }

    /// Cancels the watch. Idempotent: repeated calls are no-ops.
    pub fn clear(&self) {
        if self.cleared.swap(true, Ordering::AcqRel) {
            return;
        }
        for task in &self.tasks {
            task.abort();
        }
        self.slot.store(false, Ordering::Release);
        debug!(watch = %self.id, "position watch cleared");
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Forwards raw source items into the watch channel, emitting a
/// [`GeolocationError::Timeout`] whenever no item arrives within the
/// staleness window. Timeouts do not tear the watch down.
pub(crate) fn spawn_staleness_relay(
    id: WatchId,
    mut raw: mpsc::Receiver<FixOrError>,
    staleness: Duration,
) -> (mpsc::Receiver<WatchUpdate>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
    let timeout_ms = staleness.as_millis() as u64;

    let task = tokio::spawn(async move {
        loop {
            match tokio::time::timeout(staleness, raw.recv()).await {
                Ok(Some(item)) => {
                    if tx.send(tag_update(id, item)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!(watch = %id, "position feeder finished");
                    break;
                }
                Err(_) => {
                    warn!(watch = %id, timeout_ms, "no position fix within staleness window");
                    let update = tag_update(id, Err(GeolocationError::Timeout { timeout_ms }));
                    if tx.send(update).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    (rx, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;
    use waypost_core::types::LatLng;

    #[tokio::test]
    async fn test_relay_forwards_fixes_and_timeouts() {
        let (raw_tx, raw_rx) = mpsc::channel(4);
        let id = WatchId::new(1);
        let (rx, _task) = spawn_staleness_relay(id, raw_rx, Duration::from_millis(50));
        let mut updates = ReceiverStream::new(rx);

        raw_tx
            .send(Ok(PositionFix::now(LatLng::new(1.0, 2.0))))
            .await
            .unwrap();
        match updates.next().await.unwrap() {
            WatchUpdate::Fix { watch_id, fix } => {
                assert_eq!(watch_id, id);
                assert_eq!(fix.location, LatLng::new(1.0, 2.0));
            }
            other => panic!("expected fix, got {other:?}"),
        }

        // No item within the window: a timeout is emitted and the relay
        // keeps going.
        match updates.next().await.unwrap() {
            WatchUpdate::Error { watch_id, error } => {
                assert_eq!(watch_id, id);
                assert_eq!(error, GeolocationError::Timeout { timeout_ms: 50 });
            }
            other => panic!("expected timeout, got {other:?}"),
        }

        raw_tx
            .send(Ok(PositionFix::now(LatLng::new(3.0, 4.0))))
            .await
            .unwrap();
        assert!(matches!(
            updates.next().await.unwrap(),
            WatchUpdate::Fix { .. }
        ));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let slot = Arc::new(AtomicBool::new(true));
        let handle = WatchHandle::new(WatchId::new(3), Arc::clone(&slot), Vec::new());

        handle.clear();
        assert!(handle.is_cleared());
        assert!(!slot.load(Ordering::Acquire));

        // Second clear is a no-op, never an error.
        handle.clear();
        assert!(handle.is_cleared());
    }

    #[tokio::test]
    async fn test_drop_releases_slot() {
        let slot = Arc::new(AtomicBool::new(true));
        {
            let _handle = WatchHandle::new(WatchId::new(4), Arc::clone(&slot), Vec::new());
        }
        assert!(!slot.load(Ordering::Acquire));
    }
}
