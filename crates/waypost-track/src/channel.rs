//! Externally fed position source.
//!
//! A [`ChannelSource`] is driven by a [`FixInjector`]: whoever holds the
//! injector pushes fixes and errors into the source, and any live watch sees
//! them through the normal staleness relay. The GUI's simulated-position
//! control and the unit tests both feed the monitor through this path.

use crate::source::{FixOrError, LocationSource, SourceResult, WatchOptions};
use crate::watch::{spawn_staleness_relay, PositionWatch, WatchHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use waypost_core::error::GeolocationError;
use waypost_core::types::{PositionFix, WatchId};

/// Broadcast backlog. Watches drain promptly; lagged items are dropped, which
/// for position data is the right behavior (only the newest fix matters).
const INJECT_CHANNEL_CAPACITY: usize = 32;

/// A location source fed by an external producer.
pub struct ChannelSource {
    feed: broadcast::Sender<FixOrError>,
    last_fix: Arc<Mutex<Option<PositionFix>>>,
    next_watch_id: AtomicU64,
    watch_live: Arc<AtomicBool>,
}

impl ChannelSource {
    /// Creates a source and the injector that feeds it.
    pub fn new() -> (Self, FixInjector) {
        let (feed, _) = broadcast::channel(INJECT_CHANNEL_CAPACITY);
        let last_fix = Arc::new(Mutex::new(None));
        let injector = FixInjector {
            feed: feed.clone(),
            last_fix: Arc::clone(&last_fix),
        };
        let source = Self {
            feed,
            last_fix,
            next_watch_id: AtomicU64::new(0),
            watch_live: Arc::new(AtomicBool::new(false)),
        };
        (source, injector)
    }

    fn allocate_watch_id(&self) -> WatchId {
        WatchId::new(self.next_watch_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[async_trait]
impl LocationSource for ChannelSource {
    async fn current_position(&self) -> SourceResult<PositionFix> {
        self.last_fix
            .lock()
            .clone()
            .ok_or_else(|| GeolocationError::unavailable("no fix received yet"))
    }

    fn watch(&self, opts: WatchOptions) -> SourceResult<PositionWatch> {
        if self
            .watch_live
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(GeolocationError::WatchAlreadyActive);
        }

        let id = self.allocate_watch_id();
        let (raw_tx, raw_rx) = mpsc::channel::<FixOrError>(16);
        let mut feed = self.feed.subscribe();

        let feeder = tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(item) => {
                        if raw_tx.send(item).await.is_err() {
                            return;
                        }
                    }
                    // Stale backlog dropped; only the newest fixes matter.
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });

        let (rx, relay) = spawn_staleness_relay(id, raw_rx, opts.timeout);
        let handle = WatchHandle::new(id, Arc::clone(&self.watch_live), vec![feeder, relay]);

        Ok(PositionWatch {
            id,
            updates: ReceiverStream::new(rx),
            handle,
        })
    }
}

/// Feeds a [`ChannelSource`] with fixes and errors.
#[derive(Clone)]
pub struct FixInjector {
    feed: broadcast::Sender<FixOrError>,
    last_fix: Arc<Mutex<Option<PositionFix>>>,
}

impl FixInjector {
    /// Pushes a fix. Silently dropped when no watch is listening.
    pub fn send_fix(&self, fix: PositionFix) {
        *self.last_fix.lock() = Some(fix.clone());
        let _ = self.feed.send(Ok(fix));
    }

    /// Pushes a non-fatal error into the stream.
    pub fn send_error(&self, error: GeolocationError) {
        let _ = self.feed.send(Err(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::WatchUpdate;
    use std::time::Duration;
    use tokio_stream::StreamExt;
    use waypost_core::types::LatLng;

    #[tokio::test]
    async fn test_injected_fix_reaches_watch() {
        let (source, injector) = ChannelSource::new();
        let mut watch = source
            .watch(WatchOptions::default().with_timeout(Duration::from_millis(200)))
            .unwrap();

        injector.send_fix(PositionFix::now(LatLng::new(9.0, 9.0)));
        match watch.updates.next().await.unwrap() {
            WatchUpdate::Fix { fix, .. } => assert_eq!(fix.location, LatLng::new(9.0, 9.0)),
            other => panic!("expected fix, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_current_position_tracks_last_fix() {
        let (source, injector) = ChannelSource::new();
        assert!(source.current_position().await.is_err());

        injector.send_fix(PositionFix::now(LatLng::new(3.0, 4.0)));
        let fix = source.current_position().await.unwrap();
        assert_eq!(fix.location, LatLng::new(3.0, 4.0));
    }

    #[tokio::test]
    async fn test_watch_ids_are_fresh_per_subscription() {
        let (source, _injector) = ChannelSource::new();
        let opts = WatchOptions::default().with_timeout(Duration::from_millis(200));

        let first = source.watch(opts).unwrap();
        let first_id = first.id;
        first.handle.clear();

        let second = source.watch(opts).unwrap();
        assert_ne!(first_id, second.id);
    }

    #[tokio::test]
    async fn test_injected_error_is_non_fatal() {
        let (source, injector) = ChannelSource::new();
        let mut watch = source
            .watch(WatchOptions::default().with_timeout(Duration::from_millis(200)))
            .unwrap();

        injector.send_error(GeolocationError::stream("glitch"));
        injector.send_fix(PositionFix::now(LatLng::new(1.0, 1.0)));

        assert!(matches!(
            watch.updates.next().await.unwrap(),
            WatchUpdate::Error { .. }
        ));
        assert!(matches!(
            watch.updates.next().await.unwrap(),
            WatchUpdate::Fix { .. }
        ));
    }
}
