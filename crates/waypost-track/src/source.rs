//! The geolocation source seam.
//!
//! The arrival monitor never talks to a concrete positioning backend; it
//! consumes this narrow capability interface, so the core can be tested
//! against fakes and the GUI can feed simulated positions through the same
//! path a real receiver would use.

use crate::watch::{PositionWatch, WatchUpdate};
use async_trait::async_trait;
use std::time::Duration;
use waypost_core::error::GeolocationError;
use waypost_core::types::PositionFix;

/// Result type for source operations.
pub type SourceResult<T> = std::result::Result<T, GeolocationError>;

/// Options for a continuous position watch.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Maximum staleness per update. If no fix arrives within this window
    /// the watch emits a [`GeolocationError::Timeout`] through its error
    /// channel and keeps listening.
    pub timeout: Duration,

    /// Request high-accuracy fixes from the backend. Advisory: a real
    /// receiver backend may honor it; the replay and channel sources
    /// deliver whatever they are fed and ignore it.
    pub high_accuracy: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            high_accuracy: true,
        }
    }
}

impl WatchOptions {
    /// Sets the staleness window.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Async trait for geolocation sources.
///
/// A source supplies one-shot position reads and a cancellable continuous
/// position stream. At most one watch may be live per source at a time;
/// requesting a second one without clearing the first fails with
/// [`GeolocationError::WatchAlreadyActive`].
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Reads the current position once.
    async fn current_position(&self) -> SourceResult<PositionFix>;

    /// Starts a continuous position watch.
    ///
    /// Each stream item is either a fix or a non-fatal error (staleness
    /// timeout, transient stream failure). The watch runs until its handle
    /// is cleared or dropped.
    fn watch(&self, opts: WatchOptions) -> SourceResult<PositionWatch>;
}

/// A single item delivered by a watch stream: a fix or a non-fatal error.
pub type FixOrError = std::result::Result<PositionFix, GeolocationError>;

/// Converts a raw stream item into the update type the monitor consumes.
pub(crate) fn tag_update(id: waypost_core::types::WatchId, item: FixOrError) -> WatchUpdate {
    match item {
        Ok(fix) => WatchUpdate::Fix { watch_id: id, fix },
        Err(error) => WatchUpdate::Error {
            watch_id: id,
            error,
        },
    }
}
