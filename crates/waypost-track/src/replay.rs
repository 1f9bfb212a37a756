//! Scripted position playback.
//!
//! A [`ReplaySource`] plays a fixed list of steps on a set cadence: fixes,
//! silent gaps (which exercise the staleness timeout), and injected stream
//! errors. It backs the headless mode and the integration tests.

use crate::source::{FixOrError, LocationSource, SourceResult, WatchOptions};
use crate::watch::{spawn_staleness_relay, PositionWatch, WatchHandle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use waypost_core::error::GeolocationError;
use waypost_core::types::{LatLng, PositionFix, WatchId};

/// One step of a replay script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum ReplayStep {
    /// Deliver a fix at this location.
    Fix { lat: f64, lng: f64 },
    /// Stay silent for the given time on top of the cadence, letting the
    /// staleness window elapse.
    Silence { ms: u64 },
    /// Inject a transient stream error.
    Error { reason: String },
}

/// A replay script: a cadence plus an ordered list of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayScript {
    /// Delay before each step, in milliseconds.
    #[serde(default = "default_cadence_ms")]
    pub cadence_ms: u64,

    /// Steps played in order. The watch stream ends after the last step.
    pub steps: Vec<ReplayStep>,
}

fn default_cadence_ms() -> u64 {
    1_000
}

impl ReplayScript {
    /// Loads a script from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SourceResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GeolocationError::unavailable(e.to_string()))?;
        serde_yaml::from_str(&contents).map_err(|e| GeolocationError::unavailable(e.to_string()))
    }

    /// Returns the cadence as a [`Duration`].
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms)
    }
}

/// A location source that plays back a scripted sequence of fixes.
pub struct ReplaySource {
    script: ReplayScript,
    next_watch_id: AtomicU64,
    watch_live: Arc<AtomicBool>,
}

impl ReplaySource {
    /// Creates a source from a script.
    pub fn new(script: ReplayScript) -> Self {
        Self {
            script,
            next_watch_id: AtomicU64::new(0),
            watch_live: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Convenience constructor from bare coordinates with a fixed cadence.
    pub fn from_fixes(fixes: impl IntoIterator<Item = LatLng>, cadence: Duration) -> Self {
        let steps = fixes
            .into_iter()
            .map(|p| ReplayStep::Fix {
                lat: p.lat,
                lng: p.lng,
            })
            .collect();
        Self::new(ReplayScript {
            cadence_ms: cadence.as_millis() as u64,
            steps,
        })
    }

    fn allocate_watch_id(&self) -> WatchId {
        WatchId::new(self.next_watch_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[async_trait]
impl LocationSource for ReplaySource {
    async fn current_position(&self) -> SourceResult<PositionFix> {
        self.script
            .steps
            .iter()
            .find_map(|step| match step {
                ReplayStep::Fix { lat, lng } => {
                    Some(PositionFix::now(LatLng::new(*lat, *lng)))
                }
                _ => None,
            })
            .ok_or_else(|| GeolocationError::unavailable("replay script has no fixes"))
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
        let steps = self.script.steps.clone();
        let cadence = self.script.cadence();

        let feeder = tokio::spawn(async move {
            for step in steps {
                tokio::time::sleep(cadence).await;
                match step {
                    ReplayStep::Fix { lat, lng } => {
                        let fix = PositionFix::now(LatLng::new(lat, lng));
                        if raw_tx.send(Ok(fix)).await.is_err() {
                            return;
                        }
                    }
                    ReplayStep::Silence { ms } => {
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                    }
                    ReplayStep::Error { reason } => {
                        if raw_tx
                            .send(Err(GeolocationError::stream(reason)))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                }
            }
            debug!("replay script exhausted");
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
