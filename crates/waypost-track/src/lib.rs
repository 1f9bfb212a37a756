//! # Waypost Track
//!
//! Geolocation sources and the watch lifecycle for the Waypost proximity
//! notifier.
//!
//! The crate exposes the narrow capability interface the arrival monitor
//! consumes ([`LocationSource`]): one-shot position reads and a cancellable
//! continuous watch with a per-update staleness timeout. Two implementations
//! ship with it:
//!
//! - [`ReplaySource`] plays back a scripted sequence of fixes, gaps, and
//!   errors (headless mode, integration tests).
//! - [`ChannelSource`] is fed by an external producer through a
//!   [`FixInjector`] (the GUI's simulated-position control, unit tests).
//!
//! A watch enforces the single-subscription rule: requesting a second watch
//! while one is live fails with `WatchAlreadyActive`, and clearing a watch is
//! idempotent.

pub mod channel;
pub mod replay;
pub mod source;
pub mod watch;

pub use channel::{ChannelSource, FixInjector};
pub use replay::{ReplayScript, ReplaySource, ReplayStep};
pub use source::{LocationSource, SourceResult, WatchOptions};
pub use watch::{PositionWatch, WatchHandle, WatchUpdate};
