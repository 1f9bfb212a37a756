//! # Waypost GUI
//!
//! The egui/walkers presentation layer for the Waypost proximity notifier:
//! an interactive slippy map with marker and circle overlays, the arm
//! control, and the event loop that connects the arrival monitor to the
//! geolocation watch.

pub mod app;
pub mod map_panel;
pub mod overlay;

pub use app::WaypostApp;
