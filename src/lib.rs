//! # huedimmer Library
//!
//! Smooth, interruptible brightness transitions for Philips Hue lights.
//!
//! Hue bridges report a transition's target brightness as soon as it starts,
//! and keep reporting a stale value for a while after it is stopped. The
//! library keeps its own record of every transition it starts and predicts the
//! true in-flight brightness from it, so a raise/stop/lower sequence issued in
//! quick succession always starts from where the light really is.
//!
//! ## Architecture
//!
//! - **Core**: `tracker` (per-light transition records), `resolver`
//!   (trust-or-predict decision), `dimmer` (command builder, stop handler and
//!   batch handlers)
//! - **Bridge**: `bridge` capability trait and the `bridge::clip` CLIP v2 client
//! - **Process**: `daemon` (owns the tracker), `ipc` (socket protocol used by
//!   the one-shot commands), `signals`, `args`
//! - **Infrastructure**: `config`, `constants`, `logger`, `time_source`

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod bridge;
pub mod config;
pub mod constants;
pub mod daemon;
pub mod dimmer;
pub mod ipc;
pub mod resolver;
pub mod signals;
pub mod time_source;
pub mod tracker;

pub use daemon::Daemon;
pub use dimmer::Dimmer;
pub use resolver::BrightnessResolver;
pub use tracker::TransitionTracker;
