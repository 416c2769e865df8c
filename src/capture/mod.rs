//! Speech capture session coordination
//!
//! This module provides the capture coordinator that turns the racing
//! completion signals of a speech-recognition session into one outcome:
//! - `TranscriptBuffer`: latest usable partial transcript
//! - `SilenceTimer`: debounced inactivity timer + post-stop grace guard
//! - `ResultSink`: at-most-once outcome delivery to the waiting caller
//! - `SessionController`/`CaptureController`: the state machine and its
//!   caller-facing handle
//! - Policy values (`CaptureConfig`) for timeouts, locale and the
//!   behaviors the platform variants disagreed on

mod buffer;
mod config;
mod controller;
mod events;
mod outcome;
mod sink;
mod timer;

pub use buffer::TranscriptBuffer;
pub use config::{BusyPolicy, CaptureConfig, ErrorFallback};
pub use controller::CaptureController;
pub use events::{SessionEvent, SessionEventKind};
pub use outcome::{CaptureError, ErrorKind, Outcome};
pub use sink::ResultSink;
pub use timer::SilenceTimer;
