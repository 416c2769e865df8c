use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do when `start_listening` is called while a session is pending.
///
/// The platform variants never guarded concurrent invocation; this makes the
/// behavior an explicit policy instead of canonicalizing one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Cancel the pending session (its caller gets `CANCELLED`) and start
    /// a fresh one for the new caller.
    Supersede,
    /// Reject the new call with `CANCELLED`; the pending session continues.
    Reject,
}

/// What to deliver when the engine errors with nothing buffered.
///
/// One platform variant surfaced a typed error, another resolved with an
/// empty string; both behaviors are reachable through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorFallback {
    /// Surface the engine error to the caller.
    SurfaceError,
    /// Resolve with `""`.
    EmptyText,
}

/// Policy values for a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Inactivity interval after which the session is driven toward
    /// termination. Default: 3500 ms
    pub silence_timeout: Duration,

    /// Bound on how long to wait for a final transcript after requesting a
    /// graceful stop, before falling back to the buffered text.
    /// Default: 1000 ms
    pub stop_grace: Duration,

    /// Recognition locale passed to the engine (e.g. "en-US", "ko-KR")
    pub locale: String,

    /// Whether interim hypotheses are requested from the engine
    pub enable_partials: bool,

    /// Concurrent `start_listening` policy
    pub busy_policy: BusyPolicy,

    /// Empty-buffer engine-error policy
    pub error_fallback: ErrorFallback,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            silence_timeout: Duration::from_millis(3500),
            stop_grace: Duration::from_millis(1000),
            locale: "en-US".to_string(),
            enable_partials: true,
            busy_policy: BusyPolicy::Supersede,
            error_fallback: ErrorFallback::SurfaceError,
        }
    }
}
