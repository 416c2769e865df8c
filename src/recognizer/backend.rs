use crate::capture::ErrorKind;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Parameters handed to the engine when a session starts.
#[derive(Debug, Clone)]
pub struct RecognizerParams {
    /// Recognition locale (e.g. "en-US", "ko-KR")
    pub locale: String,
    /// Whether interim hypotheses should be reported
    pub enable_partials: bool,
}

impl Default for RecognizerParams {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            enable_partials: true,
        }
    }
}

/// A transcript hypothesis from the engine.
///
/// Partials are full cumulative hypotheses; `is_final = true` carries the
/// authoritative transcript for the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub text: String,
    pub is_final: bool,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEvent {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            timestamp: Utc::now(),
        }
    }

    pub fn finalized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            timestamp: Utc::now(),
        }
    }
}

/// Events emitted by a recognition engine during a session.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The user started speaking.
    SpeechStarted,
    /// Input level changed while audio is flowing; treated as speech
    /// activity by the coordinator.
    AudioLevel(f32),
    /// Interim or final transcript.
    Transcript(TranscriptEvent),
    /// Terminal engine failure.
    Error { kind: ErrorKind, message: String },
}

/// Speech recognition engine boundary
///
/// Wraps a native speech engine behind a uniform session interface:
/// - `start_session` begins streaming; a successful return means the engine
///   accepted the session (the "adapter ready" signal).
/// - `stop_session` requests graceful termination; a final transcript should
///   still be emitted if the engine can produce one.
/// - `cancel_session` abandons the session immediately; no further events
///   are expected (and any that do arrive are discarded upstream by
///   generation comparison).
///
/// Start/stop may perform blocking hardware I/O; the coordinator dispatches
/// them off its event-processing task.
#[async_trait::async_trait]
pub trait RecognizerBackend: Send + Sync {
    /// Start a recognition session.
    ///
    /// Returns a channel receiver that will receive engine events. A typed
    /// startup failure (permission denial, audio session/engine failure)
    /// should be returned as a [`crate::capture::CaptureError`] inside the
    /// `anyhow` error so the caller sees the right wire code.
    async fn start_session(&mut self, params: RecognizerParams)
        -> Result<mpsc::Receiver<EngineEvent>>;

    /// Request graceful termination of the session.
    async fn stop_session(&mut self) -> Result<()>;

    /// Abandon the session immediately.
    async fn cancel_session(&mut self) -> Result<()>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Produces a fresh backend for each capture session.
pub trait RecognizerFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn RecognizerBackend>>;
}
