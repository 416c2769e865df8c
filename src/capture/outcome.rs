use serde::{Deserialize, Serialize};
use std::fmt;

/// Error taxonomy surfaced to the caller.
///
/// Serialized as the wire codes the caller-facing boundary expects
/// (e.g. `PERMISSION_DENIED`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Microphone or speech-recognition permission was denied.
    PermissionDenied,
    /// The recognition engine is unavailable or failed to initialize.
    EngineError,
    /// The audio session could not be configured.
    AudioSessionError,
    /// The audio engine failed to start.
    AudioEngineError,
    /// The engine failed mid-recognition.
    RecognitionError,
    /// The session was cancelled before a transcript was produced.
    Cancelled,
}

impl ErrorKind {
    /// Wire code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::EngineError => "ENGINE_ERROR",
            ErrorKind::AudioSessionError => "AUDIO_SESSION_ERROR",
            ErrorKind::AudioEngineError => "AUDIO_ENGINE_ERROR",
            ErrorKind::RecognitionError => "RECOGNITION_ERROR",
            ErrorKind::Cancelled => "CANCELLED",
        }
    }
}

/// Structured error delivered to the caller (`{ code, message }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CaptureError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for CaptureError {}

/// The single outcome of a capture session.
///
/// Exactly one `Outcome` reaches the caller per session, no matter how many
/// internal paths (final transcript, engine error, silence fallback, cancel)
/// race to produce one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Transcribed text (possibly empty).
    Text(String),
    /// Typed failure.
    Error(CaptureError),
}

impl Outcome {
    pub fn into_result(self) -> Result<String, CaptureError> {
        match self {
            Outcome::Text(text) => Ok(text),
            Outcome::Error(err) => Err(err),
        }
    }
}
