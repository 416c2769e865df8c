use super::outcome::{CaptureError, ErrorKind};
use tokio::sync::oneshot;

/// Commands sent from the caller-facing handle to the controller task.
#[derive(Debug)]
pub(crate) enum Command {
    /// Start a capture session; the sender receives exactly one outcome.
    Start {
        reply: oneshot::Sender<Result<String, CaptureError>>,
    },
    /// Request a graceful stop (a final transcript may still be delivered).
    Stop,
    /// Abandon the session; the pending caller receives `CANCELLED`.
    Cancel,
}

/// An event funneled into the controller's single processing point.
///
/// Every event is tagged with the generation of the session it was produced
/// for. Events whose generation does not match the active session are
/// discarded before any state is touched, which is what makes late callbacks
/// from a torn-down engine or a superseded timer arming provably harmless.
#[derive(Debug)]
pub struct SessionEvent {
    pub generation: u64,
    pub kind: SessionEventKind,
}

/// Closed set of things that can happen to a session.
///
/// This replaces the platform pattern of one listener object with many
/// overridden callback methods; each variant carries only the data that
/// specific callback provided.
#[derive(Debug)]
pub enum SessionEventKind {
    /// The engine accepted the session and is streaming.
    EngineReady,
    /// The user started speaking.
    SpeechStarted,
    /// Input level changed while audio is flowing (activity signal).
    AudioLevel(f32),
    /// Interim cumulative hypothesis.
    Partial(String),
    /// Authoritative final transcript.
    Final(String),
    /// The engine failed mid-session.
    EngineError { kind: ErrorKind, message: String },
    /// The engine rejected the session before any event stream existed.
    StartFailed { kind: ErrorKind, message: String },
    /// The engine closed its event stream without a final transcript.
    EngineClosed,
    /// The silence timer elapsed for the given arming.
    SilenceElapsed { arming: u64 },
    /// The post-stop grace period elapsed for the given arming.
    GraceElapsed { arming: u64 },
}
