pub mod capture;
pub mod config;
pub mod recognizer;

pub use capture::{
    BusyPolicy, CaptureConfig, CaptureController, CaptureError, ErrorFallback, ErrorKind, Outcome,
    ResultSink, SessionEvent, SessionEventKind, SilenceTimer, TranscriptBuffer,
};
pub use config::Config;
pub use recognizer::{
    EngineEvent, RecognizerBackend, RecognizerFactory, RecognizerParams, ScriptStep,
    ScriptedFactory, ScriptedRecognizer, StopBehavior, TranscriptEvent,
};
