//! Recognition engine boundary
//!
//! The capture coordinator talks to speech engines through the
//! `RecognizerBackend` trait; a `RecognizerFactory` produces a fresh backend
//! per session. `ScriptedRecognizer` is a deterministic implementation for
//! tests and demos.

mod backend;
mod scripted;

pub use backend::{
    EngineEvent, RecognizerBackend, RecognizerFactory, RecognizerParams, TranscriptEvent,
};
pub use scripted::{ScriptStep, ScriptedFactory, ScriptedRecognizer, StopBehavior};
