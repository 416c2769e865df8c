use super::backend::{
    EngineEvent, RecognizerBackend, RecognizerFactory, RecognizerParams, TranscriptEvent,
};
use crate::capture::CaptureError;
use anyhow::Result;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// One step of a scripted engine run: wait `after`, then emit `event`.
#[derive(Debug, Clone)]
pub struct ScriptStep {
    pub after: Duration,
    pub event: EngineEvent,
}

impl ScriptStep {
    pub fn new(after: Duration, event: EngineEvent) -> Self {
        Self { after, event }
    }
}

/// How a scripted engine reacts to a graceful stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBehavior {
    /// Emit a final transcript built from the last hypothesis replayed so
    /// far (a cooperative engine).
    EmitFinal,
    /// Emit nothing; the caller's grace deadline has to step in (an
    /// unresponsive engine).
    Silent,
}

/// Deterministic recognizer that replays a timed event script.
///
/// Stands in for a native engine in tests and demos, the same way a
/// file-based source stands in for live audio capture.
pub struct ScriptedRecognizer {
    name: String,
    steps: Vec<ScriptStep>,
    on_stop: StopBehavior,
    fail_start: Option<CaptureError>,
    stop_tx: Option<watch::Sender<bool>>,
}

impl ScriptedRecognizer {
    pub fn new(name: impl Into<String>, steps: Vec<ScriptStep>, on_stop: StopBehavior) -> Self {
        Self {
            name: name.into(),
            steps,
            on_stop,
            fail_start: None,
            stop_tx: None,
        }
    }

    /// A recognizer whose `start_session` fails with the given typed error
    /// (permission denial, audio session failure, ...).
    pub fn failing(name: impl Into<String>, error: CaptureError) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            on_stop: StopBehavior::Silent,
            fail_start: Some(error),
            stop_tx: None,
        }
    }
}

impl Clone for ScriptedRecognizer {
    /// Clones the script, not the per-session stop channel.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            steps: self.steps.clone(),
            on_stop: self.on_stop,
            fail_start: self.fail_start.clone(),
            stop_tx: None,
        }
    }
}

#[async_trait::async_trait]
impl RecognizerBackend for ScriptedRecognizer {
    async fn start_session(
        &mut self,
        params: RecognizerParams,
    ) -> Result<mpsc::Receiver<EngineEvent>> {
        if let Some(error) = &self.fail_start {
            return Err(anyhow::Error::new(error.clone()));
        }

        debug!(
            name = %self.name,
            locale = %params.locale,
            partials = params.enable_partials,
            steps = self.steps.len(),
            "scripted session started"
        );

        let (events_tx, events_rx) = mpsc::channel(32);
        let (stop_tx, mut stop_rx) = watch::channel(false);
        self.stop_tx = Some(stop_tx);

        let steps = self.steps.clone();
        let on_stop = self.on_stop;

        tokio::spawn(async move {
            let mut last_text = String::new();

            for step in steps {
                tokio::select! {
                    _ = tokio::time::sleep(step.after) => {}
                    changed = stop_rx.changed() => {
                        // Ok: graceful stop requested. Err: cancelled.
                        if changed.is_ok() {
                            match on_stop {
                                StopBehavior::EmitFinal => {
                                    let _ = events_tx
                                        .send(EngineEvent::Transcript(
                                            TranscriptEvent::finalized(last_text),
                                        ))
                                        .await;
                                }
                                StopBehavior::Silent => {
                                    // Ignore the stop and hold the stream
                                    // open; only cancel ends the session.
                                    while stop_rx.changed().await.is_ok() {}
                                }
                            }
                        }
                        return;
                    }
                }

                if let EngineEvent::Transcript(t) = &step.event {
                    last_text = t.text.clone();
                }

                if events_tx.send(step.event).await.is_err() {
                    return;
                }
            }

            // Script exhausted: stay open until stopped or cancelled. A
            // Silent engine ignores stop requests and keeps the stream open
            // until cancel drops the stop channel.
            while stop_rx.changed().await.is_ok() {
                if on_stop == StopBehavior::EmitFinal {
                    let _ = events_tx
                        .send(EngineEvent::Transcript(TranscriptEvent::finalized(last_text)))
                        .await;
                    return;
                }
            }
        });

        Ok(events_rx)
    }

    async fn stop_session(&mut self) -> Result<()> {
        debug!(name = %self.name, "scripted session stop requested");
        if let Some(stop) = &self.stop_tx {
            let _ = stop.send(true);
        }
        Ok(())
    }

    async fn cancel_session(&mut self) -> Result<()> {
        debug!(name = %self.name, "scripted session cancelled");
        // Dropping the sender ends the replay task without a final event.
        self.stop_tx = None;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Factory that hands out a fresh clone of a prototype scripted recognizer
/// for each session.
pub struct ScriptedFactory {
    prototype: ScriptedRecognizer,
}

impl ScriptedFactory {
    pub fn new(prototype: ScriptedRecognizer) -> Self {
        Self { prototype }
    }
}

impl RecognizerFactory for ScriptedFactory {
    fn create(&self) -> Result<Box<dyn RecognizerBackend>> {
        Ok(Box::new(self.prototype.clone()))
    }
}
