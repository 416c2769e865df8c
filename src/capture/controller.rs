use super::buffer::TranscriptBuffer;
use super::config::{BusyPolicy, CaptureConfig, ErrorFallback};
use super::events::{Command, SessionEvent, SessionEventKind};
use super::outcome::{CaptureError, ErrorKind, Outcome};
use super::sink::ResultSink;
use super::timer::SilenceTimer;
use crate::recognizer::{EngineEvent, RecognizerBackend, RecognizerFactory, RecognizerParams};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Caller-facing handle to the capture coordinator.
///
/// Cloneable; all handles feed the same controller task. `start_listening`
/// resolves with either the transcript (possibly empty) or a structured
/// error, exactly once per invocation.
#[derive(Clone)]
pub struct CaptureController {
    commands: mpsc::UnboundedSender<Command>,
}

impl CaptureController {
    /// Spawn the controller task and return a handle to it.
    pub fn new(config: CaptureConfig, factory: Arc<dyn RecognizerFactory>) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let controller = SessionController {
            config,
            factory,
            commands: commands_rx,
            events_tx,
            events_rx,
            generation: 0,
            session: None,
        };

        tokio::spawn(controller.run());

        Self {
            commands: commands_tx,
        }
    }

    /// Start a capture session and wait for its single outcome.
    pub async fn start_listening(&self) -> Result<String, CaptureError> {
        let (reply, outcome) = oneshot::channel();

        if self.commands.send(Command::Start { reply }).is_err() {
            return Err(CaptureError::new(
                ErrorKind::EngineError,
                "capture controller is shut down",
            ));
        }

        outcome.await.unwrap_or_else(|_| {
            Err(CaptureError::cancelled(
                "capture controller dropped the session",
            ))
        })
    }

    /// Request a graceful stop of the active session.
    ///
    /// Drives the session toward delivery the same way a silence timeout
    /// does: the engine is asked to stop cleanly so a true final transcript
    /// can still arrive, with the grace period bounding the wait.
    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }

    /// Abandon the active session; the pending caller receives `CANCELLED`.
    pub fn cancel(&self) {
        let _ = self.commands.send(Command::Cancel);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// Engine start requested, not yet streaming.
    Starting,
    /// Engine streaming; activity rearms the silence timer.
    Listening,
    /// Graceful stop requested; waiting for a final transcript or the grace
    /// deadline, whichever comes first.
    Stopping,
}

/// The single shared mutable resource: one active session, owned exclusively
/// by the controller task and mutated only at its event-processing point.
struct Session {
    id: Uuid,
    generation: u64,
    state: SessionState,
    started_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    buffer: TranscriptBuffer,
    sink: ResultSink,
    timer: SilenceTimer,
    backend: Arc<Mutex<Box<dyn RecognizerBackend>>>,
    pump: Option<JoinHandle<()>>,
}

/// State machine that reconciles the racing completion signals of a capture
/// session (final transcript, engine error, silence timeout, cancel) into a
/// single delivered outcome.
///
/// Three independent sources of activity exist: the engine callback stream,
/// timer firings, and caller commands. All of them funnel into this one task
/// through channels, so session and timer state are never mutated
/// concurrently. Engine start/stop calls may block on hardware I/O and are
/// dispatched to spawned tasks; their results come back as events.
struct SessionController {
    config: CaptureConfig,
    factory: Arc<dyn RecognizerFactory>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    generation: u64,
    session: Option<Session>,
}

impl SessionController {
    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd),
                    None => {
                        // All handles dropped; abandon any pending session.
                        self.finish(Outcome::Error(CaptureError::cancelled(
                            "capture controller shut down",
                        )));
                        break;
                    }
                },
                Some(event) = self.events_rx.recv() => self.on_event(event),
            }
        }

        debug!("capture controller task exiting");
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Start { reply } => self.on_start(reply),
            Command::Stop => self.request_stop("caller requested stop"),
            Command::Cancel => {
                if self.session.is_some() {
                    self.finish(Outcome::Error(CaptureError::cancelled(
                        "cancelled by caller",
                    )));
                } else {
                    debug!("cancel with no active session");
                }
            }
        }
    }

    fn on_start(&mut self, reply: oneshot::Sender<Result<String, CaptureError>>) {
        if self.session.is_some() {
            match self.config.busy_policy {
                BusyPolicy::Reject => {
                    warn!("start_listening rejected: a capture session is already active");
                    ResultSink::new(reply).deliver(Outcome::Error(CaptureError::cancelled(
                        "a capture session is already active",
                    )));
                    return;
                }
                BusyPolicy::Supersede => {
                    warn!("superseding the pending capture session");
                    self.finish(Outcome::Error(CaptureError::cancelled(
                        "superseded by a new capture session",
                    )));
                }
            }
        }

        let backend = match self.factory.create() {
            Ok(backend) => Arc::new(Mutex::new(backend)),
            Err(err) => {
                let (kind, message) = classify_backend_error(err);
                error!(%message, "recognizer backend creation failed");
                ResultSink::new(reply).deliver(Outcome::Error(CaptureError::new(kind, message)));
                return;
            }
        };

        self.generation += 1;
        let generation = self.generation;

        let mut timer = SilenceTimer::new(
            self.config.silence_timeout,
            generation,
            self.events_tx.clone(),
        );
        timer.arm();

        let mut session = Session {
            id: Uuid::new_v4(),
            generation,
            state: SessionState::Starting,
            started_at: Utc::now(),
            last_activity_at: Utc::now(),
            buffer: TranscriptBuffer::new(),
            sink: ResultSink::new(reply),
            timer,
            backend: Arc::clone(&backend),
            pump: None,
        };

        info!(
            session = %session.id,
            generation,
            locale = %self.config.locale,
            "starting capture session"
        );

        let params = RecognizerParams {
            locale: self.config.locale.clone(),
            enable_partials: self.config.enable_partials,
        };
        let events = self.events_tx.clone();

        // Engine start may block on hardware I/O; never run it on this task.
        let pump = tokio::spawn(async move {
            let started = { backend.lock().await.start_session(params).await };

            match started {
                Ok(mut engine_events) => {
                    let _ = events.send(SessionEvent {
                        generation,
                        kind: SessionEventKind::EngineReady,
                    });

                    while let Some(event) = engine_events.recv().await {
                        let kind = match event {
                            EngineEvent::SpeechStarted => SessionEventKind::SpeechStarted,
                            EngineEvent::AudioLevel(level) => SessionEventKind::AudioLevel(level),
                            EngineEvent::Transcript(t) if t.is_final => {
                                SessionEventKind::Final(t.text)
                            }
                            EngineEvent::Transcript(t) => SessionEventKind::Partial(t.text),
                            EngineEvent::Error { kind, message } => {
                                SessionEventKind::EngineError { kind, message }
                            }
                        };

                        if events.send(SessionEvent { generation, kind }).is_err() {
                            return;
                        }
                    }

                    let _ = events.send(SessionEvent {
                        generation,
                        kind: SessionEventKind::EngineClosed,
                    });
                }
                Err(err) => {
                    let (kind, message) = classify_backend_error(err);
                    let _ = events.send(SessionEvent {
                        generation,
                        kind: SessionEventKind::StartFailed { kind, message },
                    });
                }
            }
        });

        session.pump = Some(pump);
        self.session = Some(session);
    }

    fn on_event(&mut self, event: SessionEvent) {
        let Some(session) = self.session.as_mut() else {
            debug!(generation = event.generation, "event after teardown discarded");
            return;
        };
        if session.generation != event.generation {
            debug!(
                event_generation = event.generation,
                active_generation = session.generation,
                "stale event discarded"
            );
            return;
        }

        match event.kind {
            SessionEventKind::EngineReady => {
                if session.state == SessionState::Starting {
                    session.state = SessionState::Listening;
                    info!(session = %session.id, "engine ready, listening");
                }
            }

            SessionEventKind::SpeechStarted | SessionEventKind::AudioLevel(_) => {
                session.last_activity_at = Utc::now();
                if session.state != SessionState::Stopping {
                    session.timer.reset();
                }
            }

            SessionEventKind::Partial(text) => {
                debug!(session = %session.id, partial = %text, "partial transcript");
                session.buffer.update(&text);
                session.last_activity_at = Utc::now();
                if session.state != SessionState::Stopping {
                    session.timer.reset();
                }
            }

            SessionEventKind::Final(text) => {
                info!(session = %session.id, "final transcript received");
                self.finish(Outcome::Text(text));
            }

            SessionEventKind::EngineError { kind, message } => {
                self.on_engine_error(kind, message);
            }

            SessionEventKind::StartFailed { kind, message } => {
                error!(session = %session.id, %message, "engine start failed");
                self.finish(Outcome::Error(CaptureError::new(kind, message)));
            }

            SessionEventKind::EngineClosed => {
                // Stream ended without a final transcript or error.
                warn!(session = %session.id, "engine closed without a final transcript");
                self.on_engine_error(
                    ErrorKind::RecognitionError,
                    "engine closed without a result".to_string(),
                );
            }

            SessionEventKind::SilenceElapsed { arming } => {
                if !session.timer.is_current(arming) {
                    debug!(session = %session.id, arming, "stale silence fire discarded");
                    return;
                }
                info!(session = %session.id, "silence timeout");
                self.request_stop("silence timeout");
            }

            SessionEventKind::GraceElapsed { arming } => {
                if !session.timer.is_current(arming) {
                    debug!(session = %session.id, arming, "stale grace fire discarded");
                    return;
                }
                if session.state == SessionState::Stopping {
                    info!(
                        session = %session.id,
                        "no final transcript within grace period, delivering buffered text"
                    );
                    let text = session.buffer.snapshot();
                    self.finish(Outcome::Text(text));
                }
            }
        }
    }

    /// Engine error: degrade gracefully to the buffered text when possible.
    fn on_engine_error(&mut self, kind: ErrorKind, message: String) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        warn!(session = %session.id, state = ?session.state, %message, "engine error");

        match session.state {
            SessionState::Starting => {
                self.finish(Outcome::Error(CaptureError::new(kind, message)));
            }
            SessionState::Listening => {
                if !session.buffer.is_empty() {
                    let text = session.buffer.snapshot();
                    self.finish(Outcome::Text(text));
                } else {
                    match self.config.error_fallback {
                        ErrorFallback::SurfaceError => {
                            self.finish(Outcome::Error(CaptureError::new(kind, message)));
                        }
                        ErrorFallback::EmptyText => {
                            self.finish(Outcome::Text(String::new()));
                        }
                    }
                }
            }
            SessionState::Stopping => {
                // A stop was already requested; the buffered text is the
                // best result this session will produce.
                let text = session.buffer.snapshot();
                self.finish(Outcome::Text(text));
            }
        }
    }

    /// Ask the engine for a graceful stop and bound the wait with the grace
    /// period. Delivery happens later, on the final transcript or the grace
    /// fire, whichever arrives first.
    fn request_stop(&mut self, reason: &str) {
        let Some(session) = self.session.as_mut() else {
            debug!("stop with no active session");
            return;
        };
        if session.state == SessionState::Stopping {
            return;
        }

        info!(session = %session.id, reason, "requesting graceful engine stop");
        session.state = SessionState::Stopping;
        session.timer.arm_grace(self.config.stop_grace);

        let backend = Arc::clone(&session.backend);
        let session_id = session.id;
        tokio::spawn(async move {
            if let Err(err) = backend.lock().await.stop_session().await {
                // The grace deadline bounds the wait either way.
                warn!(session = %session_id, error = %format!("{err:#}"), "engine stop failed");
            }
        });
    }

    /// Deliver the outcome and tear the session down.
    ///
    /// The session slot is cleared synchronously, before any async engine
    /// cleanup, so events still in flight are stale by the time they are
    /// processed.
    fn finish(&mut self, outcome: Outcome) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.timer.cancel();
        if let Some(pump) = session.pump.take() {
            pump.abort();
        }

        let delivered = session.sink.deliver(outcome);
        let now = Utc::now();
        let elapsed_ms = (now - session.started_at).num_milliseconds();
        let idle_ms = (now - session.last_activity_at).num_milliseconds();
        info!(
            session = %session.id,
            generation = session.generation,
            delivered,
            elapsed_ms,
            idle_ms,
            "capture session finished"
        );

        let backend = session.backend;
        let session_id = session.id;
        tokio::spawn(async move {
            if let Err(err) = backend.lock().await.cancel_session().await {
                debug!(session = %session_id, error = %format!("{err:#}"), "engine cancel failed");
            }
        });
    }
}

/// Map a backend error to the caller-facing taxonomy, preserving a typed
/// `CaptureError` when the backend produced one.
fn classify_backend_error(err: anyhow::Error) -> (ErrorKind, String) {
    match err.downcast::<CaptureError>() {
        Ok(capture) => (capture.kind, capture.message),
        Err(other) => (ErrorKind::EngineError, format!("{other:#}")),
    }
}
