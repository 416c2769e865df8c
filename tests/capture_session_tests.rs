// End-to-end tests for the capture session coordinator
//
// Each test drives a CaptureController against a scripted recognizer on
// tokio's paused clock, so the timing assertions are deterministic.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use voice_capture::{
    BusyPolicy, CaptureConfig, CaptureController, CaptureError, EngineEvent, ErrorFallback,
    ErrorKind, RecognizerBackend, RecognizerFactory, ScriptStep, ScriptedFactory,
    ScriptedRecognizer, StopBehavior, TranscriptEvent,
};

fn test_config() -> CaptureConfig {
    CaptureConfig {
        silence_timeout: Duration::from_millis(3500),
        stop_grace: Duration::from_millis(1000),
        ..CaptureConfig::default()
    }
}

fn partial(after_ms: u64, text: &str) -> ScriptStep {
    ScriptStep::new(
        Duration::from_millis(after_ms),
        EngineEvent::Transcript(TranscriptEvent::partial(text)),
    )
}

fn finalized(after_ms: u64, text: &str) -> ScriptStep {
    ScriptStep::new(
        Duration::from_millis(after_ms),
        EngineEvent::Transcript(TranscriptEvent::finalized(text)),
    )
}

fn engine_error(after_ms: u64, kind: ErrorKind, message: &str) -> ScriptStep {
    ScriptStep::new(
        Duration::from_millis(after_ms),
        EngineEvent::Error {
            kind,
            message: message.to_string(),
        },
    )
}

fn controller_for(
    config: CaptureConfig,
    script: Vec<ScriptStep>,
    on_stop: StopBehavior,
) -> CaptureController {
    let factory = Arc::new(ScriptedFactory::new(ScriptedRecognizer::new(
        "test-engine",
        script,
        on_stop,
    )));
    CaptureController::new(config, factory)
}

/// Hands out pre-built recognizers in order, one per session.
struct SequenceFactory {
    engines: Mutex<Vec<ScriptedRecognizer>>,
}

impl SequenceFactory {
    fn new(engines: Vec<ScriptedRecognizer>) -> Self {
        Self {
            engines: Mutex::new(engines),
        }
    }
}

impl RecognizerFactory for SequenceFactory {
    fn create(&self) -> anyhow::Result<Box<dyn RecognizerBackend>> {
        let mut engines = self.engines.lock().expect("factory lock");
        anyhow::ensure!(!engines.is_empty(), "scripted engine pool exhausted");
        Ok(Box::new(engines.remove(0)))
    }
}

// Scenario: partials at 0.5s and 1.0s, then silence. The 3.5s timeout fires
// at 4.5s, the engine answers the graceful stop with a final built from the
// last hypothesis, and exactly that text is delivered.
#[tokio::test(start_paused = true)]
async fn test_silence_timeout_delivers_latest_partial() {
    let controller = controller_for(
        test_config(),
        vec![partial(500, "hello"), partial(500, "hello world")],
        StopBehavior::EmitFinal,
    );

    let started = Instant::now();
    let text = controller
        .start_listening()
        .await
        .expect("session should resolve with text");

    assert_eq!(text, "hello world");

    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_millis(4500) && elapsed < Duration::from_millis(4700),
        "last activity at 1.0s + 3.5s timeout should deliver at ~4.5s, got {:?}",
        elapsed
    );
}

// An engine that ignores the graceful stop cannot hang the session: the
// grace deadline falls back to the buffered text.
#[tokio::test(start_paused = true)]
async fn test_unresponsive_engine_falls_back_to_buffer_after_grace() {
    let controller = controller_for(
        test_config(),
        vec![partial(100, "hello")],
        StopBehavior::Silent,
    );

    let started = Instant::now();
    let text = controller
        .start_listening()
        .await
        .expect("grace fallback should still deliver text");

    assert_eq!(text, "hello");

    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_millis(4600) && elapsed < Duration::from_millis(4800),
        "activity at 0.1s + 3.5s timeout + 1s grace should deliver at ~4.6s, got {:?}",
        elapsed
    );
}

// Same fallback when the stop request lands while the engine is still
// mid-script: the stream stays open, nothing further arrives, and the grace
// deadline delivers the buffered text.
#[tokio::test(start_paused = true)]
async fn test_grace_fallback_with_engine_still_streaming() {
    let controller = controller_for(
        test_config(),
        vec![partial(100, "hello"), partial(60_000, "never delivered")],
        StopBehavior::Silent,
    );

    let started = Instant::now();
    let text = controller
        .start_listening()
        .await
        .expect("grace fallback should still deliver text");

    assert_eq!(text, "hello");

    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_millis(4600) && elapsed < Duration::from_millis(4800),
        "activity at 0.1s + 3.5s timeout + 1s grace should deliver at ~4.6s, got {:?}",
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn test_early_engine_error_surfaces_by_default() {
    let controller = controller_for(
        test_config(),
        vec![engine_error(200, ErrorKind::EngineError, "engine unavailable")],
        StopBehavior::Silent,
    );

    let err = controller
        .start_listening()
        .await
        .expect_err("empty buffer + surface_error policy should fail the call");

    assert_eq!(err.kind, ErrorKind::EngineError);
    assert_eq!(err.message, "engine unavailable");
}

#[tokio::test(start_paused = true)]
async fn test_early_engine_error_with_empty_text_policy() {
    let config = CaptureConfig {
        error_fallback: ErrorFallback::EmptyText,
        ..test_config()
    };
    let controller = controller_for(
        config,
        vec![engine_error(200, ErrorKind::EngineError, "engine unavailable")],
        StopBehavior::Silent,
    );

    let text = controller
        .start_listening()
        .await
        .expect("empty_text policy resolves with an empty string");
    assert_eq!(text, "");
}

// An engine error after usable text was buffered degrades to that text
// instead of failing the call.
#[tokio::test(start_paused = true)]
async fn test_engine_error_degrades_to_buffered_text() {
    let controller = controller_for(
        test_config(),
        vec![
            partial(100, "hello"),
            engine_error(200, ErrorKind::RecognitionError, "microphone vanished"),
        ],
        StopBehavior::Silent,
    );

    let text = controller
        .start_listening()
        .await
        .expect("buffered text should win over the engine error");
    assert_eq!(text, "hello");
}

// Scenario: a final transcript is delivered immediately; the silence timer
// never fires and later engine events cause no second delivery.
#[tokio::test(start_paused = true)]
async fn test_final_transcript_delivers_immediately() {
    let controller = controller_for(
        test_config(),
        vec![
            partial(500, "book a"),
            finalized(1500, "book a flight"),
            partial(100, "late hypothesis"),
            engine_error(100, ErrorKind::RecognitionError, "late error"),
        ],
        StopBehavior::Silent,
    );

    let started = Instant::now();
    let text = controller
        .start_listening()
        .await
        .expect("final transcript should resolve the call");

    assert_eq!(text, "book a flight");

    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_millis(2000) && elapsed < Duration::from_millis(2200),
        "final at 2.0s should deliver immediately, got {:?}",
        elapsed
    );
}

// Scenario: cancel before any engine event yields a CANCELLED error.
#[tokio::test(start_paused = true)]
async fn test_cancel_before_any_event() {
    let controller = controller_for(
        test_config(),
        vec![partial(10_000, "never seen")],
        StopBehavior::Silent,
    );

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start_listening().await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;

    controller.cancel();

    let err = pending
        .await
        .expect("task join")
        .expect_err("cancel must fail the pending call");
    assert_eq!(err.kind, ErrorKind::Cancelled);
}

// An explicit stop behaves like the silence timeout: graceful engine stop,
// then the final (or buffered) text.
#[tokio::test(start_paused = true)]
async fn test_explicit_stop_delivers_buffered_text() {
    let controller = controller_for(
        test_config(),
        vec![partial(100, "quick note")],
        StopBehavior::EmitFinal,
    );

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start_listening().await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    controller.stop();

    let text = pending
        .await
        .expect("task join")
        .expect("stop should resolve with the captured text");
    assert_eq!(text, "quick note");
}

#[tokio::test(start_paused = true)]
async fn test_busy_reject_rejects_second_caller() {
    let config = CaptureConfig {
        busy_policy: BusyPolicy::Reject,
        ..test_config()
    };
    let factory = Arc::new(SequenceFactory::new(vec![
        ScriptedRecognizer::new(
            "first",
            vec![finalized(1000, "first wins")],
            StopBehavior::Silent,
        ),
        ScriptedRecognizer::new("second", vec![], StopBehavior::Silent),
    ]));
    let controller = CaptureController::new(config, factory);

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start_listening().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = controller
        .start_listening()
        .await
        .expect_err("second call must be rejected while one is pending");
    assert_eq!(err.kind, ErrorKind::Cancelled);

    let text = first
        .await
        .expect("task join")
        .expect("the first session continues untouched");
    assert_eq!(text, "first wins");
}

#[tokio::test(start_paused = true)]
async fn test_busy_supersede_cancels_first_caller() {
    let factory = Arc::new(SequenceFactory::new(vec![
        ScriptedRecognizer::new(
            "stale",
            vec![
                partial(100, "stale hypothesis"),
                partial(100, "staler hypothesis"),
                finalized(10_000, "stale final"),
            ],
            StopBehavior::Silent,
        ),
        ScriptedRecognizer::new("fresh", vec![finalized(300, "fresh")], StopBehavior::Silent),
    ]));
    let controller = CaptureController::new(test_config(), factory);

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start_listening().await })
    };
    tokio::time::sleep(Duration::from_millis(150)).await;

    // The new call cancels-and-supersedes; anything the old engine still
    // emits belongs to a superseded generation and must not leak into the
    // new session's outcome.
    let text = controller
        .start_listening()
        .await
        .expect("superseding session should resolve normally");
    assert_eq!(text, "fresh");

    let err = first
        .await
        .expect("task join")
        .expect_err("superseded caller gets CANCELLED");
    assert_eq!(err.kind, ErrorKind::Cancelled);
}

// Sessions are one-shot; the controller accepts a fresh call after each
// delivery.
#[tokio::test(start_paused = true)]
async fn test_sequential_sessions() {
    let controller = controller_for(
        test_config(),
        vec![finalized(500, "again")],
        StopBehavior::Silent,
    );

    let first = controller.start_listening().await.expect("first session");
    let second = controller.start_listening().await.expect("second session");

    assert_eq!(first, "again");
    assert_eq!(second, "again");
}

#[tokio::test(start_paused = true)]
async fn test_permission_denied_surfaces_typed_error() {
    let factory = Arc::new(ScriptedFactory::new(ScriptedRecognizer::failing(
        "denied",
        CaptureError::new(ErrorKind::PermissionDenied, "microphone permission denied"),
    )));
    let controller = CaptureController::new(test_config(), factory);

    let err = controller
        .start_listening()
        .await
        .expect_err("permission denial must surface as a typed error");

    assert_eq!(err.kind, ErrorKind::PermissionDenied);
    assert_eq!(err.message, "microphone permission denied");
}

// Blank trailing partials must not wipe out usable buffered text on the
// fallback path.
#[tokio::test(start_paused = true)]
async fn test_blank_partial_does_not_clear_buffer() {
    let controller = controller_for(
        test_config(),
        vec![
            partial(100, "hello world"),
            partial(100, "   "),
            engine_error(100, ErrorKind::RecognitionError, "engine gave up"),
        ],
        StopBehavior::Silent,
    );

    let text = controller
        .start_listening()
        .await
        .expect("buffered text should survive blank partials");
    assert_eq!(text, "hello world");
}
