use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use voice_capture::{
    CaptureController, Config, EngineEvent, ScriptStep, ScriptedFactory, ScriptedRecognizer,
    StopBehavior, TranscriptEvent,
};

#[derive(Parser)]
#[command(name = "voice-capture")]
#[command(about = "Run a scripted speech capture session")]
struct Args {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/voice-capture")]
    config: String,

    /// Override the silence timeout in milliseconds
    #[arg(long)]
    silence_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let mut capture_cfg = cfg.capture.to_capture_config();
    if let Some(ms) = args.silence_timeout_ms {
        capture_cfg.silence_timeout = Duration::from_millis(ms);
    }

    info!("{} v0.1.0", cfg.service.name);
    info!(
        "silence timeout {:?}, stop grace {:?}, locale {}",
        capture_cfg.silence_timeout, capture_cfg.stop_grace, capture_cfg.locale
    );

    // Demo engine: a few partials, then silence. The coordinator's silence
    // timeout drives the graceful stop and the scripted engine answers the
    // stop with a final transcript.
    let script = vec![
        ScriptStep::new(
            Duration::from_millis(500),
            EngineEvent::Transcript(TranscriptEvent::partial("book")),
        ),
        ScriptStep::new(
            Duration::from_millis(400),
            EngineEvent::Transcript(TranscriptEvent::partial("book a flight")),
        ),
        ScriptStep::new(
            Duration::from_millis(400),
            EngineEvent::Transcript(TranscriptEvent::partial("book a flight to Seoul")),
        ),
    ];
    let factory = Arc::new(ScriptedFactory::new(ScriptedRecognizer::new(
        "demo",
        script,
        StopBehavior::EmitFinal,
    )));

    let controller = CaptureController::new(capture_cfg, factory);

    match controller.start_listening().await {
        Ok(text) => info!("transcript: {:?}", text),
        Err(err) => error!("capture failed: {}", serde_json::to_string(&err)?),
    }

    Ok(())
}
