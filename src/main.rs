//! Application entry point for Buddy.
//!
//! # Startup sequence
//!
//! 1. Load [`AppConfig`] from disk (returns default on first run).
//! 2. Initialise logging from `[logging]` (`RUST_LOG` wins).
//! 3. Create the [`tokio`] runtime.
//! 4. Load the Whisper model, falling back to an engine that reports
//!    recognition as unavailable.
//! 5. Build the audio line (microphone, wake detector, recognizer), the
//!    processing line (classifier, dispatcher) and the TTS engine.
//! 6. Start the LLM health monitor, signal handling and console input.
//! 7. Run the [`Coordinator`] until exit, a signal or a fatal device error.
//!    A fatal error ends the process with a non-zero status.

use std::fs::OpenOptions;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;

use buddy_assistant::{
    audio::{FrameSource, MicrophoneSource},
    config::{AppConfig, AppPaths, LoggingConfig},
    dispatch::{ConversationResponder, DesktopControl, Dispatcher},
    intent::IntentClassifier,
    llm::{BackendHealth, ConversationContext, HealthMonitor, HttpLlmClient, LlmClient, PromptBuilder},
    pipeline::{AudioLine, Coordinator, LogSink, PipelineHandle, Processor, SourceFactory},
    recognition::SpeechRecognizer,
    stt::{MissingModelEngine, SttEngine, TranscribeParams, WhisperEngine},
    tts::{engine_from_config, TtsEngine},
    wake::PhraseWakeDetector,
};

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn init_logging(config: &LoggingConfig) {
    let env = env_logger::Env::default().default_filter_or(config.level.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(path) = &config.file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("buddy: cannot open log file {}: {e}", path.display()),
        }
    }
    builder.init();
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => log::warn!("cannot listen for SIGTERM: {e}"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Feed console lines to the pipeline as typed utterances.
async fn read_console(handle: PipelineHandle) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if !handle.submit_text(line) {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::warn!("console input closed: {e}");
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1-2. Configuration, then logging
    let loaded = AppConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();
    init_logging(&config.logging);
    if let Err(e) = &loaded {
        log::warn!("Failed to load config ({e:#}); using defaults");
    }
    log::info!("Buddy starting up (wake phrase {:?})", config.wake.phrase);

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Speech-to-text, shared by the wake detector and the recognizer
    let model_path = AppPaths::new().model_file(&config.recognition.model);
    let params = TranscribeParams {
        language: config.recognition.language.clone(),
        ..TranscribeParams::default()
    };
    let stt: Arc<dyn SttEngine> = match WhisperEngine::load(&model_path, params) {
        Ok(engine) => {
            log::info!("Whisper model loaded: {}", model_path.display());
            Arc::new(engine)
        }
        Err(e) => {
            log::warn!(
                "Could not load Whisper model ({}): {e}. Recognition will be unavailable.",
                model_path.display()
            );
            Arc::new(MissingModelEngine::new(model_path.clone()))
        }
    };

    // 5a. Audio line
    let frame_samples = config.audio.frame_samples();
    let audio_config = config.audio.clone();
    let max_lag_frames = config.wake.max_lag_frames;
    let factory: SourceFactory = Box::new(move || {
        MicrophoneSource::open(&audio_config, max_lag_frames)
            .map(|mic| Box::new(mic) as Box<dyn FrameSource>)
    });
    let audio = AudioLine::new(
        factory,
        Box::new(PhraseWakeDetector::new(&config.wake, frame_samples, stt.clone())),
        SpeechRecognizer::new(&config.recognition, frame_samples, stt),
    );

    // 5b. Processing line
    let client: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::from_config(&config.llm));
    let health = BackendHealth::new(true);
    let prompts = PromptBuilder::new(config.llm.temperature);
    let classifier = IntentClassifier::new(client.clone(), prompts.clone(), health.clone());
    let responder = ConversationResponder::new(client.clone(), prompts, health.clone());
    let control = Arc::new(DesktopControl::new(config.input.clone()));
    let processor = Processor::new(
        classifier,
        Dispatcher::new(control, responder),
        ConversationContext::new(config.context.max_turns),
    );

    // 5c. Output line
    let tts: Arc<dyn TtsEngine> = Arc::from(engine_from_config(&config.tts));

    // 6. Background tasks
    let background = CancellationToken::new();
    let monitor = HealthMonitor::new(
        client,
        health,
        Duration::from_secs(config.llm.health_check_interval_secs),
    );
    rt.spawn(monitor.run(background.clone()));

    let coordinator = Coordinator::new(config.pipeline.clone(), Arc::new(LogSink));
    let handle = coordinator.handle();
    {
        let handle = handle.clone();
        rt.spawn(async move {
            shutdown_signal().await;
            log::info!("Shutdown requested");
            handle.shutdown();
        });
    }
    if config.pipeline.console_input {
        rt.spawn(read_console(handle));
    }

    // 7. Run until exit / signal / fatal error
    let outcome = rt.block_on(coordinator.run(audio, processor, tts));
    background.cancel();
    // Console reads cannot be cancelled; don't wait on them.
    rt.shutdown_timeout(Duration::from_millis(config.pipeline.shutdown_grace_ms));

    let reason = outcome.context("pipeline stopped on a fatal error")?;
    log::info!("Buddy stopped ({reason:?})");
    Ok(())
}
