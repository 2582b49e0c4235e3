// Voice assistant entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Parse arguments and load config
// 3. Open database, restore saved preferences and favorites
// 4. Connect to the realtime endpoint
// 5. Set up capture, playback, and the session controller
// 6. Spawn app logic task
// 7. Run the console until the user quits
// 8. Cleanup on exit

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use voicerag_client::app;
use voicerag_client::audio::{self, QueuedPlayer, WavRecorder};
use voicerag_client::config;
use voicerag_client::console;
use voicerag_client::db;
use voicerag_client::realtime;
use voicerag_client::session::SessionController;

#[derive(Debug, Default)]
struct Args {
    config_dir: Option<PathBuf>,
    input_wav: Option<PathBuf>,
    output_wav: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        let mut value = || {
            args.next()
                .map(PathBuf::from)
                .with_context(|| format!("{arg} needs a value"))
        };
        match arg.as_str() {
            "--config-dir" => parsed.config_dir = Some(value()?),
            "--input" => parsed.input_wav = Some(value()?),
            "--output" => parsed.output_wav = Some(value()?),
            other => bail!("unknown argument {other}"),
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Voice assistant starting up");

    // 2. Parse arguments and load config
    let args = parse_args(std::env::args().skip(1))?;
    let base_dir = match args.config_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to resolve working directory")?,
    };
    let mut config = config::load_config(&base_dir).context("failed to load configuration")?;
    if let Some(input) = args.input_wav {
        config.audio.input_wav = Some(input);
    }
    if let Some(output) = args.output_wav {
        config.audio.output_wav = output;
    }
    info!(
        "Config loaded: endpoint={}, {} Hz, {} ms chunks",
        config.realtime.url, config.audio.sample_rate, config.audio.chunk_ms
    );

    // 3. Open database
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 4. Connect to the realtime endpoint
    let (handle, rt_rx) = realtime::connect(&config.realtime.url)
        .await
        .context("failed to connect to realtime endpoint")?;

    // 5. Capture, playback, and session control
    let chunk_samples = config.audio.chunk_samples();
    let recorder = WavRecorder::new(
        config.audio.input_wav.clone(),
        config.audio.sample_rate,
        chunk_samples,
    );
    let player = QueuedPlayer::new();
    let sink = audio::spawn_wav_sink(
        player.clone(),
        &config.audio.output_wav,
        config.audio.sample_rate,
        chunk_samples,
    )
    .context("failed to open audio output")?;

    let (audio_tx, audio_rx) = mpsc::channel(64);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let session = SessionController::new(
        Box::new(handle),
        Box::new(recorder),
        Box::new(player),
        config.session_config(),
        audio_tx,
    );

    let mut app_state = app::AppState::new(session, db);
    match app::recover_from_db(&mut app_state) {
        Ok(true) => info!("Preferences and favorites restored from previous session"),
        Ok(false) => info!("Starting fresh session"),
        Err(e) => {
            error!("Failed to restore saved state: {}", e);
            return Err(e.context("failed to restore saved state"));
        }
    }

    // 6. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(rt_rx, audio_rx, cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 7. Run the console (blocking until the user quits)
    info!("Application ready");
    if let Err(e) = console::run(ui_rx, cmd_tx).await {
        error!("Console error: {}", e);
    }

    // 8. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    match sink.finish().await {
        Ok(samples) => info!("Saved {} samples of assistant audio", samples),
        Err(e) => warn!("Failed to finalize audio output: {}", e),
    }

    info!("Voice assistant shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (the terminal carries the console).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("voicerag.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("voicerag=info,voicerag_client=info,voicerag_core=info,warn")
            }),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
