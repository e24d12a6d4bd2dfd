mod cli;
mod logging;
mod pipe;
mod screen;

use clap::Parser;
use crate::cli::Args;
use lyricline_core::{
    Config, CoreError, DisplayMode, LyricsProvider, SessionController, SessionOptions, UpdateBus,
};
use lyricline_lyrics_lrclib::LrclibProvider;
use lyricline_player_mpris::MprisSource;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[allow(clippy::too_many_lines)]
fn main() {
    let args = Args::parse();

    // Initialize logging from a partial config read, before the full load
    let probe = logging::probe_config(args.config.as_deref());
    let mode_hint = args.mode.or(probe.mode).unwrap_or_default();
    logging::init_tracing(probe.file_logging_enabled, mode_hint);

    // Load config or create template on first run
    let config = match Config::load_or_create(args.config.as_deref()) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            eprintln!(
                "Created a config template at {}. Adjust it if needed and run again.",
                path.display()
            );
            std::process::exit(0);
        }
        Err(CoreError::ConfigParseError(parse_error)) => {
            eprintln!("Config file has TOML syntax errors:\n{parse_error}");
            std::process::exit(1);
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };
    let config = args.apply(config);

    // Create tokio runtime for background tasks
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let provider: Arc<dyn LyricsProvider> =
        match LrclibProvider::with_api_url(&config.lyrics.api_url) {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                error!("Failed to create lyrics provider: {e}");
                std::process::exit(1);
            }
        };

    let bus = UpdateBus::new();
    let updates = bus.subscribe();

    let (events_tx, events_rx) = mpsc::channel(64);

    let source = Arc::new(MprisSource::new(
        events_tx,
        config.player.poll_interval_ms,
        config.player.seek_threshold_ms,
        Some(cancel_token.clone()),
    ));

    let controller = SessionController::new(
        provider,
        bus,
        SessionOptions {
            match_duration: config.lyrics.match_duration,
            ..SessionOptions::default()
        },
        events_rx,
        cancel_token.clone(),
    );

    // Spawn background tasks
    let (source_task, controller_task) = runtime.block_on(async {
        let source_task = source.start();
        let controller_task = tokio::spawn(controller.run());
        (source_task, controller_task)
    });

    // Run the chosen renderer on the main thread until quit or Ctrl+C
    let render_result = runtime.block_on(async {
        match config.ui.mode {
            DisplayMode::Screen => {
                screen::run(updates, config.ui.context_lines, cancel_token.clone()).await
            }
            DisplayMode::Line => pipe::run_lines(updates, cancel_token.clone()).await,
            DisplayMode::Json => pipe::run_json(updates, cancel_token.clone()).await,
        }
    });

    // Renderer exit also stops the source and the session
    cancel_token.cancel();
    runtime.block_on(async {
        let _ = source_task.await;
        let _ = controller_task.await;
    });

    if let Err(e) = render_result {
        error!("Renderer failed: {e}");
        std::process::exit(1);
    }

    info!("Shutdown complete");
}
