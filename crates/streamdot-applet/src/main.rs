mod app;
mod editor;
mod mpv;
mod panel;

use tokio::sync::mpsc;
use tracing::info;

use streamdot_core::config::Config;
use streamdot_core::controller::PlaybackController;

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> anyhow::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
        println!();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = streamdot_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("streamdot.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,streamdot=debug")),
        )
        .with_ansi(false)
        .init();

    eprintln!("streamdot log: {}", log_path.display());
    info!("streamdot starting");

    let config = Config::load()?;
    info!("config loaded from {:?}", Config::config_path());

    // All inputs funnel into one channel consumed by the App task.
    let (funnel_tx, funnel_rx) = mpsc::channel::<app::AppEvent>(256);
    let (engine_tx, engine_rx) = mpsc::channel(64);

    let _raw_mode = RawModeGuard::new()?;

    let engine = mpv::MpvEngine::new(config.engine.binary.clone());
    let panel = panel::StatusPanel::new();
    let controller = PlaybackController::new(engine, panel, config.stream.url.clone(), engine_tx);
    let editor = editor::UrlEditor::new(&config.editor);

    let _key_handle = app::spawn_key_reader(funnel_tx.clone());
    let _bridge_handle = app::spawn_engine_bridge(engine_rx, funnel_tx.clone());

    let application = app::App::new(controller, editor, funnel_tx);
    application.run(funnel_rx).await?;

    info!("streamdot exiting");
    Ok(())
}
