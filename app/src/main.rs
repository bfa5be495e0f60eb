#![cfg_attr(
    all(target_os = "windows", feature = "gui"),
    windows_subsystem = "windows"
)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

mod actors;
mod bus;
mod library;
mod pool;
mod spin;
mod state;

use actors::Actor;
use actors::system::{SystemActor, WheelService};
use bus::{BUS_CAPACITY, BusSender};
use gamewheel::{AlertLevel, GamewheelEvent, GamewheelMessage};
use library::{CandidateSource, JsonFileSource, Library};
use state::SystemState;

#[derive(Parser, Debug, Clone)]
#[command(name = "gamewheel", about = "Synchronized game wheel for stream overlays")]
struct Config {
    /// Config file path (default: ~/.config/gamewheel/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run without the native admin window (REST API and web viewer only)
    #[arg(long)]
    headless: bool,

    /// Library JSON file, overrides `[library] path` in the config
    #[arg(long)]
    library: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("gamewheel=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!("debug logging enabled");

    let cli = Config::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(state::config::default_config_path);

    // Create tokio runtime manually -- eframe::run_native() needs the main thread
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let (bus_tx, _) = broadcast::channel::<GamewheelMessage>(BUS_CAPACITY);

    let (system_state, wheel_writer) = SystemState::new(config_path);
    let state = Arc::new(system_state);

    let library_path = cli.library.clone().or_else(|| {
        state
            .system
            .snapshot()
            .library
            .path
            .map(PathBuf::from)
    });
    let source: Box<dyn CandidateSource> = match library_path {
        Some(path) => {
            let source = JsonFileSource::new(path);
            tracing::info!("candidate library: {}", source.path().display());
            Box::new(source)
        }
        None => {
            tracing::warn!("no library configured (--library or [library] path); the wheel starts empty");
            Box::new(Library::default())
        }
    };

    // System actor owns the wheel writer. Must be up before the web server
    // so no command is missed.
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let sender = BusSender::new("system".into(), bus_tx.clone(), Arc::clone(&shutdown));
        let receiver = sender.subscribe();
        let (actor, ready_rx) = SystemActor::new(WheelService::new(wheel_writer, source));
        actor.start(Arc::clone(&state), sender, receiver);
        ready_rx
            .recv()
            .map_err(|_| anyhow::anyhow!("system actor failed to start"))?;
        state.register_actor("system".into(), Box::new(actor), shutdown);
    }

    let snap = state.system.snapshot();
    for ra in actors::resolve_actors(&snap) {
        tracing::info!("starting actor '{}' ({})", ra.id, ra.name);
        actors::start_actor(ra.id, ra.actor, &state, &bus_tx);
    }

    // Drain bus: surfaces alerts in the log and keeps the channel healthy
    let mut drain_rx = bus_tx.subscribe();
    let drain_handle = tokio::spawn(async move {
        loop {
            match drain_rx.recv().await {
                Ok(msg) => match msg.event {
                    GamewheelEvent::Alert(alert) => match alert.level {
                        AlertLevel::Warn => tracing::warn!("[{}] {}", msg.source, alert.message),
                        AlertLevel::Error => tracing::error!("[{}] {}", msg.source, alert.message),
                    },
                    GamewheelEvent::ActorStatus(s) => {
                        tracing::debug!("[{}] {:?} {:?}", msg.source, s.status, s.telemetry);
                    }
                    _ => {}
                },
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("drain subscriber lagged, dropped {n} events");
                }
            }
        }
    });

    if cli.headless {
        tracing::info!("running headless (no admin window)");
        rt.block_on(async { tokio::signal::ctrl_c().await })?;
    } else {
        #[cfg(feature = "gui")]
        {
            let web_addr: std::net::SocketAddr = snap
                .webserver
                .values()
                .next()
                .and_then(|w| w.bind.parse().ok())
                .ok_or_else(|| anyhow::anyhow!("no valid webserver bind address in config"))?;
            let gui_url = if web_addr.ip().is_unspecified() {
                format!("http://127.0.0.1:{}", web_addr.port())
            } else {
                format!("http://{web_addr}")
            };
            gamewheel_ui::net::set_base_url(gui_url);

            let native_options = eframe::NativeOptions {
                viewport: egui::ViewportBuilder::default()
                    .with_inner_size([900.0, 760.0])
                    .with_title("Game Wheel"),
                ..Default::default()
            };

            tracing::info!("launching admin window");
            eframe::run_native(
                "Game Wheel",
                native_options,
                Box::new(|cc| {
                    Ok(Box::new(gamewheel_ui::app::WheelApp::new(
                        cc,
                        gamewheel::ViewerRole::Admin,
                    )))
                }),
            )
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        }
        #[cfg(not(feature = "gui"))]
        {
            tracing::info!("running headless (built without gui feature)");
            rt.block_on(async { tokio::signal::ctrl_c().await })?;
        }
    }

    tracing::info!("shutting down...");
    for id in state.actor_ids() {
        state.stop_actor(&id);
    }
    drop(bus_tx);
    drain_handle.abort();

    Ok(())
}
