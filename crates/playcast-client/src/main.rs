//! playcast client
//!
//! - Connects the coordinator control channel (fatal on failure)
//! - Sends `join`, then follows stdin commands
//! - Runs the whole state machine on a current-thread runtime

use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use playcast_client::app_state::AppState;
use playcast_client::config;
use playcast_client::input::LocalInput;
use playcast_client::session::UiCommand;
use playcast_core::protocol::input::{MouseButton, SurfaceRect};

#[derive(Debug, Parser)]
#[command(name = "playcast-client", about = "Remote play session client")]
struct Args {
    /// Path to the YAML config file.
    #[arg(long, default_value = "playcast.yaml")]
    config: String,
}

// Surface used for `click` coordinates typed on the console.
const CONSOLE_SURFACE: SurfaceRect = SurfaceRect {
    left: 0.0,
    top: 0.0,
    width: 1280.0,
    height: 720.0,
};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer())
        .init();

    let args = Args::parse();

    let cfg = match config::load_from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "runtime build failed");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(AppState::new(cfg))) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), error = %e, "client stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(state: AppState) -> playcast_core::Result<()> {
    tracing::info!(endpoint = %state.cfg().coordinator.ws_endpoint, "playcast-client starting");

    let (orchestrator, control_rx) = state.connect().await?;
    let mut state_rx = orchestrator.watch_state();

    let (ui_tx, ui_rx) = mpsc::channel(64);
    tokio::spawn(console(state.clone(), ui_tx));

    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let s = *state_rx.borrow_and_update();
            println!("[state] {s}");
        }
    });

    orchestrator.run(control_rx, ui_rx).await
}

async fn console(state: AppState, ui_tx: mpsc::Sender<UiCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else { continue };

        let ui = match cmd {
            "apps" => {
                list_apps(&state).await;
                continue;
            }
            "providers" => {
                list_providers(&state).await;
                Some(UiCommand::BrowseProviders)
            }
            "provider" => parts.next().map(|id| UiCommand::SelectProvider(id.to_string())),
            "play" => parts.next().map(|id| UiCommand::SelectApp(id.to_string())),
            "key" => {
                if let Some(code) = parts.next().and_then(|c| c.parse().ok()) {
                    state.input_bus().publish(LocalInput::Key { down: true, key_code: code });
                    state.input_bus().publish(LocalInput::Key { down: false, key_code: code });
                }
                continue;
            }
            "click" => {
                let x = parts.next().and_then(|v| v.parse().ok());
                let y = parts.next().and_then(|v| v.parse().ok());
                if let (Some(x), Some(y)) = (x, y) {
                    click(&state, x, y);
                }
                continue;
            }
            "exit" => Some(UiCommand::Exit),
            "quit" => Some(UiCommand::Shutdown),
            other => {
                println!("unknown command: {other}");
                continue;
            }
        };

        match ui {
            Some(ui) => {
                let stop = ui == UiCommand::Shutdown;
                if ui_tx.send(ui).await.is_err() || stop {
                    break;
                }
            }
            None => println!("missing argument for {cmd}"),
        }
    }
}

fn click(state: &AppState, x: f64, y: f64) {
    use playcast_client::input::PointerKind;

    for kind in [PointerKind::Down, PointerKind::Up] {
        state.input_bus().publish(LocalInput::Pointer {
            kind,
            button: MouseButton::Primary,
            client_x: x,
            client_y: y,
            surface: CONSOLE_SURFACE,
        });
    }
}

async fn list_apps(state: &AppState) {
    let Some(discovery) = state.discovery() else {
        println!("discovery disabled (no coordinator.api_endpoint)");
        return;
    };
    for app in discovery.list_apps(state.settings().device).await {
        println!("{}\t{}", app.id, app.name.unwrap_or_default());
    }
}

async fn list_providers(state: &AppState) {
    let Some(discovery) = state.discovery() else {
        println!("discovery disabled (no coordinator.api_endpoint)");
        return;
    };
    let owner = state.settings().owner_id.as_deref();
    for p in discovery.list_providers(owner).await {
        println!(
            "{}\t{} ({}, {}, {}GB RAM) CPU {:.0}% RAM {:.0}%",
            p.id, p.host_name, p.platform, p.cpu_name, p.mem_size, p.cpu_percent, p.mem_percent
        );
    }
}
