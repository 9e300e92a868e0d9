use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use medchat_core::{ChatController, Config, HttpChatClient, RecentFiles};
use tokio::sync::mpsc;

mod app;
mod bridge;
mod handler;
mod logging;
mod microphone;
mod tui;
mod ui;
mod wav;

use app::App;
use bridge::ChannelView;
use microphone::CpalMicrophone;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "medchat")]
#[command(about = "Terminal chat client for the medical assistant server")]
#[command(version)]
struct Cli {
    /// Server base URL (overrides config and MEDCHAT_SERVER_URL)
    #[arg(short, long)]
    server: Option<String>,

    /// Remember --server in the config file
    #[arg(long, requires = "server")]
    save_server: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging is best-effort; the app still runs without a writable data dir
    match logging::init() {
        Ok(path) => info!("Logging to {}", path.display()),
        Err(e) => eprintln!("medchat: file logging disabled: {}", e),
    }

    let mut config = Config::load_or_default();
    config.apply_env();
    if let Some(server) = &cli.server {
        config.server_url = server.clone();
        if cli.save_server {
            Config::save_server_url(server)?;
        }
    }
    info!("Starting medchat v{} against {}", env!("CARGO_PKG_VERSION"), config.server_url);

    let recent = match RecentFiles::default_path() {
        Ok(path) => RecentFiles::load(path),
        Err(e) => {
            warn!("Recent files will not persist: {}", e);
            RecentFiles::in_memory()
        }
    };
    let backend = HttpChatClient::new(&config.server_url, config.request_timeout())?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(config.typing_interval());

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let view = ChannelView::new(events.sender());
    let mut controller = ChatController::new(view, backend, CpalMicrophone::default(), recent, &config);
    controller.render_recent_files();
    let controller_task = tokio::spawn(bridge::run_controller(controller, command_rx));

    let mut app = App::new(config.server_url.clone(), command_tx);
    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    controller_task.abort();
    info!("Exiting");

    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
