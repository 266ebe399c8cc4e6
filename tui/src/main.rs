use anyhow::{Context, Result};
use auction_client::{load_config, JsonRpcGateway};
use auction_core::{Metrics, NavigationHost};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use prometheus::Registry;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::OpenOptions,
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

mod app;
mod draw;
mod router;
mod tui;

use app::App;
use router::{ChannelNavigation, Route};

const DEFAULT_CONFIG: &str = "auction.json";
const DEFAULT_LOG: &str = "auction-tui.log";

fn init_logging() -> Result<()> {
    let path = std::env::var("AUCTION_LOG").unwrap_or_else(|_| DEFAULT_LOG.to_string());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path))?;
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let cfg = load_config(&config_path).await?;
    tracing::info!(
        target: "app",
        rpc = %cfg.rpc.url,
        factory = %cfg.collection.factory_address,
        "starting auction browser"
    );

    let registry = Registry::new();
    let metrics = Metrics::new(&registry)?;
    let gateway = Arc::new(JsonRpcGateway::new(&cfg)?);

    let (nav_tx, mut nav_rx) = mpsc::unbounded_channel::<Route>();
    let navigation: Arc<dyn NavigationHost> = Arc::new(ChannelNavigation::new(nav_tx));
    let mut app = App::new(cfg, gateway, metrics, navigation);
    app.reload_listing();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run(&mut terminal, &mut app, &mut nav_rx).await;

    app.shutdown();
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    tracing::info!(target: "app", "auction browser stopped");
    result
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    nav_rx: &mut mpsc::UnboundedReceiver<Route>,
) -> Result<()> {
    let mut keys = crossterm::event::EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(250));

    loop {
        terminal.draw(|f| draw::draw_ui(f, app))?;
        if let Some(ratio) = app.marker_ratio() {
            app.listing.on_marker_visibility(ratio);
        }

        tokio::select! {
            Some(route) = nav_rx.recv() => app.navigate(route),
            _ = tick.tick() => {}
            Some(Ok(evt)) = keys.next() => {
                if app.handle_event(evt) {
                    break;
                }
            }
            else => break,
        }
    }
    Ok(())
}
