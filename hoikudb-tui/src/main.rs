//! Terminal UI for hoikudb: browse Yokohama childcare facilities by ward and vacancy.

mod app;
mod input;
mod map;
mod settings;
mod telemetry;
mod ui;

use std::{io, sync::Arc, time::Duration as StdDuration};

use anyhow::Result;
use chrono::Local;
use crossbeam_channel::unbounded;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use hoikudb_core::{
    ports::{PortError, SystemClock},
    service::{FetchOutcome, MapSession},
    stats::StatsRepository,
    wards::WardGazetteer,
};
use hoikudb_provider_yokohama as yokohama;
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use tracing::{info, warn};

use crate::app::App;
use crate::input::Action;
use crate::map::TerminalMap;
use crate::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    let _guard = telemetry::init(&settings.log_dir);

    // HTTP + repository setup
    let client = Client::builder().user_agent(&settings.user_agent).build()?;
    let source = yokohama::source(client, settings.endpoint.clone());
    let repository = Arc::new(StatsRepository::with_clock(
        source,
        Arc::new(SystemClock),
        settings.cache_ttl(),
    ));
    info!(
        endpoint = %settings.endpoint,
        ttl_secs = repository.ttl().num_seconds(),
        "starting hoikudb"
    );

    // App state
    let (map_tx, map_rx) = unbounded();
    let session = MapSession::new(repository, WardGazetteer::yokohama(), TerminalMap::new(map_rx));
    let app = App::new(session, map_tx);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

async fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        app.sync_overlay();

        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            let action = input::handle_key_event(key, &mut app);

            match action {
                Action::Quit => break,
                Action::None => {}
                Action::SelectArea(area) => {
                    app.is_loading = true;
                    app.error_message = None;
                    app.sync_overlay();
                    terminal.draw(|frame| ui::draw(frame, &app))?;

                    let res = app.session.select_area(area).await;
                    finish_fetch(&mut app, res, "Failed to load ward");
                }
                Action::Reload => {
                    if app.session.selected_area().is_none() {
                        app.error_message = Some("Select a ward first".into());
                        continue;
                    }

                    app.is_loading = true;
                    app.error_message = None;
                    terminal.draw(|frame| ui::draw(frame, &app))?;

                    let res = app.session.reload().await;
                    finish_fetch(&mut app, res, "Reload failed");
                }
            }
        }
    }

    Ok(())
}

// Earlier facilities stay on the map when a fetch fails.
fn finish_fetch(app: &mut App, res: Result<FetchOutcome, PortError>, context: &str) {
    app.is_loading = false;
    match res {
        Ok(FetchOutcome::Applied(count)) => {
            info!(count, "facilities applied");
            app.loaded_at = Some(Local::now());
        }
        Ok(FetchOutcome::Superseded) => {}
        Err(err) => {
            warn!(error = %err, "{context}");
            let hint = if err.is_transport() {
                "check the connection"
            } else {
                "unexpected data"
            };
            app.error_message = Some(format!("{context}: {err} ({hint})"));
        }
    }
}
