//! Startup, background workers and the render loop.
//!
//! The render loop is the only place the [`Controller`] is touched. The
//! refresh and clock workers send [`ControllerEvent`]s over one channel,
//! keystrokes arrive on a second one, and every received message is followed
//! by a redraw.

use std::{io, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use westat_core::{
    ClockTicker, Config, Controller, ControllerEvent, HistoryStore, RefreshScheduler, Report,
    ReportFetcher, Supervisor, UnitsTable,
    fetcher::{fetch_within, fetcher_from_config},
};

use crate::ui;

const EVENT_CAPACITY: usize = 64;
const INPUT_POLL: Duration = Duration::from_millis(250);

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

pub async fn run(config: Config) -> Result<()> {
    info!(station = %config.station, "Starting westat");

    let fetcher: Arc<dyn ReportFetcher> = Arc::new(fetcher_from_config(&config)?);
    let history = Arc::new(HistoryStore::load(config.history_file_path()?));

    let report = bootstrap(fetcher.as_ref(), &config).await?;
    if let Err(e) = history.append(report.reading()) {
        warn!(error = %e, "initial reading not persisted");
    }

    let units = UnitsTable::default();
    let mut controller = Controller::bootstrap(&report, units, history.clone(), Local::now());

    // Nothing runs in the background yet, so a terminal failure can return early.
    let mut terminal = setup_terminal().context("Failed to set up the terminal")?;

    let cancel = CancellationToken::new();
    let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
    let scheduler = RefreshScheduler::new(
        config.station.clone(),
        fetcher,
        history,
        report,
        events_tx.clone(),
        config.refresh_interval(),
        config.fetch_timeout(),
        cancel.clone(),
    );
    let supervisor = Supervisor::start(scheduler, cancel.clone());
    let ticker = ClockTicker::new(events_tx, config.tick_interval(), cancel.clone());
    let clock = ticker.spawn(supervisor);
    let inputs = spawn_input_reader(cancel.clone());

    let result = render_loop(&mut terminal, &mut controller, events_rx, inputs).await;

    if let Err(e) = restore_terminal(&mut terminal) {
        warn!(error = %e, "terminal not fully restored");
    }

    cancel.cancel();
    match clock.await {
        Ok(supervisor) => debug!(restarts = supervisor.restarts(), "workers stopped"),
        Err(e) => warn!(error = %e, "clock worker failed"),
    }

    info!("westat stopped");
    result
}

/// Fetch the first report within the configured timeout.
async fn bootstrap(fetcher: &dyn ReportFetcher, config: &Config) -> Result<Report> {
    let station = &config.station;

    fetch_within(fetcher, station, config.fetch_timeout())
        .await
        .with_context(|| format!("Could not fetch the initial report for station {station}"))
}

async fn render_loop(
    terminal: &mut Tui,
    controller: &mut Controller,
    mut events: mpsc::Receiver<ControllerEvent>,
    mut inputs: mpsc::Receiver<Event>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::draw(frame, controller))?;

        tokio::select! {
            Some(event) = events.recv() => controller.handle(event),
            Some(input) = inputs.recv() => {
                if is_quit(&input) {
                    break;
                }
            }
            else => break,
        }
    }

    Ok(())
}

fn is_quit(event: &Event) -> bool {
    match event {
        Event::Key(key) => key.code == KeyCode::Char('q') && key.kind == KeyEventKind::Press,
        _ => false,
    }
}

/// Forward terminal input into the render loop until cancelled.
fn spawn_input_reader(cancel: CancellationToken) -> mpsc::Receiver<Event> {
    let (tx, rx) = mpsc::channel(EVENT_CAPACITY);

    tokio::task::spawn_blocking(move || {
        while !cancel.is_cancelled() {
            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if tx.blocking_send(ev).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "terminal input failed");
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "terminal input failed");
                    break;
                }
            }
        }
    });

    rx
}

/// Raw mode plus the alternate screen; both are undone if any step fails.
fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;

    let terminal = execute!(io::stdout(), EnterAlternateScreen)
        .and_then(|()| Terminal::new(CrosstermBackend::new(io::stdout())));

    match terminal {
        Ok(terminal) => Ok(terminal),
        Err(e) => {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            let _ = disable_raw_mode();
            Err(e.into())
        }
    }
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
