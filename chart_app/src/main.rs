// chart_app: terminal candlestick dashboard.
//
// The drawing surface, keyboard/mouse events and resize handling live here;
// all chart geometry comes from chart_core as plain values. The feed task
// polls the exchange in the background and everything meets in one
// event/reducer loop.

use std::io;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;

mod app;
mod feed;
mod persist;
mod settings;

use app::{AppEvent, AppRuntime, AppState, UiEvent};
use chart_core::Granularity;
use feed::FeedCommand;
use persist::SeriesSnapshot;
use settings::SettingsManager;

const UI_POLL_MS: u64 = 100;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut settings_mgr = SettingsManager::load_default();
    let settings = settings_mgr.state();
    let snapshot_path = persist::snapshot_path(settings_mgr.base_dir());
    let cached = persist::load_snapshot(&snapshot_path, &settings.symbol, settings.granularity);
    if !cached.is_empty() {
        info!(count = cached.len(), "restored cached candle series");
    }

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = unbounded_channel::<FeedCommand>();
    tokio::spawn(feed::run_feed(settings.clone(), cmd_rx, event_tx.clone()));

    let mut runtime = AppRuntime::new(AppState::new(&settings, cached));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_ui_loop(&mut terminal, &mut runtime, &event_rx, &cmd_tx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Persist where we ended up so the next launch starts warm.
    settings_mgr.set_granularity(runtime.state.granularity());
    if let Err(err) = settings_mgr.save() {
        eprintln!("failed to save settings: {err:?}");
    }
    if !runtime.state.series.is_empty() {
        let snapshot = SeriesSnapshot {
            symbol: runtime.state.symbol.clone(),
            granularity: runtime.state.granularity(),
            candles: runtime.state.series.candles().to_vec(),
        };
        if let Err(err) = persist::save_snapshot(&snapshot_path, &snapshot) {
            eprintln!("failed to save series snapshot: {err:?}");
        }
    }

    res
}

fn run_ui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    runtime: &mut AppRuntime,
    event_rx: &mpsc::Receiver<AppEvent>,
    cmd_tx: &tokio::sync::mpsc::UnboundedSender<FeedCommand>,
) -> Result<()> {
    loop {
        while let Ok(ev) = event_rx.try_recv() {
            runtime.handle_event(ev);
        }
        runtime.tick_if_needed();

        if let Some((generation, granularity)) = runtime.state.take_resync_request() {
            let _ = cmd_tx.send(FeedCommand::Resync {
                generation,
                granularity,
            });
        }

        runtime.render_if_dirty(terminal)?;

        if !event::poll(Duration::from_millis(UI_POLL_MS))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => runtime.handle_event(AppEvent::Ui(UiEvent::GranularityCycled)),
                KeyCode::Char('1') => select_granularity(runtime, Granularity::H1),
                KeyCode::Char('4') => select_granularity(runtime, Granularity::H4),
                KeyCode::Char('d') | KeyCode::Char('D') => {
                    select_granularity(runtime, Granularity::D1)
                }
                KeyCode::Char('r') | KeyCode::Char('R') => {
                    runtime.handle_event(AppEvent::Ui(UiEvent::ForceResync))
                }
                _ => {}
            },
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Moved => runtime.handle_event(AppEvent::Ui(UiEvent::CursorMoved {
                    column: mouse.column,
                    row: mouse.row,
                })),
                _ => {}
            },
            Event::Resize(_, _) => runtime.mark_dirty(),
            Event::FocusLost => runtime.handle_event(AppEvent::Ui(UiEvent::CursorLeft)),
            _ => {}
        }
    }
}

fn select_granularity(runtime: &mut AppRuntime, granularity: Granularity) {
    runtime.handle_event(AppEvent::Ui(UiEvent::GranularitySelected { granularity }));
}
