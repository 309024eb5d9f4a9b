mod app;
pub mod bootstrap;
pub mod headless;
pub mod logging;
mod ui;

use crate::app::App;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture, Event as CtEvent};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, ExecutableCommand};
use lander_application::config::Config;
use lander_application::session::runtime::{RuntimeSettings, SessionRuntime};
use lander_application::session::Session;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Clone)]
pub struct TuiOpts {
    pub config: Config,
    pub log_store: Arc<parking_lot::Mutex<logging::LogStore>>,
}

pub fn run(opts: TuiOpts) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("failed to init tokio runtime: {err}"))?;
    runtime.block_on(run_async(opts))
}

async fn run_async(opts: TuiOpts) -> Result<(), String> {
    enable_raw_mode().map_err(|err| format!("failed to enable raw mode: {err}"))?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .map_err(|err| format!("failed to enter alternate screen: {err}"))?;
    stdout
        .execute(crossterm::terminal::Clear(
            crossterm::terminal::ClearType::All,
        ))
        .map_err(|err| format!("failed to clear screen: {err}"))?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal =
        Terminal::new(backend).map_err(|err| format!("failed to init terminal: {err}"))?;
    terminal
        .hide_cursor()
        .map_err(|err| format!("failed to hide cursor: {err}"))?;

    let result = run_loop(&mut terminal, opts).await;

    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen, DisableMouseCapture);
    let _ = disable_raw_mode();
    let _ = terminal.show_cursor();

    result
}

fn spawn_input_reader(tx: UnboundedSender<CtEvent>) {
    std::thread::spawn(move || {
        while let Ok(event) = crossterm::event::read() {
            if tx.send(event).is_err() {
                break;
            }
        }
    });
}

async fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    opts: TuiOpts,
) -> Result<(), String> {
    let client = Arc::new(bootstrap::build_client(&opts.config)?);
    let (session_tx, mut session_rx) = tokio::sync::mpsc::unbounded_channel();
    let (input_tx, mut input_rx) = tokio::sync::mpsc::unbounded_channel();

    let mut runtime = SessionRuntime::start(
        Arc::clone(&client),
        RuntimeSettings::from_config(&opts.config),
        session_tx,
    );
    let mut app = App::new(
        Session::new(opts.config.poll.unreachable_after),
        client.base_url().to_string(),
        client.origin().to_string(),
        opts.config.notification_ttl(),
        opts.log_store,
    );
    tracing::info!(api = %client.base_url(), "session started");

    spawn_input_reader(input_tx);
    let mut tick = tokio::time::interval(Duration::from_millis(100));

    let result = loop {
        runtime.perform_all(app.take_followups());

        if app.dirty {
            if let Err(err) = terminal.draw(|frame| ui::draw(frame, &app)) {
                break Err(format!("terminal draw failed: {err}"));
            }
            app.dirty = false;
        }

        tokio::select! {
            _ = tick.tick() => {
                app.on_tick(Instant::now());
            }
            Some(event) = session_rx.recv() => {
                app.on_session_event(event);
            }
            maybe_input = input_rx.recv() => {
                let Some(event) = maybe_input else { break Ok(()); };
                if app.on_input(event) { break Ok(()); }
            }
        }
    };

    app.session.close();
    runtime.shutdown();
    tracing::info!("session closed");
    result
}
