//! Terminal UI
//!
//! One event loop drives the viewer: key events, transport events, and a
//! redraw tick all land on the same task, so viewer state is never shared
//! across threads.

mod render;
mod text;

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use tokio::sync::mpsc;

use chaintap_core::config::Config;
use chaintap_core::stream::{EoswsSocket, TransportEvent};
use chaintap_core::viewer::StreamViewer;

/// Redraw cadence when nothing else is happening
const TICK: Duration = Duration::from_millis(250);

pub struct App {
    viewer: StreamViewer<EoswsSocket>,
    transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Self {
        let endpoint = config.endpoint_url().unwrap_or_default();
        let (socket, transport_events) = EoswsSocket::new(endpoint);

        Self {
            viewer: StreamViewer::new(&config, socket),
            transport_events,
            should_quit: false,
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('l') | KeyCode::Char('L') => self.viewer.start().await,
            KeyCode::Char('s') | KeyCode::Char('S') => self.viewer.stop().await,
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }
}

/// Run the TUI until the user quits
pub async fn run(config: Config) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);
    let result = event_loop(&mut terminal, &mut app).await;

    // Try our best to disconnect gracefully
    app.viewer.shutdown().await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let mut term_events = EventStream::new();
    let mut tick = tokio::time::interval(TICK);

    loop {
        terminal.draw(|f| render::ui(f, app))?;

        tokio::select! {
            maybe_event = term_events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => app.handle_key(key).await,
                    Some(Ok(_)) => {} // resizes are handled by the next draw
                    Some(Err(e)) => tracing::warn!("Terminal event error: {}", e),
                    None => app.should_quit = true,
                }
            }
            Some(event) = app.transport_events.recv() => {
                app.viewer.handle_event(event).await;
            }
            _ = tick.tick() => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
