//! UI rendering
//!
//! Status line, error/status panel, and the transfer list, newest first.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

use super::text::truncate_ellipsis;
use super::App;

/// Placeholder shown while the transfer log is empty
const EMPTY_PLACEHOLDER: &str = "Nothing yet, press 'l' to launch!";

/// Main UI rendering dispatcher
pub fn ui(f: &mut Frame, app: &App) {
    let errors = app.viewer.errors();
    let error_height = if errors.is_empty() {
        0
    } else {
        errors.lines().len() as u16 + 2
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(error_height),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_status(f, app, chunks[0]);
    if !errors.is_empty() {
        render_errors(f, app, chunks[1]);
    }
    render_transfers(f, app, chunks[2]);
    render_hints(f, chunks[3]);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let (status, style) = if app.viewer.is_connected() {
        (
            "Connected (Showing last 100 transfers)",
            Style::default().fg(Color::Green),
        )
    } else {
        ("Disconnected", Style::default().fg(Color::DarkGray))
    };

    let paragraph = Paragraph::new(Line::from(vec![
        Span::raw("Connected: "),
        Span::styled(status, style),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Stream Transfers"),
    );
    f.render_widget(paragraph, area);
}

fn render_errors(f: &mut Frame, app: &App, area: Rect) {
    // Blank entries are separator lines, not dropped
    let lines: Vec<Line> = app
        .viewer
        .errors()
        .lines()
        .iter()
        .map(|line| {
            if line.is_empty() {
                Line::default()
            } else {
                Line::from(line.as_str())
            }
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .style(Style::default().fg(Color::Red))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(paragraph, area);
}

fn render_transfers(f: &mut Frame, app: &App, area: Rect) {
    let width = area.width.saturating_sub(2) as usize;
    let transfers = app.viewer.transfers();

    let items: Vec<ListItem> = if transfers.is_empty() {
        vec![ListItem::new(Span::styled(
            EMPTY_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        transfers
            .iter_newest_first()
            .map(|transfer| ListItem::new(truncate_ellipsis(transfer, width).into_owned()))
            .collect()
    };

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Transfers"));
    f.render_widget(list, area);
}

fn render_hints(f: &mut Frame, area: Rect) {
    let hints = Line::from(vec![
        Span::styled(" l ", Style::default().fg(Color::Yellow)),
        Span::raw("launch  "),
        Span::styled(" s ", Style::default().fg(Color::Yellow)),
        Span::raw("stop  "),
        Span::styled(" q ", Style::default().fg(Color::Yellow)),
        Span::raw("quit"),
    ]);
    f.render_widget(Paragraph::new(hints), area);
}
