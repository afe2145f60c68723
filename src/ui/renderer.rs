use std::ops::Range;

use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::core::app::{App, UiMode};
use crate::core::constants::INDICATOR_SPACE;
use crate::core::message::Message;
use crate::utils::wrap::wrap_text;

const MAX_INPUT_LINES: u16 = 6;
const DISCLAIMER: &str = "Gemini can make mistakes. Check important info.";

pub fn ui(f: &mut Frame, app: &App) {
    let input_height = app.ui.input_line_count().min(MAX_INPUT_LINES) + 2; // +2 for borders

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(input_height),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    if app.transcript().is_empty() {
        render_welcome(f, app, chunks[1]);
    } else {
        render_transcript(f, app, chunks[1]);
    }
    render_status(f, app, chunks[2]);
    render_input(f, app, chunks[3]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let header = Line::from(vec![
        Span::styled(
            "Flint Chat",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" v{} • {}", env!("CARGO_PKG_VERSION"), app.model()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(header), area);
}

fn render_welcome(f: &mut Frame, app: &App, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            "Super fast responses",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!(
            "Low-latency chat with {}. Ask anything!",
            app.model()
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter sends • Shift+Enter adds a line • Ctrl+L clears • Ctrl+C quits",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let panel_height = (lines.len() as u16 + 2).min(area.height);
    let top = area.y + area.height.saturating_sub(panel_height) / 2;
    let panel = Rect::new(area.x, top, area.width, panel_height);

    let welcome = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title("Welcome"),
        );
    f.render_widget(welcome, panel);
}

fn render_transcript(f: &mut Frame, app: &App, area: Rect) {
    let lines = build_transcript_lines(app, area.width);

    // Lines are pre-wrapped, so the count is exact. Only the visible window is
    // handed to ratatui, which keeps its u16 scroll offset out of the picture.
    let window = visible_window(lines.len(), area.height, app.ui.scroll_from_bottom);
    let visible: Vec<Line<'static>> = lines
        .into_iter()
        .skip(window.start)
        .take(window.len())
        .collect();

    f.render_widget(Paragraph::new(visible), area);
}

/// Range of transcript lines shown in a viewport `height` rows tall, scrolled
/// `scroll_from_bottom` lines up from the end.
fn visible_window(total: usize, height: u16, scroll_from_bottom: u16) -> Range<usize> {
    let height = usize::from(height);
    let max_offset = total.saturating_sub(height);
    let start = max_offset - usize::from(scroll_from_bottom).min(max_offset);
    start..(start + height).min(total)
}

/// Transcript lines for a viewport `width` columns wide, wrapped ahead of time.
pub fn build_transcript_lines(app: &App, width: u16) -> Vec<Line<'static>> {
    let body_width = width.saturating_sub(2).max(1) as usize;
    let footer_style = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    for message in app.transcript().messages() {
        let (label, color) = if message.is_user() {
            ("You", Color::Cyan)
        } else {
            ("Gemini", Color::Green)
        };
        lines.push(Line::from(Span::styled(
            format!("{label}:"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));

        if !message.content.is_empty() {
            for wrapped in wrap_text(&message.content, body_width) {
                lines.push(Line::from(format!("  {wrapped}")));
            }
        }

        lines.push(Line::from(Span::styled(
            format!("  {}", message_footer(app, message)),
            footer_style,
        )));
        lines.push(Line::from(""));
    }

    lines
}

fn message_footer(app: &App, message: &Message) -> String {
    if !message.is_streaming {
        return message
            .timestamp
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string();
    }
    // A placeholder left streaming by a failed turn is no longer generating.
    if app.reconciler.streaming_message() == Some(&message.id) {
        "Generating...".to_string()
    } else {
        "(interrupted)".to_string()
    }
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let line = match (&app.ui.mode, &app.ui.status) {
        (UiMode::ConfirmReset, _) => Line::from(Span::styled(
            "Clear the conversation? (y/n)",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        (UiMode::Typing, Some(status)) => Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow),
        )),
        (UiMode::Typing, None) => Line::from(Span::styled(
            DISCLAIMER,
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn render_input(f: &mut Frame, app: &App, area: Rect) {
    let title = if app.is_busy() {
        "Waiting for response (Ctrl+C to quit)"
    } else if app.can_send() {
        "Enter to send (Shift+Enter for new line)"
    } else {
        "Type your message (Ctrl+L to clear, Ctrl+C to quit)"
    };

    let border_color = if app.can_send() {
        Color::Green
    } else {
        Color::Reset
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(INDICATOR_SPACE)])
        .split(inner);

    f.render_widget(&app.ui.textarea, columns[0]);

    let indicator = send_indicator(app);
    f.render_widget(
        Paragraph::new(Line::from(indicator)).alignment(Alignment::Center),
        columns[1],
    );
}

fn send_indicator(app: &App) -> Span<'static> {
    if app.is_busy() {
        // Pulse twice a second while the turn is running.
        let elapsed = app.ui.pulse_start.elapsed().as_millis() as f32 / 1000.0;
        let phase = (elapsed * 2.0) % 2.0;
        let intensity = if phase < 1.0 { phase } else { 2.0 - phase };
        let symbol = if intensity < 0.33 {
            "○"
        } else if intensity < 0.66 {
            "◐"
        } else {
            "●"
        };
        return Span::styled(symbol, Style::default().fg(Color::Yellow));
    }

    let color = if app.can_send() {
        Color::Green
    } else {
        Color::DarkGray
    };
    Span::styled("➤", Style::default().fg(color))
}
