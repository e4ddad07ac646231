use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::session::{ChatInput, ConnectionState, Entry, EntryKind};
use crate::tui::app::{App, AppState};

/// Render the main UI
pub fn render_ui(frame: &mut Frame, app: &App, app_state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(6),    // Transcript
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);
    render_transcript(frame, chunks[1], app);
    render_input(frame, chunks[2], app, app_state);
    render_status_bar(frame, chunks[3], app, app_state);

    if app.help_visible {
        render_help(frame, chunks[1]);
    }
}

fn connection_badge(connection: ConnectionState) -> (&'static str, Color) {
    match connection {
        ConnectionState::Disconnected => ("● disconnected", Color::Red),
        ConnectionState::Connected => ("● connected", Color::Yellow),
        ConnectionState::Ready => ("● ready", Color::Green),
    }
}

fn kind_color(kind: EntryKind) -> Color {
    match kind {
        EntryKind::System => Color::Yellow,
        EntryKind::User => Color::Blue,
        EntryKind::Llm => Color::Green,
        EntryKind::Error => Color::Red,
    }
}

/// Render the header
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let controller = app.controller();
    let (badge, badge_color) = connection_badge(controller.connection());

    let header_text = vec![Line::from(vec![
        Span::styled(
            "Helferlein",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | Server: "),
        Span::styled(&app.server_url, Style::default().fg(Color::Gray)),
        Span::raw(" | Mode: "),
        Span::styled(
            controller.mode().display_name(),
            Style::default().fg(Color::Magenta),
        ),
        Span::raw(" | "),
        Span::styled(badge, Style::default().fg(badge_color)),
        Span::raw(" | Upload: "),
        Span::raw(controller.upload().display_name()),
    ])];

    let header = Paragraph::new(header_text)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .alignment(Alignment::Center);

    frame.render_widget(header, area);
}

/// Transcript entries as display lines: "Sender: text" with the label in
/// the entry's color and the text as a raw span
pub fn transcript_lines<'a>(entries: &'a [Entry], show_timestamps: bool) -> Vec<Line<'a>> {
    let mut lines = Vec::new();

    for entry in entries {
        let color = kind_color(entry.kind);
        let mut text_lines = entry.text.lines();
        let first = text_lines.next().unwrap_or("");

        let mut spans = Vec::new();
        if show_timestamps {
            spans.push(Span::styled(
                format!("[{}] ", entry.timestamp.format("%H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ));
        }
        spans.push(Span::styled(
            format!("{}: ", entry.sender.label()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        let body_style = if entry.kind == EntryKind::Error {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        spans.push(Span::styled(first, body_style));
        lines.push(Line::from(spans));

        for rest in text_lines {
            lines.push(Line::from(Span::styled(rest, body_style)));
        }
        lines.push(Line::from(""));
    }

    lines
}

/// Render the transcript, pinned to the bottom unless scrolled up
fn render_transcript(frame: &mut Frame, area: Rect, app: &App) {
    let lines = transcript_lines(app.controller().transcript().entries(), app.show_timestamps);

    let inner_width = area.width.saturating_sub(2).max(1) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let total_rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(inner_width))
        .sum();

    let bottom = total_rows.saturating_sub(inner_height);
    let top = bottom.saturating_sub(app.scroll_offset as usize);
    let scroll = u16::try_from(top).unwrap_or(u16::MAX);

    let title = if app.scroll_offset > 0 {
        format!("Transcript [scrolled {}]", app.scroll_offset)
    } else {
        "Transcript".to_string()
    };

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(paragraph, area);
}

/// Render the input area
fn render_input(frame: &mut Frame, area: Rect, app: &App, app_state: &AppState) {
    let controller = app.controller();

    let (title, text, color) = match app_state {
        AppState::Command => (
            "Command".to_string(),
            format!(":{}", app.command_input),
            Color::Yellow,
        ),
        _ => match controller.input() {
            ChatInput::Open => {
                let color = if *app_state == AppState::Insert {
                    Color::Cyan
                } else {
                    Color::Gray
                };
                ("Message".to_string(), app.input.clone(), color)
            }
            ChatInput::Pending(_) => (
                "Message [waiting for response]".to_string(),
                app.input.clone(),
                Color::DarkGray,
            ),
            ChatInput::Locked => (
                "Message [locked]".to_string(),
                "Upload files and wait for the server before chatting".to_string(),
                Color::DarkGray,
            ),
        },
    };

    let input = Paragraph::new(text.as_str())
        .style(Style::default().fg(color))
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
    frame.render_widget(input, area);

    let typing = match app_state {
        AppState::Command => true,
        AppState::Insert => app.can_type(),
        AppState::Normal => false,
    };
    if typing {
        let cursor_x = area.x + 1 + text.chars().count() as u16;
        frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, area: Rect, app: &App, app_state: &AppState) {
    let mode = match app_state {
        AppState::Normal => "NORMAL",
        AppState::Insert => "INSERT",
        AppState::Command => "COMMAND",
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", mode),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::raw(app.controller().status_line()),
        Span::styled(
            format!(" | {} file(s) selected", app.selection.file_count()),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    if let Some(status) = &app.status_message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(status, Style::default().fg(Color::Yellow)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let width = area.width.saturating_sub(8).min(70);
    let height = area.height.saturating_sub(2).min(20);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + 1,
        width,
        height,
    };

    let help = Paragraph::new(App::help_text())
        .block(
            Block::default()
                .title(" Help (:help to close) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, popup);
    frame.render_widget(help, popup);
}
