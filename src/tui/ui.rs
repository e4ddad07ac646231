use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::error;

use crate::constants::{UI_PAGE_SCROLL_LINES, UI_REFRESH_INTERVAL_MS, UI_SCROLL_LINES};
use crate::session::SessionEvent;
use crate::tui::render::render_ui;
use crate::tui::{App, AppState};

/// Run the terminal UI until the user quits
pub async fn run_ui(mut app: App, mut events: mpsc::UnboundedReceiver<SessionEvent>) -> Result<()> {
    if !crossterm::tty::IsTty::is_tty(&io::stdout()) {
        eprintln!("❌ Helferlein requires an interactive terminal.");
        eprintln!("   For scripted use, pass a question with --prompt.");
        return Err(anyhow::anyhow!("No interactive terminal available"));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app_state = AppState::Normal;

    let res = run_app(&mut terminal, &mut app, &mut app_state, &mut events).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!("UI loop failed: {:?}", err);
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    app_state: &mut AppState,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|f| render_ui(f, app, app_state))?;

        if event::poll(Duration::from_millis(UI_REFRESH_INTERVAL_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
                    app.quit();
                    break;
                }

                handle_key(app, app_state, key.code);
            }
        }

        while let Ok(event) = events.try_recv() {
            app.handle_event(event);
        }

        if !app.running {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, app_state: &mut AppState, code: KeyCode) {
    match app_state {
        AppState::Normal => match code {
            KeyCode::Char('q') => app.quit(),
            KeyCode::Char('i') => *app_state = AppState::Insert,
            KeyCode::Char(':') => {
                *app_state = AppState::Command;
                app.command_input.clear();
            }
            KeyCode::Char('u') => app.submit_upload(),
            KeyCode::Up => app.scroll_up(UI_SCROLL_LINES),
            KeyCode::Down => app.scroll_down(UI_SCROLL_LINES),
            KeyCode::PageUp => app.scroll_up(UI_PAGE_SCROLL_LINES),
            KeyCode::PageDown => app.scroll_down(UI_PAGE_SCROLL_LINES),
            KeyCode::Esc => app.help_visible = false,
            _ => {}
        },
        AppState::Insert => match code {
            KeyCode::Esc => *app_state = AppState::Normal,
            KeyCode::Enter => app.submit_input(),
            // Locked or pending input does not accept keystrokes
            KeyCode::Char(c) if app.can_type() => app.input.push(c),
            KeyCode::Backspace if app.can_type() => {
                app.input.pop();
            }
            KeyCode::Up => app.scroll_up(UI_SCROLL_LINES),
            KeyCode::Down => app.scroll_down(UI_SCROLL_LINES),
            _ => {}
        },
        AppState::Command => match code {
            KeyCode::Esc => {
                *app_state = AppState::Normal;
                app.command_input.clear();
            }
            KeyCode::Enter => {
                let command = std::mem::take(&mut app.command_input);
                app.handle_command(&command);
                *app_state = AppState::Normal;
            }
            KeyCode::Char(c) => app.command_input.push(c),
            KeyCode::Backspace => {
                if app.command_input.pop().is_none() {
                    *app_state = AppState::Normal;
                }
            }
            _ => {}
        },
    }
}
