use std::path::PathBuf;

use crate::app::Config;
use crate::client::UploadBatch;
use crate::session::{Session, SessionController, SessionEvent};

const HELP_TEXT: &str = "Commands:\n\
    :test <paths...> - Select scanned test pages (png)\n\
    :solution <path> - Select the model solution (png, txt, md)\n\
    :files - Show the current selection\n\
    :upload - Upload the selected files\n\
    :reset - Drop the server session and start over\n\
    :ts - Toggle timestamps\n\
    :clear - Clear the status message\n\
    :quit/:q - Quit\n\
    \n\
    Keys:\n\
    i - Enter insert mode (type messages)\n\
    Esc - Return to normal mode\n\
    : - Enter command mode\n\
    u - Upload selected files\n\
    Up/Down, PgUp/PgDn - Scroll\n\
    Ctrl+C - Quit";

/// Application state
pub struct App {
    /// Upload-gated chat session
    pub session: Session,
    /// Chat draft
    pub input: String,
    /// Command-mode buffer
    pub command_input: String,
    /// Is the app running?
    pub running: bool,
    /// Lines scrolled up from the bottom of the transcript
    pub scroll_offset: u16,
    /// Server URL for display
    pub server_url: String,
    /// Files chosen for the next upload
    pub selection: UploadBatch,
    /// Show entry timestamps
    pub show_timestamps: bool,
    /// Status message
    pub status_message: Option<String>,
    /// Help overlay text shown above the transcript
    pub help_visible: bool,
}

impl App {
    /// Create a new app instance
    pub fn new(session: Session, config: &Config, selection: UploadBatch) -> Self {
        Self {
            session,
            input: String::new(),
            command_input: String::new(),
            running: true,
            scroll_offset: 0,
            server_url: config.server.url.clone(),
            selection,
            show_timestamps: config.ui.show_timestamps,
            status_message: None,
            help_visible: false,
        }
    }

    pub fn controller(&self) -> &SessionController {
        self.session.controller()
    }

    pub fn help_text() -> &'static str {
        HELP_TEXT
    }

    /// Chat input accepts keystrokes
    pub fn can_type(&self) -> bool {
        self.controller().can_chat()
    }

    /// Apply a session event and follow the transcript
    pub fn handle_event(&mut self, event: SessionEvent) {
        self.session.handle(event);
        self.scroll_offset = 0;
    }

    /// Send the chat draft
    pub fn submit_input(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }
        if self.session.send_chat_message(&self.input) {
            self.input.clear();
            self.scroll_offset = 0;
            self.clear_status();
        } else {
            self.set_status("Chat is not available right now");
        }
    }

    /// Upload the current selection
    pub fn submit_upload(&mut self) {
        if self.selection.is_empty() {
            self.set_status("Select files first: :test <paths>, :solution <path>");
            return;
        }
        if !self.controller().can_upload() {
            self.set_status("Upload is disabled (already uploaded or in progress; :reset to start over)");
            return;
        }
        let count = self.selection.file_count();
        self.session.submit_upload(self.selection.clone());
        self.scroll_offset = 0;
        self.set_status(format!("Uploading {} file(s)...", count));
    }

    /// Run a `:` command
    pub fn handle_command(&mut self, command: &str) {
        let parts: Vec<&str> = command.split_whitespace().collect();

        match parts.first().copied() {
            Some("quit") | Some("q") => self.quit(),
            Some("test") | Some("t") => {
                if parts.len() < 2 {
                    self.set_status("Usage: :test <paths...>");
                } else {
                    self.selection.test_files = parts[1..].iter().map(PathBuf::from).collect();
                    self.set_status(format!(
                        "{} test file(s) selected",
                        self.selection.test_files.len()
                    ));
                }
            }
            Some("solution") | Some("s") => match parts.get(1) {
                Some(path) => {
                    self.selection.solution_file = Some(PathBuf::from(path));
                    self.set_status(format!("Solution: {}", path));
                }
                None => self.set_status("Usage: :solution <path>"),
            },
            Some("files") => self.set_status(self.selection_summary()),
            Some("upload") | Some("u") => self.submit_upload(),
            Some("reset") => {
                if self.session.reset() {
                    self.set_status("Resetting session...");
                } else {
                    self.set_status("Cannot reset while an upload, message or reset is in flight");
                }
            }
            Some("ts") | Some("timestamps") => self.show_timestamps = !self.show_timestamps,
            Some("clear") => self.clear_status(),
            Some("help") | Some("h") => self.help_visible = !self.help_visible,
            Some(_) => self.set_status(format!("Unknown command: {}", command)),
            None => {}
        }
    }

    /// Short description of the selected files
    pub fn selection_summary(&self) -> String {
        let tests: Vec<String> = self
            .selection
            .test_files
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        let solution = self
            .selection
            .solution_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "Tests: [{}]  Solution: {}",
            tests.join(", "),
            solution
        )
    }

    /// Set status message
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Clear status message
    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Scroll the transcript towards older entries
    pub fn scroll_up(&mut self, amount: u16) {
        let total_lines: usize = self
            .controller()
            .transcript()
            .entries()
            .iter()
            .map(|entry| entry.text.lines().count().max(1) + 1)
            .sum();
        let max_scroll = u16::try_from(total_lines).unwrap_or(u16::MAX);

        self.scroll_offset = self.scroll_offset.saturating_add(amount).min(max_scroll);
    }

    /// Scroll the transcript towards newer entries
    pub fn scroll_down(&mut self, amount: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(amount);
    }

    /// Quit the application
    pub fn quit(&mut self) {
        self.running = false;
    }
}

/// Input mode of the terminal UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Viewing the transcript
    Normal,
    /// Typing a chat message
    Insert,
    /// Entering a `:` command
    Command,
}
