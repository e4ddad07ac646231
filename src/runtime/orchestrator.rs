use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{
    app::{default_log_file, load_config, load_config_file, Config},
    channel::spawn_channel,
    cli::{handle_command, Cli},
    client::{HttpBackend, UploadBatch},
    session::{ChatMode, Session, SessionEvent},
    tui::{run_ui, App},
    utils::{init_file_logger, log_progress},
};

/// A wired-up session plus the queue its events arrive on
pub struct SessionHandle {
    pub session: Session,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    /// Background channel task (channel mode only)
    pub channel_task: Option<JoinHandle<()>>,
}

/// Resolve configuration: explicit file or layered sources, then CLI overrides
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => match load_config() {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("⚠️  Failed to load config: {}. Using defaults.", e);
                Config::default()
            }
        },
    };

    if let Some(server) = &cli.server {
        config.server.url = server.clone();
    }
    if let Some(mode) = cli.mode {
        config.chat.mode = mode;
    }
    Ok(config)
}

/// Build the backend, open the channel when the contract needs one, and
/// hand back a session ready for events
pub fn start_session(config: &Config) -> Result<SessionHandle> {
    let (tx, rx) = mpsc::unbounded_channel();

    let (channel, channel_task) = match config.chat.mode {
        ChatMode::Channel => {
            let url = config.server.channel_url()?;
            let (handle, task) = spawn_channel(url, tx.clone());
            (Some(handle), Some(task))
        }
        ChatMode::Request => (None, None),
    };

    let backend = HttpBackend::new(config, channel).context("Failed to build HTTP client")?;
    let session = Session::new(
        config.chat.mode,
        Arc::new(backend),
        tx,
        config.upload.clone(),
        Duration::from_secs(config.chat.response_timeout_secs),
    );

    Ok(SessionHandle {
        session,
        events: rx,
        channel_task,
    })
}

/// Main runtime orchestrator
pub struct Orchestrator {
    cli: Cli,
    config: Config,
}

impl Orchestrator {
    /// Create a new orchestrator from CLI args
    pub fn new(cli: Cli) -> Result<Self> {
        let config = resolve_config(&cli)?;
        Ok(Self { cli, config })
    }

    /// Run the orchestrator
    pub async fn run(self) -> Result<()> {
        // Handle subcommands
        if let Some(command) = &self.cli.command {
            if handle_command(command, &self.config).await? {
                return Ok(()); // Command handled, exit
            }
            // Continue to chat for Commands::Chat
        }

        let log_file = match self.cli.log_file.clone().or(self.config.ui.log_file.clone()) {
            Some(path) => path,
            None => default_log_file()?,
        };
        init_file_logger(&log_file, self.cli.verbose)?;
        log_progress(1, 3, format!("Logging to {}", log_file.display()));

        log_progress(
            2,
            3,
            format!(
                "Connecting to {} ({} mode)",
                self.config.server.url.green(),
                self.config.chat.mode.display_name()
            ),
        );
        let SessionHandle {
            session,
            events,
            channel_task,
        } = start_session(&self.config)?;

        let batch = UploadBatch::new(self.cli.test_files.clone(), self.cli.solution_file.clone());
        let mut app = App::new(session, &self.config, batch);
        log_progress(3, 3, "Starting interface");
        if self.cli.upload {
            app.submit_upload();
        }

        let result = run_ui(app, events).await;

        if let Some(task) = channel_task {
            task.abort();
        }

        result
    }
}
