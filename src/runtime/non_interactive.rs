use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    cli::OutputFormat,
    client::UploadBatch,
    session::{Entry, EntryKind, Session, SessionEvent, UploadState},
};

/// Result of a non-interactive run
#[derive(Debug, Serialize)]
pub struct NonInteractiveResult {
    /// The question that was asked
    pub prompt: String,
    /// The server's answer, if one arrived
    pub answer: Option<String>,
    /// Everything shown during the run, in order
    pub transcript: Vec<Entry>,
    /// Error entries and local failures
    pub errors: Vec<String>,
    /// Metadata about the execution
    pub metadata: ExecutionMetadata,
}

#[derive(Debug, Serialize)]
pub struct ExecutionMetadata {
    /// Server base URL
    pub server: String,
    /// Contract used (channel / request)
    pub mode: String,
    /// Number of files submitted
    pub files_uploaded: usize,
    /// Execution time in milliseconds
    pub duration_ms: u128,
}

/// Uploads, waits for readiness, asks one question, collects the answer
pub struct NonInteractiveRunner {
    session: Session,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    server: String,
    timeout: Duration,
}

impl NonInteractiveRunner {
    pub fn new(
        session: Session,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        server: String,
        timeout: Duration,
    ) -> Self {
        Self {
            session,
            events,
            server,
            timeout,
        }
    }

    /// Execute a single prompt against freshly uploaded files
    pub async fn execute(&mut self, batch: UploadBatch, prompt: String) -> Result<NonInteractiveResult> {
        if batch.is_empty() {
            anyhow::bail!("No files to upload; pass --test-file and/or --solution-file");
        }

        let start_time = Instant::now();
        let deadline = tokio::time::Instant::now() + self.timeout;
        let files_uploaded = batch.file_count();
        let mut errors = Vec::new();
        let mut asked_at: Option<usize> = None;

        self.session.submit_upload(batch);

        loop {
            let controller = self.session.controller();
            match asked_at {
                None if controller.can_chat() => {
                    let index = controller.transcript().len();
                    if !self.session.send_chat_message(&prompt) {
                        anyhow::bail!("Prompt is empty");
                    }
                    info!("Files processed, prompt sent");
                    asked_at = Some(index);
                    continue;
                }
                None if controller.upload() == UploadState::Failed => break,
                Some(_) if controller.input().pending_exchange().is_none() => break,
                _ => {}
            }

            let event = match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(_) => {
                    warn!("Gave up waiting after {:?}", self.timeout);
                    errors.push(format!(
                        "Timed out after {}s waiting for the server",
                        self.timeout.as_secs()
                    ));
                    break;
                }
            };

            let channel_lost = matches!(
                event,
                SessionEvent::ChannelDisconnected | SessionEvent::ChannelUnreachable(_)
            );
            self.session.handle(event);
            if channel_lost {
                break;
            }
        }

        let transcript = self.session.controller().transcript();
        let answer = asked_at.and_then(|index| {
            transcript
                .since(index)
                .iter()
                .rev()
                .find(|e| e.kind == EntryKind::Llm)
                .map(|e| e.text.clone())
        });

        let mut all_errors: Vec<String> = transcript
            .entries()
            .iter()
            .filter(|e| e.kind == EntryKind::Error)
            .map(|e| e.text.clone())
            .collect();
        all_errors.append(&mut errors);
        if answer.is_none() && all_errors.is_empty() {
            all_errors.push("No answer received".to_string());
        }

        Ok(NonInteractiveResult {
            prompt,
            answer,
            transcript: transcript.entries().to_vec(),
            errors: all_errors,
            metadata: ExecutionMetadata {
                server: self.server.clone(),
                mode: self.session.controller().mode().display_name().to_string(),
                files_uploaded,
                duration_ms: start_time.elapsed().as_millis(),
            },
        })
    }

    /// Format the result for output
    pub fn format_result(&self, result: &NonInteractiveResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(result)
                .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize result: {}\"}}", e)),
            OutputFormat::Text => {
                let mut output = String::new();
                if let Some(answer) = &result.answer {
                    output.push_str(answer);
                }
                for error in &result.errors {
                    if !output.is_empty() {
                        output.push('\n');
                    }
                    output.push_str(&format!("{} {}", "Error:".red(), error));
                }
                output
            }
            OutputFormat::Markdown => {
                let mut output = String::new();
                output.push_str("## Question\n\n");
                output.push_str(&result.prompt);
                output.push_str("\n\n## Answer\n\n");
                output.push_str(result.answer.as_deref().unwrap_or("_No answer._"));
                output.push('\n');
                if !result.errors.is_empty() {
                    output.push_str("\n## Errors\n\n");
                    for error in &result.errors {
                        output.push_str(&format!("- {}\n", error));
                    }
                }
                output.push_str(&format!(
                    "\n---\n_{} file(s) via {} mode, {}ms_\n",
                    result.metadata.files_uploaded,
                    result.metadata.mode,
                    result.metadata.duration_ms
                ));
                output
            }
        }
    }
}
