use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::backend::{Backend, ChatDelivery};
use super::upload::{interpret_chat, interpret_upload, UploadBatch, UploadReply};
use crate::app::{Config, ServerConfig};
use crate::channel::{ChannelHandle, ClientEvent};
use crate::constants::{SOLUTION_FILE_FIELD, STATUS_PROBE_TIMEOUT_MS, TEST_FILES_FIELD};
use crate::session::ChatMode;
use crate::utils::ClientError;

/// reqwest-backed implementation of the server contract
pub struct HttpBackend {
    client: Client,
    server: ServerConfig,
    mode: ChatMode,
    channel: Option<ChannelHandle>,
}

impl HttpBackend {
    /// Create a backend. `channel` carries chat messages in channel mode.
    pub fn new(config: &Config, channel: Option<ChannelHandle>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            server: config.server.clone(),
            mode: config.chat.mode,
            channel,
        })
    }

    async fn build_form(batch: &UploadBatch) -> Result<Form, ClientError> {
        let mut form = Form::new();
        for path in &batch.test_files {
            form = form.part(TEST_FILES_FIELD, file_part(path).await?);
        }
        if let Some(path) = &batch.solution_file {
            form = form.part(SOLUTION_FILE_FIELD, file_part(path).await?);
        }
        Ok(form)
    }
}

async fn file_part(path: &Path) -> Result<Part, ClientError> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Part::bytes(bytes).file_name(name))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn upload(&self, batch: UploadBatch) -> Result<UploadReply, ClientError> {
        let url = self.server.endpoint(&self.server.upload_path);
        info!("Uploading {} file(s) to {}", batch.file_count(), url);

        let form = Self::build_form(&batch).await?;
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("Upload response HTTP {}: {}", status, body);

        interpret_upload(status, &body)
    }

    async fn chat(&self, message: String) -> Result<ChatDelivery, ClientError> {
        match self.mode {
            ChatMode::Channel => {
                let channel = self
                    .channel
                    .as_ref()
                    .ok_or(ClientError::ChannelDisconnected)?;
                channel.send(ClientEvent::ChatMessage { message })?;
                Ok(ChatDelivery::Dispatched)
            }
            ChatMode::Request => {
                let url = self.server.endpoint(&self.server.chat_path);
                let response = self
                    .client
                    .post(&url)
                    .json(&json!({ "message": message }))
                    .send()
                    .await
                    .map_err(|e| ClientError::ChatFailed(format!("network error: {}", e)))?;
                let status = response.status().as_u16();
                let body = response.text().await?;
                debug!("Chat response HTTP {}: {}", status, body);

                interpret_chat(status, &body).map(ChatDelivery::Answered)
            }
        }
    }

    async fn reset(&self) -> Result<(), ClientError> {
        let url = self.server.endpoint(&self.server.reset_path);
        let response = self.client.post(&url).send().await?;
        let status = response.status();

        // The server answers a reset with a redirect to its index page
        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            Err(ClientError::Protocol(format!(
                "reset returned HTTP {}",
                status.as_u16()
            )))
        }
    }
}

/// Check whether the server answers at all (used by `status`)
pub async fn probe_server(server: &ServerConfig) -> Result<u16, ClientError> {
    let client = Client::builder()
        .timeout(Duration::from_millis(STATUS_PROBE_TIMEOUT_MS))
        .build()?;
    let response = client.get(server.endpoint("/")).send().await?;
    Ok(response.status().as_u16())
}
