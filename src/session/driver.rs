use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::controller::SessionController;
use super::state::ChatMode;
use crate::app::UploadConfig;
use crate::client::{Backend, ChatDelivery, UploadBatch, UploadReply};
use crate::utils::ClientError;

/// Everything that can happen to a session from the outside
#[derive(Debug)]
pub enum SessionEvent {
    ChannelConnected,
    ChannelDisconnected,
    ChannelUnreachable(String),
    ConnectionReady { message: String },
    LlmResponse { answer: String },
    ServerError { message: String },
    UploadFinished(Result<UploadReply, ClientError>),
    ChatFinished {
        exchange: u64,
        result: Result<ChatDelivery, ClientError>,
    },
    ChatTimedOut { exchange: u64 },
    ResetFinished(Result<(), ClientError>),
}

/// Runs the controller against a backend.
///
/// Network calls are spawned; their outcomes come back through the event
/// queue and are applied by `handle` in arrival order.
pub struct Session {
    controller: SessionController,
    backend: Arc<dyn Backend>,
    events: mpsc::UnboundedSender<SessionEvent>,
    upload_rules: UploadConfig,
    response_timeout: Duration,
}

impl Session {
    pub fn new(
        mode: ChatMode,
        backend: Arc<dyn Backend>,
        events: mpsc::UnboundedSender<SessionEvent>,
        upload_rules: UploadConfig,
        response_timeout: Duration,
    ) -> Self {
        Self {
            controller: SessionController::new(mode),
            backend,
            events,
            upload_rules,
            response_timeout,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Submit files to the upload endpoint. Returns false if the upload
    /// control is currently disabled.
    pub fn submit_upload(&mut self, batch: UploadBatch) -> bool {
        if !self.controller.begin_upload() {
            return false;
        }

        if let Err(err) = batch.validate(&self.upload_rules) {
            self.controller.on_upload_result(Err(err));
            return true;
        }

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.upload(batch).await;
            let _ = events.send(SessionEvent::UploadFinished(result));
        });
        true
    }

    /// Send a chat message. Returns false when nothing was sent.
    pub fn send_chat_message(&mut self, text: &str) -> bool {
        let Some(outgoing) = self.controller.send_chat_message(text) else {
            return false;
        };
        let exchange = outgoing.exchange;

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.chat(outgoing.message).await;
            let _ = events.send(SessionEvent::ChatFinished { exchange, result });
        });

        if !self.response_timeout.is_zero() {
            let events = self.events.clone();
            let timeout = self.response_timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                let _ = events.send(SessionEvent::ChatTimedOut { exchange });
            });
        }
        true
    }

    /// Ask the server to drop the session. Returns false while work is in flight.
    pub fn reset(&mut self) -> bool {
        if !self.controller.begin_reset() {
            return false;
        }
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.reset().await;
            let _ = events.send(SessionEvent::ResetFinished(result));
        });
        true
    }

    /// Apply one event to the controller
    pub fn handle(&mut self, event: SessionEvent) {
        debug!("Session event: {:?}", event);
        match event {
            SessionEvent::ChannelConnected => self.controller.on_channel_connect(),
            SessionEvent::ChannelDisconnected => self.controller.on_channel_disconnect(),
            SessionEvent::ChannelUnreachable(reason) => {
                self.controller.on_channel_unreachable(&reason)
            }
            SessionEvent::ConnectionReady { message } => self.controller.on_ready_signal(&message),
            SessionEvent::LlmResponse { answer } => self.controller.on_chat_response(&answer),
            SessionEvent::ServerError { message } => self.controller.on_chat_error(&message),
            SessionEvent::UploadFinished(result) => self.controller.on_upload_result(result),
            SessionEvent::ChatFinished { exchange, result } => match result {
                Ok(ChatDelivery::Dispatched) => {}
                Ok(ChatDelivery::Answered(answer)) => {
                    self.controller.on_exchange_answer(exchange, &answer)
                }
                Err(err) => self.controller.on_exchange_failed(exchange, &err),
            },
            SessionEvent::ChatTimedOut { exchange } => self
                .controller
                .on_chat_timeout(exchange, self.response_timeout.as_secs()),
            SessionEvent::ResetFinished(result) => self.controller.on_reset_result(result),
        }
    }
}
