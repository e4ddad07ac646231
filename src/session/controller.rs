use tracing::{debug, info, warn};

use super::state::{ChatInput, ChatMode, ConnectionState, ResetState, UploadState};
use super::transcript::{EntryKind, Sender, Transcript};
use crate::client::UploadReply;
use crate::constants::{
    DISCONNECTED_TEXT, READY_FALLBACK, UPLOAD_SUCCESS_FALLBACK, WELCOME_TEXT,
};
use crate::utils::ClientError;

/// A chat message the controller accepted and wants dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingChat {
    pub exchange: u64,
    pub message: String,
}

/// Client-side state machine for upload-gated chat.
///
/// Holds no I/O: every network outcome is fed back in through one of the
/// `on_*` handlers, in the order it was observed.
#[derive(Debug)]
pub struct SessionController {
    mode: ChatMode,
    connection: ConnectionState,
    upload: UploadState,
    input: ChatInput,
    transcript: Transcript,
    reset: ResetState,
    next_exchange: u64,
    /// Channel replies still owed to exchanges that already timed out
    stale_replies: u32,
}

impl SessionController {
    pub fn new(mode: ChatMode) -> Self {
        // Request mode has no channel; plain HTTP is "connected" from the start
        let connection = match mode {
            ChatMode::Channel => ConnectionState::Disconnected,
            ChatMode::Request => ConnectionState::Connected,
        };

        let mut transcript = Transcript::new();
        transcript.push(Sender::System, WELCOME_TEXT, EntryKind::System);

        Self {
            mode,
            connection,
            upload: UploadState::Idle,
            input: ChatInput::Locked,
            transcript,
            reset: ResetState::Idle,
            next_exchange: 1,
            stale_replies: 0,
        }
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn upload(&self) -> UploadState {
        self.upload
    }

    pub fn input(&self) -> ChatInput {
        self.input
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn reset_state(&self) -> ResetState {
        self.reset
    }

    /// Upload control is actionable
    pub fn can_upload(&self) -> bool {
        self.reset == ResetState::Idle && self.upload.accepts_submit()
    }

    /// Chat input accepts a message right now
    pub fn can_chat(&self) -> bool {
        self.reset == ResetState::Idle
            && self.connection == ConnectionState::Ready
            && self.input.is_open()
    }

    /// Nothing in flight that a reset would orphan
    pub fn can_reset(&self) -> bool {
        self.reset == ResetState::Idle
            && self.upload != UploadState::InFlight
            && self.input.pending_exchange().is_none()
    }

    /// Mark an upload as started. Returns false when the control is disabled.
    pub fn begin_upload(&mut self) -> bool {
        if !self.can_upload() {
            debug!(
                "Upload ignored: state is {:?}, reset {:?}",
                self.upload, self.reset
            );
            return false;
        }
        self.upload = UploadState::InFlight;
        true
    }

    /// Apply the outcome of an upload started with `begin_upload`
    pub fn on_upload_result(&mut self, result: Result<UploadReply, ClientError>) {
        match result {
            Ok(reply) => {
                self.upload = UploadState::Succeeded;
                let message = reply
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| UPLOAD_SUCCESS_FALLBACK.to_string());
                info!("Upload succeeded: {}", message);
                self.transcript.push(Sender::System, &message, EntryKind::System);

                // The request contract has no readiness event: success is the signal
                if self.mode == ChatMode::Request {
                    self.become_ready();
                }
            }
            Err(err) => {
                warn!("Upload failed: {}", err);
                self.upload = UploadState::Failed;
                self.transcript.push(
                    Sender::Error,
                    &format!("File upload/processing failed: {}", err.user_message()),
                    EntryKind::Error,
                );
            }
        }
    }

    pub fn on_channel_connect(&mut self) {
        info!("Channel connected");
        self.connection = ConnectionState::Connected;
        self.transcript
            .push(Sender::System, "Connected to server.", EntryKind::System);
    }

    pub fn on_channel_disconnect(&mut self) {
        info!("Channel disconnected");
        self.connection = ConnectionState::Disconnected;
        self.input = ChatInput::Locked;
        self.stale_replies = 0;
        self.transcript
            .push(Sender::System, DISCONNECTED_TEXT, EntryKind::Error);
    }

    /// The channel could not be opened at all
    pub fn on_channel_unreachable(&mut self, reason: &str) {
        warn!("Channel unreachable: {}", reason);
        self.connection = ConnectionState::Disconnected;
        self.input = ChatInput::Locked;
        self.transcript.push(
            Sender::Error,
            &format!("Could not reach server: {}", reason),
            EntryKind::Error,
        );
    }

    pub fn on_ready_signal(&mut self, message: &str) {
        if self.connection == ConnectionState::Disconnected {
            warn!("Readiness signal while disconnected, ignoring");
            return;
        }
        if self.upload != UploadState::Succeeded {
            debug!("Readiness signal with upload state {:?}", self.upload);
        }

        let text = if message.trim().is_empty() {
            READY_FALLBACK
        } else {
            message
        };
        self.transcript.push(Sender::System, text, EntryKind::System);
        self.become_ready();
    }

    fn become_ready(&mut self) {
        self.connection = ConnectionState::Ready;
        // A pending exchange keeps the input closed until its answer arrives
        if self.input == ChatInput::Locked {
            self.input = ChatInput::Open;
        }
    }

    /// Accept a chat message for dispatch.
    ///
    /// Returns `None` (and changes nothing) for blank text or when chat is
    /// not available.
    pub fn send_chat_message(&mut self, text: &str) -> Option<OutgoingChat> {
        let message = text.trim();
        if message.is_empty() || !self.can_chat() {
            debug!("Cannot send: not ready or empty message");
            return None;
        }

        let exchange = self.next_exchange;
        self.next_exchange += 1;

        self.transcript.push(Sender::You, message, EntryKind::User);
        self.input = ChatInput::Pending(exchange);

        Some(OutgoingChat {
            exchange,
            message: message.to_string(),
        })
    }

    /// Answer pushed on the channel. Replies owed to timed-out exchanges
    /// are shown but leave the current exchange pending.
    pub fn on_chat_response(&mut self, answer: &str) {
        self.transcript.push(Sender::Llm, answer, EntryKind::Llm);
        if self.take_stale_reply() {
            return;
        }
        self.release_input();
    }

    /// Error pushed on the channel
    pub fn on_chat_error(&mut self, message: &str) {
        self.push_server_error(message);
        if self.take_stale_reply() {
            return;
        }
        self.release_input();
    }

    fn take_stale_reply(&mut self) -> bool {
        if self.stale_replies == 0 {
            return false;
        }
        self.stale_replies -= 1;
        debug!("Late channel reply, {} still owed", self.stale_replies);
        true
    }

    fn push_server_error(&mut self, message: &str) {
        self.transcript.push(
            Sender::Error,
            &format!("Server Error: {}", message),
            EntryKind::Error,
        );
    }

    fn fail_pending(&mut self, message: &str) {
        self.push_server_error(message);
        self.release_input();
    }

    /// Answer delivered for a specific exchange (request contract)
    pub fn on_exchange_answer(&mut self, exchange: u64, answer: &str) {
        if self.input.pending_exchange() == Some(exchange) {
            self.transcript.push(Sender::Llm, answer, EntryKind::Llm);
            self.release_input();
        } else {
            // Late answer after a timeout: show it, leave the input alone
            debug!("Late answer for exchange {}", exchange);
            self.transcript.push(Sender::Llm, answer, EntryKind::Llm);
        }
    }

    /// Dispatch or request failure for a specific exchange
    pub fn on_exchange_failed(&mut self, exchange: u64, err: &ClientError) {
        if self.input.pending_exchange() == Some(exchange) {
            self.fail_pending(&err.user_message());
        } else {
            debug!("Dropping failure of stale exchange {}: {}", exchange, err);
        }
    }

    pub fn on_chat_timeout(&mut self, exchange: u64, after_secs: u64) {
        if self.input.pending_exchange() == Some(exchange) {
            warn!("Exchange {} timed out after {}s", exchange, after_secs);
            // The server may still answer on the channel
            if self.mode == ChatMode::Channel {
                self.stale_replies += 1;
            }
            self.fail_pending(&format!("no response within {}s", after_secs));
        }
    }

    fn release_input(&mut self) {
        // Disconnect keeps chat locked until restart
        self.input = if self.connection == ConnectionState::Ready {
            ChatInput::Open
        } else {
            ChatInput::Locked
        };
    }

    /// Mark a reset as started. Returns false while anything is in flight.
    pub fn begin_reset(&mut self) -> bool {
        if !self.can_reset() {
            debug!("Reset ignored: something is in flight");
            return false;
        }
        self.reset = ResetState::InFlight;
        true
    }

    pub fn on_reset_result(&mut self, result: Result<(), ClientError>) {
        self.reset = ResetState::Idle;
        match result {
            Ok(()) => {
                info!("Server session reset");
                self.transcript.restart();
                self.transcript
                    .push(Sender::System, WELCOME_TEXT, EntryKind::System);
                self.upload = UploadState::Idle;
                if self.connection == ConnectionState::Ready {
                    self.connection = ConnectionState::Connected;
                }
                self.input = ChatInput::Locked;
            }
            Err(err) => {
                warn!("Reset failed: {}", err);
                self.transcript.push(
                    Sender::Error,
                    &format!("Reset failed: {}", err.user_message()),
                    EntryKind::Error,
                );
            }
        }
    }

    /// One-line summary for the status bar
    pub fn status_line(&self) -> &'static str {
        if self.reset == ResetState::InFlight {
            return "Resetting session...";
        }
        if self.upload == UploadState::InFlight {
            return "Uploading and processing...";
        }
        match self.connection {
            ConnectionState::Disconnected => "Disconnected. Restart may be needed.",
            ConnectionState::Ready => {
                if self.input.pending_exchange().is_some() {
                    "Waiting for response..."
                } else {
                    "Ready to chat!"
                }
            }
            ConnectionState::Connected => match self.upload {
                UploadState::Succeeded => "Files processed. Waiting for server...",
                UploadState::Failed => "Upload failed. Please try again.",
                _ => "Connected. Please upload files.",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reply(message: &str) -> UploadReply {
        UploadReply {
            message: Some(message.to_string()),
        }
    }

    fn ready_controller() -> SessionController {
        let mut controller = SessionController::new(ChatMode::Channel);
        controller.on_channel_connect();
        assert!(controller.begin_upload());
        controller.on_upload_result(Ok(reply("Files uploaded and processed.")));
        controller.on_ready_signal("Ready");
        controller
    }

    #[test]
    fn test_starts_with_welcome_and_locked_input() {
        let controller = SessionController::new(ChatMode::Channel);
        assert_eq!(controller.connection(), ConnectionState::Disconnected);
        assert_eq!(controller.input(), ChatInput::Locked);
        assert_eq!(controller.transcript().len(), 1);
        assert!(controller.can_upload());
    }

    #[test]
    fn test_upload_then_ready_enables_input_once() {
        let mut controller = SessionController::new(ChatMode::Channel);
        controller.on_channel_connect();
        let before = controller.transcript().len();

        assert!(controller.begin_upload());
        assert!(!controller.can_upload());
        assert_eq!(controller.status_line(), "Uploading and processing...");

        controller.on_upload_result(Ok(reply("2 files processed")));
        assert_eq!(controller.upload(), UploadState::Succeeded);
        assert_eq!(controller.transcript().len(), before + 1);
        let entry = controller.transcript().last().unwrap();
        assert_eq!(entry.kind, EntryKind::System);
        assert!(entry.text.contains("2 files processed"));
        // Still waiting for the server
        assert!(!controller.can_chat());

        controller.on_ready_signal("Ready");
        assert_eq!(controller.connection(), ConnectionState::Ready);
        assert!(controller.can_chat());
        assert_eq!(controller.transcript().last().unwrap().text, "Ready");

        // A second readiness does not change enablement
        let outgoing = controller.send_chat_message("hi").unwrap();
        controller.on_ready_signal("Ready again");
        assert_eq!(controller.input(), ChatInput::Pending(outgoing.exchange));
    }

    #[test]
    fn test_send_appends_user_entry_and_locks() {
        let mut controller = ready_controller();
        let before = controller.transcript().len();

        let outgoing = controller.send_chat_message("  What is X?  ").unwrap();
        assert_eq!(outgoing.message, "What is X?");
        assert_eq!(controller.transcript().len(), before + 1);
        let entry = controller.transcript().last().unwrap();
        assert_eq!(entry.sender, Sender::You);
        assert_eq!(entry.text, "What is X?");
        assert_eq!(controller.input(), ChatInput::Pending(outgoing.exchange));
        assert!(!controller.can_chat());

        // No second message while pending
        assert!(controller.send_chat_message("again").is_none());

        controller.on_chat_response("X is...");
        let entry = controller.transcript().last().unwrap();
        assert_eq!(entry.sender, Sender::Llm);
        assert_eq!(entry.text, "X is...");
        assert!(controller.can_chat());
    }

    #[test]
    fn test_blank_messages_are_noops() {
        let mut controller = ready_controller();
        let before = controller.transcript().len();

        for text in ["", " ", "\t", "\n  \n", "\u{3000}"] {
            assert!(controller.send_chat_message(text).is_none(), "{:?}", text);
        }
        assert_eq!(controller.transcript().len(), before);
        assert!(controller.can_chat());
    }

    #[test]
    fn test_send_requires_ready() {
        let mut controller = SessionController::new(ChatMode::Channel);
        assert!(controller.send_chat_message("hello").is_none());
        controller.on_channel_connect();
        assert!(controller.send_chat_message("hello").is_none());
        assert_eq!(controller.transcript().len(), 2);
    }

    #[test]
    fn test_disconnect_always_locks() {
        // From ready
        let mut controller = ready_controller();
        controller.on_channel_disconnect();
        assert_eq!(controller.connection(), ConnectionState::Disconnected);
        assert_eq!(controller.input(), ChatInput::Locked);

        // From pending
        let mut controller = ready_controller();
        controller.send_chat_message("question").unwrap();
        controller.on_channel_disconnect();
        assert_eq!(controller.input(), ChatInput::Locked);
        let entry = controller.transcript().last().unwrap();
        assert_eq!(entry.kind, EntryKind::Error);

        // Late answer after disconnect keeps input locked
        controller.on_chat_response("late");
        assert_eq!(controller.input(), ChatInput::Locked);

        // From never connected
        let mut controller = SessionController::new(ChatMode::Channel);
        controller.on_channel_disconnect();
        assert_eq!(controller.input(), ChatInput::Locked);
    }

    #[test]
    fn test_ready_ignored_while_disconnected() {
        let mut controller = SessionController::new(ChatMode::Channel);
        controller.on_ready_signal("Ready");
        assert_eq!(controller.connection(), ConnectionState::Disconnected);
        assert!(!controller.can_chat());
    }

    #[test]
    fn test_upload_failure_reenables_control() {
        let mut controller = SessionController::new(ChatMode::Channel);
        controller.on_channel_connect();
        assert!(controller.begin_upload());
        controller.on_upload_result(Err(ClientError::UploadFailed("HTTP 500".to_string())));

        assert_eq!(controller.upload(), UploadState::Failed);
        assert!(controller.can_upload());
        assert_eq!(controller.connection(), ConnectionState::Connected);
        let entry = controller.transcript().last().unwrap();
        assert_eq!(entry.kind, EntryKind::Error);
        assert!(entry.text.contains("HTTP 500"));
    }

    #[test]
    fn test_second_upload_blocked_after_success() {
        let mut controller = ready_controller();
        assert!(!controller.begin_upload());
        assert_eq!(controller.upload(), UploadState::Succeeded);
    }

    #[test]
    fn test_chat_error_reopens_input() {
        let mut controller = ready_controller();
        controller.send_chat_message("question").unwrap();
        controller.on_chat_error("Failed to get response from LLM.");
        let entry = controller.transcript().last().unwrap();
        assert_eq!(entry.text, "Server Error: Failed to get response from LLM.");
        assert!(controller.can_chat());
    }

    #[test]
    fn test_timeout_only_hits_matching_exchange() {
        let mut controller = ready_controller();
        let first = controller.send_chat_message("one").unwrap();
        controller.on_chat_response("answer one");
        let second = controller.send_chat_message("two").unwrap();

        let before = controller.transcript().len();
        controller.on_chat_timeout(first.exchange, 120);
        assert_eq!(controller.transcript().len(), before);
        assert_eq!(controller.input(), ChatInput::Pending(second.exchange));

        controller.on_chat_timeout(second.exchange, 120);
        assert!(controller.can_chat());
        assert!(controller.transcript().last().unwrap().text.contains("120s"));
    }

    #[test]
    fn test_late_answer_does_not_touch_newer_exchange() {
        let mut controller = SessionController::new(ChatMode::Request);
        controller.begin_upload();
        controller.on_upload_result(Ok(reply("ok")));
        let first = controller.send_chat_message("one").unwrap();
        controller.on_chat_timeout(first.exchange, 5);
        let second = controller.send_chat_message("two").unwrap();

        controller.on_exchange_answer(first.exchange, "late one");
        assert_eq!(controller.input(), ChatInput::Pending(second.exchange));
        assert_eq!(controller.transcript().last().unwrap().text, "late one");

        controller.on_exchange_failed(first.exchange, &ClientError::ChannelDisconnected);
        assert_eq!(controller.input(), ChatInput::Pending(second.exchange));

        controller.on_exchange_answer(second.exchange, "two answered");
        assert!(controller.can_chat());
    }

    #[test]
    fn test_request_mode_upload_is_readiness() {
        let mut controller = SessionController::new(ChatMode::Request);
        assert_eq!(controller.connection(), ConnectionState::Connected);
        let before = controller.transcript().len();

        controller.begin_upload();
        controller.on_upload_result(Ok(reply("Files uploaded and processed.")));
        assert_eq!(controller.transcript().len(), before + 1);
        assert_eq!(controller.connection(), ConnectionState::Ready);
        assert!(controller.can_chat());
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut controller = ready_controller();
        assert!(controller.begin_reset());
        assert_eq!(controller.status_line(), "Resetting session...");
        controller.on_reset_result(Ok(()));
        assert_eq!(controller.reset_state(), ResetState::Idle);

        assert_eq!(controller.upload(), UploadState::Idle);
        assert_eq!(controller.connection(), ConnectionState::Connected);
        assert_eq!(controller.input(), ChatInput::Locked);
        assert_eq!(controller.transcript().len(), 1);
        assert!(controller.can_upload());
    }

    #[test]
    fn test_reset_in_flight_gates_everything() {
        let mut controller = SessionController::new(ChatMode::Channel);
        controller.on_channel_connect();
        controller.begin_upload();
        controller.on_upload_result(Err(ClientError::UploadFailed("HTTP 500".to_string())));
        controller.on_ready_signal("Ready");
        assert!(controller.can_upload());
        assert!(controller.can_chat());

        assert!(controller.begin_reset());
        assert!(!controller.begin_reset());
        assert!(!controller.begin_upload());
        assert!(controller.send_chat_message("hello").is_none());
        assert_eq!(controller.upload(), UploadState::Failed);

        controller.on_reset_result(Err(ClientError::NetworkUnreachable("refused".to_string())));
        assert!(controller.can_upload());
        assert!(controller.can_chat());
    }

    #[test]
    fn test_late_channel_answer_keeps_newer_exchange_pending() {
        let mut controller = ready_controller();
        let first = controller.send_chat_message("one").unwrap();
        controller.on_chat_timeout(first.exchange, 120);
        let second = controller.send_chat_message("two").unwrap();

        controller.on_chat_response("late answer to one");
        assert_eq!(controller.transcript().last().unwrap().text, "late answer to one");
        assert_eq!(controller.input(), ChatInput::Pending(second.exchange));
        assert!(controller.send_chat_message("three").is_none());

        controller.on_chat_response("answer to two");
        assert!(controller.can_chat());
    }

    #[test]
    fn test_late_channel_error_keeps_newer_exchange_pending() {
        let mut controller = ready_controller();
        let first = controller.send_chat_message("one").unwrap();
        controller.on_chat_timeout(first.exchange, 120);
        let second = controller.send_chat_message("two").unwrap();

        controller.on_chat_error("LLM failed");
        assert_eq!(controller.transcript().last().unwrap().kind, EntryKind::Error);
        assert_eq!(controller.input(), ChatInput::Pending(second.exchange));
    }

    #[test]
    fn test_failed_reset_keeps_state() {
        let mut controller = ready_controller();
        controller.on_reset_result(Err(ClientError::NetworkUnreachable("refused".to_string())));
        assert_eq!(controller.connection(), ConnectionState::Ready);
        assert!(controller
            .transcript()
            .last()
            .unwrap()
            .text
            .starts_with("Reset failed"));
    }

    #[test]
    fn test_status_line_follows_state() {
        let mut controller = SessionController::new(ChatMode::Channel);
        assert_eq!(controller.status_line(), "Disconnected. Restart may be needed.");
        controller.on_channel_connect();
        assert_eq!(controller.status_line(), "Connected. Please upload files.");
        controller.begin_upload();
        controller.on_upload_result(Ok(reply("ok")));
        assert_eq!(controller.status_line(), "Files processed. Waiting for server...");
        controller.on_ready_signal("");
        assert_eq!(controller.status_line(), "Ready to chat!");
        assert_eq!(controller.transcript().last().unwrap().text, READY_FALLBACK);
    }
}
