use serde::{Deserialize, Serialize};

/// Lifecycle of the persistent channel to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    /// Server finished processing the upload; chat may start
    Ready,
}

impl ConnectionState {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
            Self::Ready => "Ready",
        }
    }
}

/// Progress of the file upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

impl UploadState {
    /// Whether the user may submit (another) upload
    pub fn accepts_submit(&self) -> bool {
        matches!(self, Self::Idle | Self::Failed)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Idle => "No files",
            Self::InFlight => "Uploading",
            Self::Succeeded => "Uploaded",
            Self::Failed => "Upload failed",
        }
    }
}

/// Server-side session reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetState {
    #[default]
    Idle,
    /// `POST /reset` sent, no outcome yet; uploads and chat wait for it
    InFlight,
}

/// Enablement of the chat input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatInput {
    #[default]
    Locked,
    Open,
    /// A message is in flight; the id identifies the exchange
    Pending(u64),
}

impl ChatInput {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn pending_exchange(&self) -> Option<u64> {
        match self {
            Self::Pending(id) => Some(*id),
            _ => None,
        }
    }
}

/// Which server contract the client speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Readiness is pushed on the channel; answers arrive as channel events
    #[default]
    Channel,
    /// No channel; upload success means ready, /chat answers inline
    Request,
}

impl ChatMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "channel" | "ws" | "websocket" => Some(Self::Channel),
            "request" | "http" => Some(Self::Request),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Request => "request",
        }
    }
}
