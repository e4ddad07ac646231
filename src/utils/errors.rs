use thiserror::Error;

/// Main error type for Helferlein
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Channel disconnected")]
    ChannelDisconnected,

    #[error("Chat failed: {0}")]
    ChatFailed(String),

    #[error("Network error: {0}")]
    NetworkUnreachable(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::NetworkUnreachable(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Protocol(err.to_string())
    }
}

impl ClientError {
    /// Short text shown in the transcript for this error
    pub fn user_message(&self) -> String {
        match self {
            ClientError::UploadFailed(msg)
            | ClientError::InvalidUpload(msg)
            | ClientError::ChatFailed(msg)
            | ClientError::Protocol(msg)
            | ClientError::Config(msg) => msg.clone(),
            ClientError::NetworkUnreachable(msg) => format!("Could not reach server: {}", msg),
            ClientError::ChannelDisconnected => "Not connected to server".to_string(),
            ClientError::Io(err) => err.to_string(),
        }
    }
}
