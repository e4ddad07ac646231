use async_trait::async_trait;

use super::upload::{UploadBatch, UploadReply};
use crate::utils::ClientError;

/// How a chat message left the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatDelivery {
    /// Queued on the channel; the answer arrives later as `llm_response`
    Dispatched,
    /// Request/response contract: the answer came back inline
    Answered(String),
}

/// Network seam between the session and the server
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// POST the batch to the upload endpoint
    async fn upload(&self, batch: UploadBatch) -> Result<UploadReply, ClientError>;

    /// Deliver one chat message
    async fn chat(&self, message: String) -> Result<ChatDelivery, ClientError>;

    /// Drop the server-side session
    async fn reset(&self) -> Result<(), ClientError>;
}
