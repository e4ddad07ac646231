/// HTTP side of the server contract - Gateway

mod backend;
mod http;
mod upload;

pub use backend::{Backend, ChatDelivery};
#[cfg(test)]
pub use backend::MockBackend;
pub use http::{probe_server, HttpBackend};
pub use upload::{interpret_chat, interpret_upload, UploadBatch, UploadReply};
