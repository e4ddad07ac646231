pub mod app;
pub mod channel;
pub mod cli;
pub mod client;
pub mod constants;
pub mod runtime;
pub mod session;
pub mod tui;
pub mod utils;

pub use app::{load_config, Config};
pub use client::{Backend, HttpBackend, UploadBatch};
pub use session::{Session, SessionController, SessionEvent};
pub use tui::run_ui;
pub use utils::ClientError;
