/// Session management module - Gateway

mod controller;
mod driver;
mod state;
mod transcript;

pub use controller::{OutgoingChat, SessionController};
pub use driver::{Session, SessionEvent};
pub use state::{ChatInput, ChatMode, ConnectionState, ResetState, UploadState};
pub use transcript::{sanitize, Entry, EntryKind, Sender, Transcript};
