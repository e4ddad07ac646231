// Gateway module for TUI
// All external access goes through these re-exports

mod app;
mod render;
mod ui;

pub use app::{App, AppState};
pub use ui::run_ui;
