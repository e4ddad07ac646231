/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_UPLOAD_PATH: &str = "/upload";
pub const DEFAULT_CHAT_PATH: &str = "/chat";
pub const DEFAULT_RESET_PATH: &str = "/reset";
pub const DEFAULT_CHANNEL_PATH: &str = "/ws";

// Multipart field names expected by the upload endpoint
pub const TEST_FILES_FIELD: &str = "test_files";
pub const SOLUTION_FILE_FIELD: &str = "solution_file";

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 300; // OCR + LLM processing on upload is slow
pub const CHAT_RESPONSE_TIMEOUT_SECS: u64 = 120;
pub const STATUS_PROBE_TIMEOUT_MS: u64 = 1500;
pub const NON_INTERACTIVE_TIMEOUT_SECS: u64 = 900;

// UI Configuration
pub const UI_REFRESH_INTERVAL_MS: u64 = 50;
pub const UI_SCROLL_LINES: u16 = 3;
pub const UI_PAGE_SCROLL_LINES: u16 = 10;

// Upload allow-lists (lowercase, no dot)
pub const DEFAULT_TEST_EXTENSIONS: &[&str] = &["png"];
pub const DEFAULT_SOLUTION_EXTENSIONS: &[&str] = &["png", "txt", "md"];

// Transcript texts
pub const WELCOME_TEXT: &str = "Please upload test and solution files (:test, :solution, :upload).";
pub const UPLOAD_SUCCESS_FALLBACK: &str = "Files processed successfully.";
pub const READY_FALLBACK: &str = "Server is ready.";
pub const DISCONNECTED_TEXT: &str = "Disconnected from server. Please restart or try again.";
