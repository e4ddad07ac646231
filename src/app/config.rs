use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    CHAT_RESPONSE_TIMEOUT_SECS, DEFAULT_CHANNEL_PATH, DEFAULT_CHAT_PATH, DEFAULT_RESET_PATH,
    DEFAULT_SERVER_URL, DEFAULT_SOLUTION_EXTENSIONS, DEFAULT_TEST_EXTENSIONS, DEFAULT_UPLOAD_PATH,
    HTTP_REQUEST_TIMEOUT_SECS,
};
use crate::session::ChatMode;
use crate::utils::ClientError;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server endpoints
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat behaviour
    #[serde(default)]
    pub chat: ChatConfig,

    /// Upload validation
    #[serde(default)]
    pub upload: UploadConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// UI configuration
    #[serde(default)]
    pub ui: UIConfig,
}

/// Where the server lives and which paths it serves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL, e.g. http://localhost:5000
    pub url: String,
    pub upload_path: String,
    pub chat_path: String,
    pub reset_path: String,
    /// WebSocket path for the event channel
    pub channel_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            reset_path: DEFAULT_RESET_PATH.to_string(),
            channel_path: DEFAULT_CHANNEL_PATH.to_string(),
        }
    }
}

impl ServerConfig {
    /// Join the base URL with an endpoint path
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// WebSocket URL of the event channel (http -> ws, https -> wss)
    pub fn channel_url(&self) -> Result<url::Url, ClientError> {
        let mut url = url::Url::parse(&self.endpoint(&self.channel_path))
            .map_err(|e| ClientError::Config(format!("Invalid server URL {}: {}", self.url, e)))?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(ClientError::Config(format!(
                    "Unsupported URL scheme for channel: {}",
                    other
                )))
            }
        };
        url.set_scheme(scheme).map_err(|_| {
            ClientError::Config(format!("Cannot use scheme {} for {}", scheme, self.url))
        })?;
        Ok(url)
    }
}

/// Chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// channel (readiness-gated, answers pushed) or request (plain POST /chat)
    pub mode: ChatMode,
    /// How long a sent message may wait for an answer
    pub response_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mode: ChatMode::Channel,
            response_timeout_secs: CHAT_RESPONSE_TIMEOUT_SECS,
        }
    }
}

/// Upload validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Allowed extensions for test scans
    pub test_extensions: Vec<String>,
    /// Allowed extensions for the model solution
    pub solution_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            test_extensions: DEFAULT_TEST_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            solution_extensions: DEFAULT_SOLUTION_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    /// Show entry timestamps in the transcript
    pub show_timestamps: bool,
    /// Log file for interactive sessions (defaults to the data dir)
    pub log_file: Option<PathBuf>,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            show_timestamps: false,
            log_file: None,
        }
    }
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    let global_config = get_config_dir()?.join("config.toml");
    let local_config = PathBuf::from(".helferlein/config.toml");
    load_config_from(&[global_config, local_config])
}

/// Layer defaults, the given TOML files (when present) and HELFERLEIN_ env vars
pub fn load_config_from(files: &[PathBuf]) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    for file in files {
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }
    }

    // HELFERLEIN_SERVER__URL=... sets server.url
    figment = figment.merge(Env::prefixed("HELFERLEIN_").split("__"));

    figment
        .extract()
        .context("Failed to load configuration")
}

/// Load configuration from an explicit file, still honoring env overrides
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    load_config_from(&[path.to_path_buf()])
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "helferlein") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("helferlein");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Default location of the interactive log file
pub fn default_log_file() -> Result<PathBuf> {
    match ProjectDirs::from("", "", "helferlein") {
        Some(proj_dirs) => Ok(proj_dirs.data_local_dir().join("helferlein.log")),
        None => Ok(get_config_dir()?.join("helferlein.log")),
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
pub fn init_config() -> Result<PathBuf> {
    let config_file = get_config_dir()?.join("config.toml");

    if !config_file.exists() {
        save_config(&Config::default(), Some(config_file.clone()))?;
        println!("Created default configuration at: {}", config_file.display());
    } else {
        println!("Configuration already exists at: {}", config_file.display());
    }

    Ok(config_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_point_at_local_server() {
        let config = Config::default();
        assert_eq!(config.server.url, "http://localhost:5000");
        assert_eq!(config.chat.mode, ChatMode::Channel);
        assert_eq!(config.upload.test_extensions, vec!["png".to_string()]);
    }

    #[test]
    fn test_endpoint_joins_slashes() {
        let server = ServerConfig {
            url: "http://grader.local:8080/".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(server.endpoint("/upload"), "http://grader.local:8080/upload");
        assert_eq!(server.endpoint("chat"), "http://grader.local:8080/chat");
    }

    #[test]
    fn test_channel_url_switches_scheme() {
        let mut server = ServerConfig::default();
        assert_eq!(server.channel_url().unwrap().as_str(), "ws://localhost:5000/ws");

        server.url = "https://grader.example.org".to_string();
        assert_eq!(
            server.channel_url().unwrap().as_str(),
            "wss://grader.example.org/ws"
        );

        server.url = "ftp://grader.example.org".to_string();
        assert!(matches!(server.channel_url(), Err(ClientError::Config(_))));

        server.url = "not a url".to_string();
        assert!(matches!(server.channel_url(), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
url = "http://10.0.0.7:5000"
upload_path = "/upload"
chat_path = "/chat"
reset_path = "/reset"
channel_path = "/socket"

[chat]
mode = "request"
response_timeout_secs = 30
"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.server.url, "http://10.0.0.7:5000");
        assert_eq!(config.server.channel_path, "/socket");
        assert_eq!(config.chat.mode, ChatMode::Request);
        assert_eq!(config.chat.response_timeout_secs, 30);
        // Untouched sections keep their defaults
        assert_eq!(config.http.request_timeout_secs, HTTP_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_config_file(&temp_dir.path().join("nope.toml")).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let mut config = Config::default();
        config.ui.show_timestamps = true;
        save_config(&config, Some(path.clone())).unwrap();

        let loaded = load_config_file(&path).unwrap();
        assert!(loaded.ui.show_timestamps);
    }
}
