use anyhow::Result;
use colored::Colorize;

use crate::{
    app::{get_config_dir, init_config, Config},
    client::probe_server,
    session::ChatMode,
};

use super::Commands;

/// Handle CLI subcommands. Returns true when the command finished the run.
pub async fn handle_command(command: &Commands, config: &Config) -> Result<bool> {
    match command {
        Commands::Init => {
            println!("Initializing Helferlein configuration...");
            init_config()?;
            println!("Configuration initialized successfully!");
            Ok(true)
        }
        Commands::Version => {
            show_version();
            Ok(true)
        }
        Commands::Status => {
            show_status(config).await?;
            Ok(true)
        }
        Commands::Chat => Ok(false), // Continue to chat interface
    }
}

/// Show version information
pub fn show_version() {
    println!("Helferlein v{}", env!("CARGO_PKG_VERSION"));
    println!("   Upload test scans, then chat about them");
}

/// Show server reachability and configuration
async fn show_status(config: &Config) -> Result<()> {
    println!("Helferlein Status:");
    println!();

    match probe_server(&config.server).await {
        Ok(code) if code < 500 => {
            println!("  {} Server: {} (HTTP {})", "[OK]".green(), config.server.url, code)
        }
        Ok(code) => println!(
            "  {} Server: {} answered HTTP {}",
            "[WARNING]".yellow(),
            config.server.url,
            code
        ),
        Err(e) => println!(
            "  {} Server: {} ({})",
            "[ERROR]".red(),
            config.server.url,
            e.user_message()
        ),
    }

    println!("  Mode: {}", config.chat.mode.display_name());
    if config.chat.mode == ChatMode::Channel {
        match config.server.channel_url() {
            Ok(url) => println!("  Channel: {}", url),
            Err(e) => println!("  {} Channel: {}", "[ERROR]".red(), e),
        }
    }
    println!(
        "  Upload types: tests [{}], solution [{}]",
        config.upload.test_extensions.join(", "),
        config.upload.solution_extensions.join(", ")
    );

    let config_path = get_config_dir()?.join("config.toml");
    if config_path.exists() {
        println!("  {} Configuration: {}", "[OK]".green(), config_path.display());
    } else {
        println!(
            "  {} Configuration: Not found (using defaults, run `helferlein init`)",
            "[WARNING]".yellow()
        );
    }

    println!();
    Ok(())
}
