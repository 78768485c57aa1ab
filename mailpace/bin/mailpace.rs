#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use std::path::PathBuf;

use clap::Parser;
use mailpace_common::logging;

/// Send outbox files through a rate-limited transport
#[derive(Parser, Debug)]
#[command(name = "mailpace")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file, overriding `MAILPACE_CONFIG` and the default
    /// locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Outbox files to send, each a RON list of messages
    #[arg(required = true)]
    outbox: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = find_config_file(cli.config)?;
    let config_content = std::fs::read_to_string(&config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to read config from {}: {}",
            config_path.display(),
            e
        )
    })?;
    let mailpace: mailpace::Mailpace = ron::from_str(&config_content)?;

    logging::init();

    mailpace.run(&cli.outbox).await
}

/// Find the configuration file using the following precedence:
/// 1. `--config` on the command line
/// 2. `MAILPACE_CONFIG` environment variable
/// 3. ./mailpace.config.ron (current working directory)
/// 4. /etc/mailpace/mailpace.config.ron (system-wide config)
fn find_config_file(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!("--config points to non-existent file: {}", path.display());
    }

    if let Ok(env_path) = std::env::var("MAILPACE_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!(
            "MAILPACE_CONFIG points to non-existent file: {}",
            path.display()
        );
    }

    let default_paths = [
        PathBuf::from("./mailpace.config.ron"),
        PathBuf::from("/etc/mailpace/mailpace.config.ron"),
    ];

    for path in &default_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - MAILPACE_CONFIG environment variable\n{paths_tried}"
    )
}
