//! `clientbench init` command - write a default configuration file.

use std::path::Path;

use clientbench_core::config::{write_config, BenchConfig};

pub async fn execute(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !force && tokio::fs::try_exists(config_path).await? {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    write_config(&BenchConfig::default(), config_path).await?;
    println!("Wrote default configuration to {}", config_path.display());
    println!("Set bot_token and chat_id (or TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID) before running.");
    Ok(())
}
