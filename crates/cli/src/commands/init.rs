//! Initialize node command.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::Path;
use vaultnode_chain::NodeConfig;

#[derive(Args)]
pub struct InitArgs {
    /// Keep metadata and chunks in memory (lost when the command exits)
    #[arg(long)]
    memory: bool,

    /// Host advertised in micro-network endpoints
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// First port handed out to micro-networks
    #[arg(long, default_value = "26600")]
    base_port: u16,

    /// Overwrite an existing config.json
    #[arg(long)]
    force: bool,
}

pub fn run(args: InitArgs, data_dir: &Path) -> Result<()> {
    println!("{}", "Initializing vaultnode...".bold().cyan());
    println!();

    let config_file = data_dir.join(NodeConfig::FILE_NAME);
    if config_file.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            config_file.display()
        );
    }

    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
    println!("{}  Created data directory", "✓".green().bold());

    let mut config = if args.memory {
        NodeConfig::in_memory(data_dir.join("networks"))
    } else {
        NodeConfig::for_data_dir(data_dir)
    };
    config.micro_networks.host = args.host;
    config.micro_networks.base_port = args.base_port;

    let repository = config
        .repository
        .open()
        .context("Failed to create metadata repository")?;
    repository.flush()?;
    config
        .backend
        .open()
        .context("Failed to create chunk storage")?;
    fs::create_dir_all(&config.micro_networks.base_dir)?;
    println!("{}  Created metadata and chunk storage", "✓".green().bold());

    config
        .save(&config_file)
        .with_context(|| format!("Failed to write {}", config_file.display()))?;
    println!(
        "{}  Saved config to: {}",
        "✓".green().bold(),
        config_file.display().to_string().bright_black()
    );

    println!();
    println!("{}", "Node initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  • Use {} to register a container",
        "vaultnode container assign".bright_cyan()
    );
    println!(
        "  • Use {} to start its micro-network",
        "vaultnode container create".bright_cyan()
    );
    println!(
        "  • Use {} to store chunks",
        "vaultnode data put".bright_cyan()
    );

    Ok(())
}
