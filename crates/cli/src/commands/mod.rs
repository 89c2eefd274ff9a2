//! CLI commands module.

use anyhow::Result;
use serde_json::Value;
use clap::Subcommand;
use std::path::Path;

mod challenge;
mod container;
mod context;
mod data;
mod init;
mod node;

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new node
    Init(init::InitArgs),
    /// Container lifecycle
    Container(container::ContainerArgs),
    /// Peer storage nodes
    Node(node::NodeArgs),
    /// Chunk storage
    Data(data::DataArgs),
    /// Proof-of-storage challenges
    Challenge(challenge::ChallengeArgs),
}

pub async fn run(cmd: Commands, data_dir: &Path, json: bool) -> Result<()> {
    match cmd {
        Commands::Init(args) => init::run(args, data_dir),
        Commands::Container(args) => container::run(args, data_dir, json).await,
        Commands::Node(args) => node::run(args, data_dir, json),
        Commands::Data(args) => data::run(args, data_dir, json),
        Commands::Challenge(args) => challenge::run(args, data_dir, json),
    }
}

/// Write `value` to stdout for `--json`.
fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
