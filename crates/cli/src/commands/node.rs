//! Peer node registry command.

use super::context::NodeContext;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::Path;
use vaultnode_core::NodeConnectionInfo;

#[derive(Args)]
pub struct NodeArgs {
    #[command(subcommand)]
    command: NodeCommand,
}

#[derive(Subcommand)]
enum NodeCommand {
    /// Register a peer node
    Add {
        /// Peer node ID
        node_id: String,

        /// Base URL of the peer (http:// or https://)
        url: String,
    },
    /// Forget a peer node
    Remove {
        /// Peer node ID
        node_id: String,
    },
    /// List known peer nodes
    List,
}

pub fn run(args: NodeArgs, data_dir: &Path, json: bool) -> Result<()> {
    let ctx = NodeContext::open(data_dir)?;
    match args.command {
        NodeCommand::Add { node_id, url } => add_node(&ctx, node_id, url)?,
        NodeCommand::Remove { node_id } => remove_node(&ctx, &node_id)?,
        NodeCommand::List => list_nodes(&ctx, json)?,
    }
    ctx.close()
}

fn add_node(ctx: &NodeContext, node_id: String, url: String) -> Result<()> {
    let node = NodeConnectionInfo { node_id, url };
    ctx.repository
        .create_node(&node)
        .with_context(|| format!("Failed to add node {}", node.node_id))?;

    println!(
        "{}  Added node {} at {}",
        "✓".green().bold(),
        node.node_id.bright_yellow(),
        node.url.bright_cyan()
    );
    Ok(())
}

fn remove_node(ctx: &NodeContext, node_id: &str) -> Result<()> {
    ctx.repository
        .remove_node(node_id)
        .with_context(|| format!("Failed to remove node {}", node_id))?;

    println!("{}  Removed node {}", "✓".green().bold(), node_id.bright_yellow());
    Ok(())
}

fn list_nodes(ctx: &NodeContext, json: bool) -> Result<()> {
    let nodes = ctx.repository.list_nodes()?;
    if json {
        return super::print_json(&serde_json::to_value(&nodes)?);
    }
    if nodes.is_empty() {
        println!("{}", "No peer nodes registered".yellow());
        return Ok(());
    }

    println!("{}", format!("Peer nodes ({})", nodes.len()).bold().cyan());
    println!();
    for node in nodes {
        println!("  {:<24} {}", node.node_id.bright_yellow(), node.url);
    }
    Ok(())
}
