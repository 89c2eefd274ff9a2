//! Container lifecycle command.

use super::context::NodeContext;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Args, Subcommand};
use colored::{ColoredString, Colorize};
use serde_json::{json, Value};
use std::path::Path;
use vaultnode_core::{ConnectionInfo, ContainerRecord, ContainerState, DataItemRecord};

#[derive(Args)]
pub struct ContainerArgs {
    #[command(subcommand)]
    command: ContainerCommand,
}

#[derive(Subcommand)]
enum ContainerCommand {
    /// Register a container assigned to this node
    Assign {
        /// Container ID
        container_id: String,

        /// Days until the assignment expires
        #[arg(long, default_value = "30")]
        expires_in_days: i64,
    },
    /// Create and start the container's micro-network
    Create {
        /// Container ID
        container_id: String,
    },
    /// Replicate the container's micro-network from a peer node
    Replicate {
        /// Container ID
        container_id: String,

        /// Peer node ID to sync from
        #[arg(long)]
        from: String,
    },
    /// Destroy the container's micro-network
    Remove {
        /// Container ID
        container_id: String,
    },
    /// Show container information
    Info {
        /// Container ID
        container_id: String,
    },
    /// List all containers
    List,
}

pub async fn run(args: ContainerArgs, data_dir: &Path, json: bool) -> Result<()> {
    let ctx = NodeContext::open(data_dir)?;
    match args.command {
        ContainerCommand::Assign {
            container_id,
            expires_in_days,
        } => assign(&ctx, container_id, expires_in_days)?,
        ContainerCommand::Create { container_id } => create(&ctx, &container_id).await?,
        ContainerCommand::Replicate { container_id, from } => {
            replicate(&ctx, &container_id, &from).await?
        }
        ContainerCommand::Remove { container_id } => remove(&ctx, &container_id).await?,
        ContainerCommand::Info { container_id } => show_info(&ctx, &container_id, json)?,
        ContainerCommand::List => list(&ctx, json)?,
    }
    ctx.close()
}

fn colored_state(state: ContainerState) -> ColoredString {
    let label = state.to_string();
    match state {
        ContainerState::Running => label.green().bold(),
        ContainerState::Starting | ContainerState::Stopping => label.yellow(),
        ContainerState::Stopped => label.red(),
        ContainerState::Unknown => label.bright_black(),
    }
}

fn print_connection_info(info: &ConnectionInfo) {
    println!("    RPC: {}", info.rpc_url.bright_cyan());
    println!("    P2P: {}", info.p2p_url.bright_cyan());
}

fn assign(ctx: &NodeContext, container_id: String, expires_in_days: i64) -> Result<()> {
    let expiration = Utc::now() + Duration::days(expires_in_days);
    let record = ContainerRecord::new(container_id, expiration);
    ctx.repository
        .create_container(&record)
        .with_context(|| format!("Failed to assign container {}", record.container_id))?;

    println!(
        "{}  Assigned container {}",
        "✓".green().bold(),
        record.container_id.bright_yellow()
    );
    println!("    Expires: {}", expiration.to_rfc3339().bright_black());
    Ok(())
}

async fn create(ctx: &NodeContext, container_id: &str) -> Result<()> {
    println!("{}", format!("Creating container {}...", container_id).bold().cyan());

    let orchestrator = ctx.orchestrator();
    let result = match orchestrator.create_container(container_id) {
        Ok(pending) => pending.await,
        Err(e) => Err(e),
    };
    orchestrator.shutdown().await;
    let info = result.with_context(|| format!("Failed to create container {}", container_id))?;

    println!("{}  Container is {}", "✓".green().bold(), colored_state(ContainerState::Running));
    print_connection_info(&info);
    Ok(())
}

async fn replicate(ctx: &NodeContext, container_id: &str, peer_node_id: &str) -> Result<()> {
    println!(
        "{}",
        format!("Replicating container {} from {}...", container_id, peer_node_id)
            .bold()
            .cyan()
    );

    let orchestrator = ctx.orchestrator();
    let result = match orchestrator.replicate_container(container_id, peer_node_id) {
        Ok(pending) => pending.await,
        Err(e) => Err(e),
    };
    orchestrator.shutdown().await;
    let info =
        result.with_context(|| format!("Failed to replicate container {}", container_id))?;

    println!("{}  Replica is {}", "✓".green().bold(), colored_state(ContainerState::Running));
    print_connection_info(&info);
    Ok(())
}

async fn remove(ctx: &NodeContext, container_id: &str) -> Result<()> {
    let orchestrator = ctx.orchestrator();
    let result = match orchestrator.remove_container(container_id) {
        Ok(pending) => pending.await,
        Err(e) => Err(e),
    };
    orchestrator.shutdown().await;
    result.with_context(|| format!("Failed to remove container {}", container_id))?;

    println!(
        "{}  Removed micro-network of container {}",
        "✓".green().bold(),
        container_id.bright_yellow()
    );
    Ok(())
}

fn info_json(
    record: &ContainerRecord,
    state: ContainerState,
    connection: Option<&ConnectionInfo>,
    items: &[DataItemRecord],
) -> Value {
    json!({
        "container_id": record.container_id,
        "state": state.to_string(),
        "expiration_date": record.expiration_date.to_rfc3339(),
        "expired": record.is_expired(Utc::now()),
        "data_items": items.len(),
        "data_bytes": items.iter().map(|item| item.size).sum::<u64>(),
        "connection": connection,
        "pending_challenge": record.pending_challenge,
    })
}

fn list_json(containers: &[(ContainerRecord, ContainerState)]) -> Value {
    containers
        .iter()
        .map(|(record, state)| {
            json!({
                "container_id": record.container_id,
                "state": state.to_string(),
                "expiration_date": record.expiration_date.to_rfc3339(),
            })
        })
        .collect()
}

fn show_info(ctx: &NodeContext, container_id: &str, json: bool) -> Result<()> {
    let orchestrator = ctx.orchestrator();
    let record = orchestrator
        .get_container(container_id)?
        .with_context(|| format!("Unknown container: {}", container_id))?;
    let state = orchestrator.get_container_state(container_id)?;
    let connection = orchestrator.get_container_connection_info(container_id)?;
    let items = ctx.store.list(container_id)?;

    if json {
        return super::print_json(&info_json(&record, state, connection.as_ref(), &items));
    }

    println!("{}", "Container Information".bold().cyan());
    println!();
    println!("  ID:         {}", record.container_id.bright_yellow());
    println!("  State:      {}", colored_state(state));
    println!("  Expires:    {}", record.expiration_date.to_rfc3339());
    if record.is_expired(Utc::now()) {
        println!("              {}", "expired".red());
    }
    println!(
        "  Data items: {} ({} bytes)",
        items.len().to_string().bright_cyan(),
        items.iter().map(|item| item.size).sum::<u64>()
    );

    if let Some(info) = connection {
        println!("  Endpoints:");
        print_connection_info(&info);
    }

    if let Some(challenge) = record.pending_challenge {
        println!(
            "  Challenge:  {} chunks pending",
            challenge.chunks.len().to_string().bright_yellow()
        );
    }

    Ok(())
}

fn list(ctx: &NodeContext, json: bool) -> Result<()> {
    let containers = ctx.orchestrator().list_containers()?;
    if json {
        return super::print_json(&list_json(&containers));
    }
    if containers.is_empty() {
        println!("{}", "No containers assigned".yellow());
        return Ok(());
    }

    println!("{}", format!("Containers ({})", containers.len()).bold().cyan());
    println!();
    for (record, state) in containers {
        println!(
            "  {:<24} {:<10} expires {}",
            record.container_id.bright_yellow(),
            colored_state(state),
            record.expiration_date.format("%Y-%m-%d")
        );
    }
    Ok(())
}
