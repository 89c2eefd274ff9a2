//! Chunk storage command.

use super::context::NodeContext;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use vaultnode_core::{generate_hash_reader, DataItemRecord, HashAlgorithm};

#[derive(Args)]
pub struct DataArgs {
    #[command(subcommand)]
    command: DataCommand,
}

#[derive(Subcommand)]
enum DataCommand {
    /// Store a file as a chunk of a container
    Put {
        /// Container ID
        container_id: String,

        /// Data item ID
        data_id: String,

        /// File to store
        file: PathBuf,

        /// Expected hash as ALGORITHM:base64 (computed from the file if omitted)
        #[arg(long)]
        hash: Option<String>,

        /// Algorithm used when computing the hash
        #[arg(long, default_value = "SHA-256")]
        algorithm: HashAlgorithm,
    },
    /// Fetch a verified chunk
    Get {
        /// Container ID
        container_id: String,

        /// Data item ID
        data_id: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verify against this hash instead of the one on record
        #[arg(long)]
        hash: Option<String>,
    },
    /// Check that a chunk is stored and intact
    Has {
        /// Container ID
        container_id: String,

        /// Data item ID
        data_id: String,
    },
    /// Remove a chunk from a container
    Rm {
        /// Container ID
        container_id: String,

        /// Data item ID
        data_id: String,
    },
    /// List the chunks of a container
    List {
        /// Container ID
        container_id: String,
    },
}

pub fn run(args: DataArgs, data_dir: &Path, json: bool) -> Result<()> {
    let ctx = NodeContext::open(data_dir)?;
    match args.command {
        DataCommand::Put {
            container_id,
            data_id,
            file,
            hash,
            algorithm,
        } => put(&ctx, &container_id, &data_id, &file, hash, algorithm)?,
        DataCommand::Get {
            container_id,
            data_id,
            output,
            hash,
        } => get(&ctx, &container_id, &data_id, output, hash)?,
        DataCommand::Has {
            container_id,
            data_id,
        } => has(&ctx, &container_id, &data_id)?,
        DataCommand::Rm {
            container_id,
            data_id,
        } => remove(&ctx, &container_id, &data_id)?,
        DataCommand::List { container_id } => list(&ctx, &container_id, json)?,
    }
    ctx.close()
}

fn put(
    ctx: &NodeContext,
    container_id: &str,
    data_id: &str,
    file: &Path,
    hash: Option<String>,
    algorithm: HashAlgorithm,
) -> Result<()> {
    let mut reader =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;

    let encoded = match hash {
        Some(encoded) => encoded,
        None => generate_hash_reader(algorithm, &mut reader)
            .with_context(|| format!("Failed to hash {}", file.display()))?
            .to_string(),
    };

    let record = ctx
        .store
        .save_from(data_id, container_id, &encoded, &mut reader)
        .with_context(|| format!("Failed to store {}", data_id))?;

    println!(
        "{}  Stored {} in container {}",
        "✓".green().bold(),
        record.data_id.bright_yellow(),
        container_id.bright_yellow()
    );
    println!("    Size: {} bytes", record.size);
    println!("    Hash: {}", record.content_hash.to_string().bright_black());
    Ok(())
}

fn get(
    ctx: &NodeContext,
    container_id: &str,
    data_id: &str,
    output: Option<PathBuf>,
    hash: Option<String>,
) -> Result<()> {
    let data = ctx
        .store
        .fetch(data_id, container_id, hash.as_deref())
        .with_context(|| format!("Failed to fetch {}", data_id))?;

    match output {
        Some(path) => {
            fs::write(&path, &data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{}  Wrote {} bytes to {}",
                "✓".green().bold(),
                data.len(),
                path.display().to_string().bright_black()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn has(ctx: &NodeContext, container_id: &str, data_id: &str) -> Result<()> {
    if ctx.store.has(data_id, container_id)? {
        println!("{}  {} is stored and intact", "✓".green().bold(), data_id.bright_yellow());
    } else {
        println!("{}  {} is not stored", "✗".red().bold(), data_id.bright_yellow());
    }
    Ok(())
}

fn remove(ctx: &NodeContext, container_id: &str, data_id: &str) -> Result<()> {
    if ctx.store.remove(data_id, container_id)? {
        println!("{}  Removed {}", "✓".green().bold(), data_id.bright_yellow());
    } else {
        println!("{}", format!("{} was not stored in {}", data_id, container_id).yellow());
    }
    Ok(())
}

fn list_json(items: &[DataItemRecord]) -> Value {
    items
        .iter()
        .map(|item| {
            json!({
                "data_id": item.data_id,
                "size": item.size,
                "content_hash": item.content_hash.to_string(),
            })
        })
        .collect()
}

fn list(ctx: &NodeContext, container_id: &str, json: bool) -> Result<()> {
    let items = ctx.store.list(container_id)?;
    if json {
        return super::print_json(&list_json(&items));
    }
    if items.is_empty() {
        println!("{}", format!("No data items in {}", container_id).yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Data items in {} ({})", container_id, items.len())
            .bold()
            .cyan()
    );
    println!();
    for item in items {
        println!(
            "  {:<24} {:>10} bytes  {}",
            item.data_id.bright_yellow(),
            item.size,
            item.content_hash.to_string().bright_black()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultnode_core::generate_hash;

    #[test]
    fn test_list_json_uses_encoded_hash() {
        let encoded = generate_hash(HashAlgorithm::Sha256, b"abc");
        let items = vec![DataItemRecord::new("a", 3, encoded.clone())];

        let value = list_json(&items);
        assert_eq!(value[0]["data_id"], "a");
        assert_eq!(value[0]["size"], 3);
        assert_eq!(value[0]["content_hash"], encoded.to_string());
    }
}
