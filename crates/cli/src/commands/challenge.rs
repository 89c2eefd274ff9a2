//! Proof-of-storage challenge command.

use super::context::NodeContext;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde_json::{json, Value};
use std::path::Path;
use vaultnode_core::{Challenge, ChallengeChunkInfo, ChallengeSolution};
use vaultnode_prover::ChallengeSolver;

#[derive(Args)]
pub struct ChallengeArgs {
    #[command(subcommand)]
    command: ChallengeCommand,
}

#[derive(Subcommand)]
enum ChallengeCommand {
    /// Solve a challenge over a container's chunks
    Solve {
        /// Container ID
        container_id: String,

        /// Challenged range as DATA_ID:OFFSET:LENGTH, in order (repeatable).
        /// Without any, the container's pending challenge is solved.
        #[arg(short, long = "chunk", value_parser = parse_chunk)]
        chunks: Vec<ChallengeChunkInfo>,

        /// Store the given ranges as the container's pending challenge first
        #[arg(long, requires = "chunks")]
        save: bool,
    },
}

/// Parse `DATA_ID:OFFSET:LENGTH`. The data ID may itself contain colons.
fn parse_chunk(s: &str) -> std::result::Result<ChallengeChunkInfo, String> {
    let mut parts = s.rsplitn(3, ':');
    let (Some(length), Some(offset), Some(data_id)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected DATA_ID:OFFSET:LENGTH, got {:?}", s));
    };
    if data_id.is_empty() {
        return Err("data ID must not be empty".to_string());
    }
    let offset = offset
        .parse()
        .map_err(|e| format!("invalid offset {:?}: {}", offset, e))?;
    let length = length
        .parse()
        .map_err(|e| format!("invalid length {:?}: {}", length, e))?;
    Ok(ChallengeChunkInfo::new(data_id, offset, length))
}

pub fn run(args: ChallengeArgs, data_dir: &Path, json: bool) -> Result<()> {
    let ctx = NodeContext::open(data_dir)?;
    match args.command {
        ChallengeCommand::Solve {
            container_id,
            chunks,
            save,
        } => solve(&ctx, container_id, chunks, save, json)?,
    }
    ctx.close()
}

fn solution_json(challenge: &Challenge, solution: &ChallengeSolution, saved: bool) -> Value {
    json!({
        "container_id": challenge.container_id,
        "chunks": challenge.chunks,
        "chunk_hash": solution.chunk_hash,
        "saved": saved,
    })
}

fn solve(
    ctx: &NodeContext,
    container_id: String,
    chunks: Vec<ChallengeChunkInfo>,
    save: bool,
    json: bool,
) -> Result<()> {
    let record = ctx
        .repository
        .get_container(&container_id)?
        .with_context(|| format!("Unknown container: {}", container_id))?;

    let challenge = if chunks.is_empty() {
        match record.pending_challenge {
            Some(challenge) => challenge,
            None => bail!("Container {} has no pending challenge; pass --chunk", container_id),
        }
    } else {
        Challenge::new(container_id, chunks)
    };

    if save {
        ctx.orchestrator().save_challenge(challenge.clone())?;
        if !json {
            println!("{}  Saved pending challenge", "✓".green().bold());
        }
    }

    let solver = ChallengeSolver::new(ctx.store.clone());
    let solution = solver
        .solve(&challenge)
        .with_context(|| format!("Failed to solve challenge for {}", challenge.container_id))?;

    if json {
        return super::print_json(&solution_json(&challenge, &solution, save));
    }

    println!("{}", "Challenge solved".bold().cyan());
    println!();
    println!("  Container:  {}", challenge.container_id.bright_yellow());
    println!("  Chunks:     {}", challenge.chunks.len());
    println!("  Chunk hash: {}", solution.chunk_hash.bright_green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chunk() {
        let chunk = parse_chunk("17:4:128").unwrap();
        assert_eq!(chunk, ChallengeChunkInfo::new("17", 4, 128));
    }

    #[test]
    fn test_parse_chunk_id_with_colons() {
        let chunk = parse_chunk("blob:v2:0:10").unwrap();
        assert_eq!(chunk.chunk_id, "blob:v2");
        assert_eq!(chunk.offset, 0);
        assert_eq!(chunk.length, 10);
    }

    #[test]
    fn test_solution_json() {
        let challenge = Challenge::new("c1", vec![ChallengeChunkInfo::new("17", 4, 128)]);
        let solution = ChallengeSolution::new("ab".repeat(32));

        let value = solution_json(&challenge, &solution, false);
        assert_eq!(value["container_id"], "c1");
        assert_eq!(value["chunk_hash"], "ab".repeat(32));
        assert_eq!(value["chunks"][0]["offset"], 4);
        assert_eq!(value["saved"], false);
    }

    #[test]
    fn test_parse_chunk_rejects_malformed() {
        assert!(parse_chunk("17:4").is_err());
        assert!(parse_chunk(":0:4").is_err());
        assert!(parse_chunk("17:x:4").is_err());
        assert!(parse_chunk("17:0:-1").is_err());
    }
}
