//! vaultnode CLI entry point.

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "vaultnode")]
#[command(about = "A storage node with proof-of-storage challenges", long_about = None)]
struct Cli {
    /// Directory holding the node's data and config.json
    #[arg(short, long, global = true, default_value = "./data")]
    data_dir: PathBuf,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print listings and results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<commands::Commands>,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd, &cli.data_dir, cli.json).await {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                std::process::exit(1);
            }
        }
        None => {
            println!("vaultnode - A storage node with proof-of-storage challenges");
            println!("Run 'vaultnode --help' for usage information.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_flag_is_global() {
        let cli = Cli::try_parse_from(["vaultnode", "container", "list", "--json"]).unwrap();
        assert!(cli.json);

        let cli = Cli::try_parse_from(["vaultnode", "--json", "node", "list"]).unwrap();
        assert!(cli.json);

        let cli = Cli::try_parse_from(["vaultnode", "data", "list", "c1"]).unwrap();
        assert!(!cli.json);
    }
}
