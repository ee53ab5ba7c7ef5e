#![forbid(unsafe_code)]
//! Load a saved chain, check it and replay balances.

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tallychain::blockchain::validate_proof_of_work;
use tallychain::cli::{init_tracing, short_id};
use tallychain::config::load_config;
use tallychain::node::Node;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Chain file (defaults to storage.chain_path)
    #[arg(long)]
    chain: Option<PathBuf>,
    /// Party registry file (defaults to storage.registry_path)
    #[arg(long)]
    registry: Option<PathBuf>,
    /// Block index to replay balances up to (defaults to the tail)
    #[arg(long)]
    index: Option<usize>,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = load_config()?;
    if let Some(chain) = &cli.chain {
        config.storage.chain_path = chain.display().to_string();
    }
    if let Some(registry) = &cli.registry {
        config.storage.registry_path = registry.display().to_string();
    }
    let chain_path = PathBuf::from(&config.storage.chain_path);
    let registry_path = PathBuf::from(&config.storage.registry_path);

    let node = Node::open(config)?;

    println!("{}", "🔍 TallyChain verify".bright_cyan().bold());
    println!("Chain:    {}", chain_path.display());
    println!("Registry: {} ({} parties)", registry_path.display(), node.registry.len());
    println!("Blocks:   {}", node.blockchain.len());
    if let Some(root) = node.blockchain.chain_root() {
        println!("Digest:   {}", root.short().bright_white());
    }
    println!();

    let mut healthy = true;
    match node.blockchain.verify() {
        Ok(()) => println!("{} digest and links", "✓".green()),
        Err(e) => {
            healthy = false;
            println!("{} {}", "✗".red(), e.to_string().red());
        }
    }
    match validate_proof_of_work(&node.blockchain.blocks, node.blockchain.difficulty) {
        Ok(()) => println!(
            "{} proof-of-work at difficulty {}",
            "✓".green(),
            node.blockchain.difficulty
        ),
        Err(e) => {
            healthy = false;
            println!("{} {}", "✗".red(), e.to_string().red());
        }
    }
    println!();

    let index = cli.index.unwrap_or(node.blockchain.len().saturating_sub(1));
    println!("{}", format!("Balances up to block #{}", index).bright_cyan().underline());
    let sheet = node.replay_balances(index)?;
    println!("{:<10} {:<12} {:>10} {:>10} {:>10}", "Party", "Id", "Current", "Min", "Max");
    for (id, range) in &sheet {
        println!(
            "{:<10} {:<12} {:>10} {:>10} {:>10}",
            node.registry.name_of(id).unwrap_or("?"),
            short_id(id.as_str(), 8),
            range.current,
            range.min,
            range.max
        );
    }

    Ok(if healthy { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
