#![forbid(unsafe_code)]
//! Run the three-party transfer scenario and write the chain and registry.

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tallychain::cli::{init_tracing, short_id};
use tallychain::config::load_config;
use tallychain::node::Node;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Leading zero hex digits required of every block hash
    #[arg(long)]
    difficulty: Option<usize>,
    /// Transactions per block
    #[arg(long)]
    batch_threshold: Option<usize>,
    /// Where to write the chain (defaults to storage.chain_path)
    #[arg(long)]
    chain: Option<PathBuf>,
    /// Where to write the party registry (defaults to storage.registry_path)
    #[arg(long)]
    registry: Option<PathBuf>,
    /// Block index to replay balances up to
    #[arg(long, default_value_t = 1)]
    index: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = load_config()?;
    if let Some(difficulty) = cli.difficulty {
        config.ledger.difficulty = difficulty;
    }
    if let Some(threshold) = cli.batch_threshold {
        config.ledger.batch_threshold = threshold;
    }
    let chain_path = cli
        .chain
        .unwrap_or_else(|| PathBuf::from(&config.storage.chain_path));
    let registry_path = cli
        .registry
        .unwrap_or_else(|| PathBuf::from(&config.storage.registry_path));

    println!("{}", "⛓️  TallyChain demo".bright_cyan().bold());
    println!(
        "Difficulty {}, batch threshold {}",
        config.ledger.difficulty.to_string().bright_yellow(),
        config.ledger.batch_threshold.to_string().bright_yellow()
    );
    println!();

    let mut node = Node::new(config)?;
    let alice = node.register_party("Alice", 60000)?;
    let bob = node.register_party("Bob", 4500)?;
    let eva = node.register_party("Eva", 7500)?;

    let transfers = [
        (&alice, &bob, 1500),
        (&alice, &eva, 750),
        (&eva, &bob, 200),
        (&bob, &eva, 450),
        (&bob, &alice, 300),
        (&eva, &alice, 1200),
    ];

    for (sender, receiver, amount) in transfers {
        let Some(tx) = node.create_transaction(sender, receiver, amount) else {
            println!("{} transfer of {} rejected", "✗".red(), amount);
            continue;
        };
        let minted = node.route_and_apply(tx)?;
        println!(
            "{} {} -> {}: {}",
            "✓".green(),
            node.registry.name_of(sender).unwrap_or("?"),
            node.registry.name_of(receiver).unwrap_or("?"),
            amount
        );
        if let Some(index) = minted {
            let block = node.blockchain.block(index)?;
            println!(
                "  {} block #{} {} (nonce {})",
                "⛏".bright_magenta(),
                index,
                block.hash.short().bright_white(),
                block.nonce
            );
        }
    }
    println!();

    let valid = node.validate();
    println!(
        "Chain of {} blocks: {}",
        node.blockchain.len(),
        if valid { "valid".green().bold() } else { "INVALID".red().bold() }
    );
    println!();

    println!("{}", format!("Balances up to block #{}", cli.index).bright_cyan().underline());
    let sheet = node.replay_balances(cli.index)?;
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
    println!();

    node.save(&chain_path)?;
    node.save_registry(&registry_path)?;
    println!("{} {}", "Chain written to".green(), chain_path.display());
    println!("{} {}", "Registry written to".green(), registry_path.display());

    Ok(())
}
