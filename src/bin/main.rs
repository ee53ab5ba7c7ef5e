#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "TallyChain CLI".bright_cyan().bold());
    println!("{}", "--------------".bright_cyan());
    println!();
    println!(
        "{}",
        "This is the main entry point, but most functionality is in separate binaries.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!(
        "  - {}  {}",
        "tally-demo".bright_white(),
        "run the three-party scenario and write the chain and registry files".dimmed()
    );
    println!(
        "  - {}  {}",
        "tally-verify".bright_white(),
        "load saved files, validate, audit proof-of-work and replay balances".dimmed()
    );
    println!();
    println!(
        "{}",
        "Settings are read from tallychain.toml when present.".yellow()
    );
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!("{}", "  cargo run --release --bin tally-demo".italic());
    println!("{}", "  cargo run --release --bin tally-verify -- --index 1".italic());
}
