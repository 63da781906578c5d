//! `clientbench list` command - show the known client strategies.

use clientbench_core::http::{describe_strategy, STRATEGY_NAMES};

pub fn execute() -> Result<(), Box<dyn std::error::Error>> {
    println!("{:<20} {:<12} DESCRIPTION", "STRATEGY", "MODEL");
    for name in STRATEGY_NAMES {
        if let Some((model, description)) = describe_strategy(name) {
            println!("{:<20} {:<12} {}", name, model.to_string(), description);
        }
    }
    println!();
    println!("Total: {} strategies", STRATEGY_NAMES.len());
    Ok(())
}
