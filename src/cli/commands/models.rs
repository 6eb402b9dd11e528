//! List models command.

use anyhow::Result;
use midax_strategies::ModelRegistry;

pub fn run() -> Result<()> {
    let registry = ModelRegistry::new();

    println!("Available Models:");
    println!("═══════════════════════════════════════════════════════════════");

    for name in registry.names() {
        let Some(info) = registry.get(name) else {
            continue;
        };
        println!();
        println!("  {} ({})", info.name, name);
        println!("  {}", info.description);
        println!("  Default config:");
        println!("    {}", serde_json::to_string_pretty(&info.default_config)?.replace('\n', "\n    "));
    }

    println!();
    println!("═══════════════════════════════════════════════════════════════");

    Ok(())
}
