use anyhow::Context;
use std::path::Path;
use vyuha_core::{config::Config, io, paths};

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing Vyuha in: {}", root.display());

    let data = serde_yaml::to_string(&Config::default())?;
    let created = io::write_if_missing(&paths::config_path(root), data.as_bytes())
        .context("failed to write config.yaml")?;
    if created {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    println!();
    println!("Set GEMINI_API_KEY to use the hosted proposer (rule-based otherwise).");
    println!("Set WHITE_CIRCLE_API_KEY and WHITE_CIRCLE_DEPLOYMENT_ID to enable the policy oracle.");
    Ok(())
}
