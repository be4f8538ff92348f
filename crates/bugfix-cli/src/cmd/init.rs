use anyhow::Context;
use bugfix_core::{config::Config, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing bugfix in: {}", root.display());

    let config_path = paths::config_path(root);
    if !config_path.exists() {
        Config::new()
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    println!("\nSet tracker.base_url and tracker.reviewer_account_id, then run 'bugfix config validate'.");
    Ok(())
}
