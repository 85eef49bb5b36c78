//! Config file and network presets

use std::path::Path;

use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};

use mentora_client::{ClientConfig, NetworkPreset};

use crate::style::*;

pub fn show(config: &ClientConfig) -> Result<()> {
    let mut shown = config.clone();
    if !shown.reviewer.api_key.is_empty() {
        shown.reviewer.api_key = "********".to_string();
    }
    if shown.private_key.is_some() {
        shown.private_key = Some("********".to_string());
    }
    println!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

pub fn init(path: Option<&Path>, network: Option<&str>, force: bool) -> Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => ClientConfig::default_path().context("No config directory on this platform")?,
    };

    if path.exists() && !force {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{} exists. Overwrite?", path.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            print_info("Keeping existing config");
            return Ok(());
        }
    }

    let mut config = ClientConfig::default();
    if let Some(key) = network {
        let preset = NetworkPreset::by_key(key)
            .with_context(|| format!("Unknown network '{key}'"))?;
        config.network = preset.into();
    }
    config.save(&path)?;
    print_success(&format!("Wrote {}", path.display()));
    print_info("Set contracts.mentora and contracts.assignment_manager before using the chain commands");
    Ok(())
}

pub fn networks(current: &ClientConfig) {
    print_header("Networks");
    let mut table = table(&["Key", "Chain ID", "Name", "Currency", "RPC"]);
    for preset in NetworkPreset::ALL {
        let key = if preset.chain_id == current.network.chain_id {
            format!("{} *", preset.key)
        } else {
            preset.key.to_string()
        };
        table.add_row(vec![
            key,
            preset.chain_id.to_string(),
            preset.name.to_string(),
            preset.currency.to_string(),
            preset.rpc_url.to_string(),
        ]);
    }
    println!("{table}");
}
