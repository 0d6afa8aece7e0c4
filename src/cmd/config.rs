//! Configuration view and validation commands: `auditor config`.

use anyhow::{Context as _, Result};
use std::path::Path;

use super::super::ConfigCommands;
use auditor::config::{AuditorConfig, CliOverrides};

fn config_file(work_dir: &Path, explicit: Option<&Path>) -> Option<std::path::PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => AuditorConfig::discover(work_dir),
    }
}

pub fn cmd_config(
    work_dir: &Path,
    explicit: Option<&Path>,
    overrides: &CliOverrides,
    command: Option<ConfigCommands>,
) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            match config_file(work_dir, explicit) {
                Some(path) => println!("Config file: {}", path.display()),
                None => println!("No config file found, using defaults"),
            }
            println!();

            let config = AuditorConfig::load(work_dir, explicit, overrides)?;
            println!("Effective values (with env/CLI overrides):");
            println!();
            print!("{}", config.to_toml()?);
        }
        Some(ConfigCommands::Validate) => {
            let Some(path) = config_file(work_dir, explicit) else {
                println!("No config file found. Using defaults (valid).");
                return Ok(());
            };
            let mut config = AuditorConfig::from_file(&path)?;
            config.apply_overrides(overrides);
            config
                .validate()
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;
            println!("Configuration is valid: {}", path.display());
        }
        Some(ConfigCommands::Init { force }) => {
            let path = AuditorConfig::project_path(work_dir);
            if path.exists() && !force {
                println!("Config already exists at {}", path.display());
                println!("Use --force to overwrite it.");
                return Ok(());
            }
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            std::fs::write(&path, AuditorConfig::default().to_toml()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;

            println!("Created {}", path.display());
            println!();
            println!("You can now customize:");
            println!("  - [api] url, timeout_secs");
            println!("  - [polling] interval_ms");
            println!("  - [defaults] client_id, mapping_path, data_path");
            println!("  - [logging] level, dir");
        }
    }
    Ok(())
}
