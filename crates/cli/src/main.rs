mod cli;
mod commands;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use content_catalog::{FileStore, PromotionService, ResourceEditor};
use content_core::Config;

use crate::cli::{CliArgs, Command};

fn load_config(args: &CliArgs) -> Config {
    content_core::config::load_dotenv();
    let mut config = match &args.profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.clone();
    }
    config
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = load_config(&args);

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    debug!(profile = config.profile_label(), "configuration loaded");

    let output = run(args.command, &config)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<FileStore>> {
    config.log_summary();
    let store = FileStore::open(&config.storage.data_dir)
        .with_context(|| {
            format!("failed to open content store at {}", config.storage.data_dir.display())
        })?
        .with_pretty_json(config.storage.pretty_json);
    Ok(Arc::new(store))
}

fn run(command: Command, config: &Config) -> Result<serde_json::Value> {
    match command {
        Command::Hash { file } => commands::hash(&file),
        Command::Config => Ok(config.redacted_summary()),
        Command::Create { resource_type, file } => {
            let editor = ResourceEditor::new(open_store(config)?);
            commands::create(&editor, resource_type, &file)
        }
        Command::Patch {
            resource_type,
            id,
            ops_file,
        } => {
            let editor = ResourceEditor::new(open_store(config)?);
            commands::patch(&editor, resource_type, &id, &ops_file)
        }
        Command::Delete { resource_type, id } => {
            let editor = ResourceEditor::new(open_store(config)?);
            commands::delete(&editor, resource_type, &id)
        }
        Command::Preview { space } => {
            let service = PromotionService::new(open_store(config)?);
            commands::preview(&service, space)
        }
        Command::Promote { space, changes } => {
            let service = PromotionService::new(open_store(config)?);
            commands::promote(&service, space, changes.as_deref())
        }
        Command::Status { space } => commands::status(&*open_store(config)?, space),
    }
}
