use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appconf_kernel::{ConfigStore, Filter, StoreConfig, VersionRecord, VersionedSetting};

/// Appconf versioned configuration store CLI
#[derive(Parser, Debug)]
#[command(name = "appconf")]
#[command(about = "Versioned key/value configuration store", long_about = None)]
struct Cli {
    /// Path to store config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Settings document to use (overrides the configured backend)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a new version, creating the setting if needed
    Put { key: String, value: String },

    /// Create a setting that must not exist yet
    Create { key: String, value: String },

    /// Print the latest value
    Get { key: String },

    /// Print the latest version record
    Latest { key: String },

    /// Print the full setting with its history
    History { key: String },

    /// Delete a setting (allowed while locked)
    Delete { key: String },

    /// Make a setting read-only
    Lock { key: String },

    /// Make a setting writable
    Unlock { key: String },

    /// List keys
    Keys {
        /// `prefix*` or `a,b,c`
        #[arg(long)]
        filter: Option<String>,
    },

    /// List keys with their latest values
    List {
        /// `prefix*` or `a,b,c`
        #[arg(long)]
        filter: Option<String>,
    },
}

/// JSON view of a setting for output
#[derive(Debug, Serialize)]
struct SettingOutput<'a> {
    key: &'a str,
    locked: bool,
    versions: &'a [VersionRecord],
}

impl<'a> From<&'a VersionedSetting> for SettingOutput<'a> {
    fn from(setting: &'a VersionedSetting) -> Self {
        Self {
            key: setting.key(),
            locked: setting.is_locked(),
            versions: setting.versions(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // ----------------------------
    // Load config and open store
    // ----------------------------
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if let Some(path) = cli.data {
        config = config.with_data_file(path);
    }

    debug!("Opening store with {:?}", config.storage);
    let store = config.open_store().context("failed to open store")?;

    run(&store, cli.command)
}

fn run(store: &ConfigStore, command: Command) -> Result<()> {
    match command {
        Command::Put { key, value } => {
            let setting = store.put(&key, value)?;
            print_json(&SettingOutput::from(&setting))
        }
        Command::Create { key, value } => {
            let setting = store.create(&key, value)?;
            print_json(&SettingOutput::from(&setting))
        }
        Command::Get { key } => {
            println!("{}", store.get(&key)?);
            Ok(())
        }
        Command::Latest { key } => print_json(&store.latest_version(&key)?),
        Command::History { key } => {
            let setting = store.setting(&key)?;
            print_json(&SettingOutput::from(&setting))
        }
        Command::Delete { key } => {
            store.delete(&key)?;
            Ok(())
        }
        Command::Lock { key } => {
            let setting = store.lock(&key)?;
            print_json(&SettingOutput::from(&setting))
        }
        Command::Unlock { key } => {
            let setting = store.unlock(&key)?;
            print_json(&SettingOutput::from(&setting))
        }
        Command::Keys { filter } => {
            let filter = Filter::from_optional(filter.as_deref())?;
            print_json(&store.list_keys_matching(&filter)?)
        }
        Command::List { filter } => {
            let filter = Filter::from_optional(filter.as_deref())?;
            print_json(&store.search(&filter)?)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
