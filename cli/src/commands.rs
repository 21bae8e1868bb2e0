pub mod clean;
pub mod generate;
pub mod list;
pub mod run;
pub mod setup;
pub mod train;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use sixkit_common::config::{ConfigValue, PluginConfig};
use sixkit_common::model::PluginKind;

#[derive(Parser)]
#[command(name = "sixkit")]
#[command(about = "Plugin-driven IPv6 target generation toolkit.", version)]
pub struct CommandLine {
    /// Reduce output; repeat for near-silence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Append logs to a file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Root directory for plugin workspaces
    #[arg(long, default_value = "work", global = true)]
    pub workdir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// The `(kind, name, --set ...)` triple every action takes.
#[derive(Args)]
pub struct PluginArgs {
    /// Plugin kind: dataset | scan | tga-static | tga-dynamic | analyze
    pub kind: PluginKind,

    /// Plugin name, e.g. "sixgen"
    pub name: String,

    /// Plugin parameter as key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered plugins
    #[command(alias = "l")]
    List {
        /// Restrict the listing to one kind
        kind: Option<PluginKind>,
    },
    /// Provision a plugin's environment
    Setup {
        #[command(flatten)]
        plugin: PluginArgs,
    },
    /// Train a static TGA from seed addresses
    Train {
        #[command(flatten)]
        plugin: PluginArgs,
        /// Seed file, one address per line
        #[arg(long)]
        seeds: PathBuf,
        /// Where to write the model handle (JSON); stdout otherwise
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate candidate addresses from a trained model
    #[command(alias = "g")]
    Generate {
        #[command(flatten)]
        plugin: PluginArgs,
        /// Model handle JSON produced by `train`
        #[arg(long)]
        model: PathBuf,
        /// Number of unique addresses to produce
        #[arg(long)]
        count: u64,
        /// Output file; stdout otherwise, one address per line
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run a plugin's primary action (download, scan, discover, analyze)
    #[command(alias = "r")]
    Run {
        #[command(flatten)]
        plugin: PluginArgs,
        /// Seed or target addresses file
        #[arg(long)]
        seeds: Option<PathBuf>,
        /// Scan result JSON consumed by analyze plugins
        #[arg(long)]
        input: Option<PathBuf>,
        /// Probe budget for dynamic TGAs
        #[arg(long)]
        limit: Option<u64>,
        /// Scanner plugin lent to dynamic TGAs
        #[arg(long)]
        scanner: Option<String>,
        /// Scanner parameter as key=value (repeatable)
        #[arg(long = "scanner-set", value_name = "KEY=VALUE")]
        scanner_set: Vec<String>,
        /// Output file; stdout otherwise
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Remove a plugin's provisioned state
    Clean {
        #[command(flatten)]
        plugin: PluginArgs,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Turns repeated `--set key=value` flags into a plugin configuration.
pub fn parse_config(pairs: &[String]) -> anyhow::Result<PluginConfig> {
    let mut config = PluginConfig::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            anyhow::bail!("expected key=value, got '{pair}'");
        };
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("empty key in '{pair}'");
        }
        config.insert(key, ConfigValue::infer(value.trim()));
    }
    Ok(config)
}
