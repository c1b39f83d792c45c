use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "apm",
    about = "Android Package Manager - install and update FOSS apps on connected devices",
    version,
    author
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = crate::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Update repository indices and the packages on connected devices
    Update {
        /// Only update this device (serial as shown by `apm devices`)
        #[arg(short, long)]
        device: Option<String>,

        /// Install without asking for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Also install updates flagged as questionable
        #[arg(long)]
        include_questionable: bool,

        /// Skip refreshing the repository indices
        #[arg(long)]
        skip_index: bool,
    },

    /// Check connected devices for available updates without installing
    Check {
        /// Only check this device
        #[arg(short, long)]
        device: Option<String>,

        /// Print the update list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search the repositories for packages
    Search {
        /// Search terms (lists everything when omitted)
        query: Option<String>,
    },

    /// Install a package by friendly name or package id
    Install {
        #[arg(value_name = "PACKAGE")]
        package: String,

        /// Target device serial
        #[arg(short, long)]
        device: Option<String>,
    },

    /// Install every package listed in a file (one per line)
    BatchInstall {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Target device serial
        #[arg(short, long)]
        device: Option<String>,
    },

    /// List connected devices
    Devices,

    /// List all package mappings
    Mappings,

    /// Add a friendly name for a package id
    AddMapping {
        friendly_name: String,
        package_id: String,
    },

    /// Remove a friendly name mapping
    RemoveMapping { friendly_name: String },

    /// Resolve a friendly name to its package id
    Resolve { package_name: String },

    /// List mapping categories
    ListCategories,

    /// Inspect how mappings match a name
    DebugMappings { package_name: Option<String> },

    /// Check reachability of every configured repository
    RepoStatus,

    /// List configured repositories
    RepoList,
}
