mod cli;
mod config;
mod device;
mod error;
mod mappings;
mod repository;
mod update;
mod utils;
mod version;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Update {
            device,
            yes,
            include_questionable,
            skip_index,
        } => workflow::execute_update(
            &cli.config,
            workflow::UpdateOptions {
                device,
                assume_yes: yes,
                include_questionable,
                skip_index,
            },
        ),
        Commands::Check { device, json } => {
            workflow::execute_check(&cli.config, device.as_deref(), json)
        }
        Commands::Search { query } => workflow::execute_search(&cli.config, query.as_deref()),
        Commands::Install { package, device } => {
            workflow::execute_install(&cli.config, &package, device.as_deref())
        }
        Commands::BatchInstall { file, device } => {
            workflow::execute_batch_install(&cli.config, &file, device.as_deref())
        }
        Commands::Devices => workflow::execute_devices(&cli.config),
        Commands::Mappings => workflow::execute_mappings(&cli.config),
        Commands::AddMapping {
            friendly_name,
            package_id,
        } => workflow::execute_add_mapping(&cli.config, &friendly_name, &package_id),
        Commands::RemoveMapping { friendly_name } => {
            workflow::execute_remove_mapping(&cli.config, &friendly_name)
        }
        Commands::Resolve { package_name } => {
            workflow::execute_resolve(&cli.config, &package_name)
        }
        Commands::ListCategories => workflow::execute_list_categories(&cli.config),
        Commands::DebugMappings { package_name } => {
            workflow::execute_debug_mappings(&cli.config, package_name.as_deref())
        }
        Commands::RepoStatus => workflow::execute_repo_status(&cli.config),
        Commands::RepoList => workflow::execute_repo_list(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

/// Diagnostics go to stderr; `--verbose` overrides `RUST_LOG`.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("apm=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
