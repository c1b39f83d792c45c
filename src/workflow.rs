use crate::config::{Config, RepositoryConfig};
use crate::device::{AdbBridge, DeviceBridge};
use crate::error::{ApmError, Result};
use crate::mappings::{PackageMappings, Resolution};
use crate::repository::{ConnectivityProbe, FdroidClient, InstallOutcome, RepositoryClient};
use crate::update::{
    ClassifiedUpdate, InteractionMode, ScanOutcome, SkipReason, UpdateInteraction, UpdatePlanner,
    UpdateRecord,
};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::io::{self, IsTerminal};
use std::ops::ControlFlow;
use std::path::Path;

const DEBUG_PREVIEW: usize = 10;

/// Flags of the `update` command.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub device: Option<String>,
    pub assume_yes: bool,
    pub include_questionable: bool,
    pub skip_index: bool,
}

/// Configuration plus the two external tools every device command needs.
struct Toolbox {
    config: Config,
    adb: AdbBridge,
    fdroid: FdroidClient,
}

impl Toolbox {
    fn load(config_path: &Path) -> Result<Self> {
        let config = Config::load(config_path)?;
        let adb = AdbBridge::discover(config.tools.adb.as_deref());
        let fdroid = FdroidClient::new(&config.tools.fdroidcl, config.updates.lookup_timeout())
            .with_leading_args(config.tools.fdroidcl_args.clone());

        Ok(Self {
            config,
            adb,
            fdroid,
        })
    }

    fn mappings(&self) -> PackageMappings {
        PackageMappings::load(self.config.mappings_path())
    }

    fn target_devices(&self, device: Option<&str>) -> Result<Vec<String>> {
        match device {
            Some(serial) => Ok(vec![serial.to_string()]),
            None => self.adb.list_devices(),
        }
    }
}

fn load_mappings(config_path: &Path) -> Result<PackageMappings> {
    let config = Config::load(config_path)?;
    Ok(PackageMappings::load(config.mappings_path()))
}

/// Execute the update workflow: refresh indices, then update every device
pub fn execute_update(config_path: &Path, options: UpdateOptions) -> Result<()> {
    let toolbox = Toolbox::load(config_path)?;
    println!("{}", "Starting package update process...".cyan().bold());

    if options.skip_index {
        println!("\n{}", "1. Skipping repository index refresh".yellow());
    } else if !update_repositories(&toolbox)? {
        return Ok(());
    }

    println!("\n{}", "2. Checking device packages...".yellow());
    update_devices(&toolbox, &options)?;

    println!(
        "\n{}",
        "✨ Update process completed successfully!".green().bold()
    );
    Ok(())
}

/// Probe the repositories and refresh the local indices. Returns whether the
/// device updates should run afterwards.
fn update_repositories(toolbox: &Toolbox) -> Result<bool> {
    println!("\n{}", "1. Updating repository indices...".yellow());

    let continue_on_failure = toolbox.config.updates.continue_on_repo_failure;
    let repositories = toolbox.config.enabled_repositories();
    if repositories.is_empty() {
        println!(
            "{}",
            "✗ No repositories configured or all repositories are disabled".red()
        );
        println!("   Please check your configuration file: ~/.config/apm/config.yaml");
        return Ok(proceed_to_devices(0, 0, continue_on_failure));
    }
    println!(
        "   Found {} enabled repositories in configuration",
        repositories.len()
    );

    let probe = ConnectivityProbe::new()?;
    let (working, failed): (Vec<&RepositoryConfig>, Vec<&RepositoryConfig>) = repositories
        .into_iter()
        .partition(|repo| {
            let reachable = probe.is_reachable(&repo.url);
            if reachable {
                println!("   {}", format!("✓ {} is reachable", repo.name).green());
            } else {
                println!(
                    "   {}",
                    format!("⚠ {} is unreachable - skipping", repo.name).yellow()
                );
            }
            reachable
        });

    if working.is_empty() {
        println!("{}", "✗ No repositories are currently reachable".red());
        println!("   Will attempt device updates with cached data...");
        return Ok(proceed_to_devices(failed.len(), 0, continue_on_failure));
    }

    println!(
        "   Proceeding with {} working repositories",
        working.len()
    );

    match toolbox.fdroid.update_index() {
        Ok(update) if update.success => {
            println!("{}", "✓ Repository indices updated successfully".green());
        }
        Ok(update) => {
            println!(
                "{}",
                "⚠ Repository update completed with some errors:".yellow()
            );
            for line in visible_index_errors(&update.errors, &failed) {
                println!("   {}", line.dimmed());
            }
        }
        Err(ApmError::Timeout { .. }) => {
            println!("{}", "⚠ Repository update timed out".yellow());
        }
        Err(e) => return Err(e),
    }

    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|repo| repo.name.as_str()).collect();
        println!(
            "\n{}",
            format!("⚠ Unreachable repositories: {}", names.join(", ")).yellow()
        );
        println!("   These repositories will be skipped");
    }
    let names: Vec<&str> = working.iter().map(|repo| repo.name.as_str()).collect();
    println!(
        "{}",
        format!("✓ Working repositories: {}", names.join(", ")).green()
    );

    Ok(proceed_to_devices(
        working.len() + failed.len(),
        working.len(),
        continue_on_failure,
    ))
}

/// Whether device updates follow the index refresh. Without any reachable
/// repository they run from the cached indices.
fn proceed_to_devices(enabled: usize, reachable: usize, continue_on_failure: bool) -> bool {
    enabled > 0 && (reachable == 0 || continue_on_failure)
}

/// Index refresh errors, minus lines about repositories already reported as
/// unreachable.
fn visible_index_errors<'a>(
    errors: &'a [String],
    unreachable: &[&RepositoryConfig],
) -> Vec<&'a str> {
    let known: Vec<String> = unreachable
        .iter()
        .map(|repo| squash_name(&repo.name))
        .collect();

    errors
        .iter()
        .map(String::as_str)
        .filter(|line| {
            let lowered = line.to_lowercase();
            !known.iter().any(|name| lowered.contains(name))
        })
        .collect()
}

/// Repository name as it shows up in fdroidcl diagnostics.
fn squash_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "")
}

fn update_devices(toolbox: &Toolbox, options: &UpdateOptions) -> Result<()> {
    let devices = toolbox.target_devices(options.device.as_deref())?;
    if devices.is_empty() {
        println!("{}", "No Android devices connected".yellow());
        return Ok(());
    }
    println!("   Found {} connected device(s)", devices.len());

    let mode = InteractionMode::detect(options.assume_yes, io::stdin().is_terminal());
    let mut interaction = UpdateInteraction::stdin(mode);
    let include_questionable =
        options.include_questionable || toolbox.config.updates.include_questionable;

    for serial in &devices {
        print_device_header(toolbox, serial);

        match update_device(toolbox, serial, &mut interaction, include_questionable) {
            Ok(()) => {}
            Err(ApmError::UserCancelled) => {
                println!("\n{}", "Update cancelled by user.".yellow());
                return Ok(());
            }
            Err(e @ ApmError::ToolMissing(_)) => return Err(e),
            Err(e) => println!(
                "{}",
                format!("⚠ Error updating device {serial}: {e}").yellow()
            ),
        }
    }

    Ok(())
}

fn update_device<R: io::BufRead>(
    toolbox: &Toolbox,
    serial: &str,
    interaction: &mut UpdateInteraction<R>,
    include_questionable: bool,
) -> Result<()> {
    let outcome = scan_device(toolbox, serial)?;
    print_scan_outcome(&outcome);

    if outcome.updates.is_empty() {
        println!(
            "{}",
            "✓ All packages are up to date (or no updates could be determined)".green()
        );
        return Ok(());
    }

    let mut cancelled = None;
    let plan = outcome.into_plan(|update| {
        if include_questionable {
            return true;
        }
        if cancelled.is_some() {
            return false;
        }
        interaction
            .confirm_questionable(update)
            .unwrap_or_else(|e| {
                cancelled = Some(e);
                false
            })
    });
    if let Some(e) = cancelled {
        return Err(e);
    }

    if !plan.declined.is_empty() {
        println!(
            "{}",
            format!(
                "   Leaving out {} questionable update(s); use --include-questionable to install them",
                plan.declined.len()
            )
            .dimmed()
        );
    }

    if plan.is_empty() {
        println!("{}", "No updates selected".yellow());
        return Ok(());
    }

    if !interaction.confirm_plan(plan.len())? {
        println!("{}", "Skipping updates on this device".yellow());
        return Ok(());
    }

    let updated = install_records(&toolbox.fdroid, serial, &plan.records)?;
    println!(
        "\n{}",
        format!("Successfully updated {updated}/{} packages", plan.len())
            .green()
            .bold()
    );
    Ok(())
}

/// Install each record, reporting failures and carrying on. Only a missing
/// repository tool stops the run. Returns how many were installed.
fn install_records(
    repository: &dyn RepositoryClient,
    serial: &str,
    records: &[UpdateRecord],
) -> Result<usize> {
    let mut updated = 0;
    for record in records {
        println!("Updating {}...", record.package.white().bold());
        let diagnostic = match repository.install_package(&record.package, Some(serial)) {
            Ok(InstallOutcome::Installed) => {
                println!(
                    "   {}",
                    format!("✓ Updated {} to {}", record.package, record.latest).green()
                );
                updated += 1;
                continue;
            }
            Ok(InstallOutcome::Failed { diagnostic }) => diagnostic,
            Err(e @ ApmError::ToolMissing(_)) => return Err(e),
            Err(e) => Some(e.to_string()),
        };

        println!(
            "   {}",
            format!("⚠ Failed to update {}", record.package).yellow()
        );
        if let Some(diagnostic) = diagnostic {
            println!("     {}", diagnostic.dimmed());
        }
    }
    Ok(updated)
}

fn print_device_header(toolbox: &Toolbox, serial: &str) {
    println!("\n{} {}", "Checking device:".cyan().bold(), serial.bright_cyan());
    if let Some(info) = toolbox.adb.device_info(serial) {
        println!("   Device: {info}");
    }
}

fn scan_device(toolbox: &Toolbox, serial: &str) -> Result<ScanOutcome> {
    let planner = UpdatePlanner::new(&toolbox.adb, &toolbox.fdroid);
    let packages = planner.installed_packages(serial)?;

    let pb = ProgressBar::new(packages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  [{bar:40}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let outcome = planner.scan_packages(serial, &packages, |package| {
        pb.inc(1);
        pb.set_message(format!("Checking {package}"));
        ControlFlow::Continue(())
    });
    pb.finish_and_clear();

    Ok(outcome)
}

fn print_scan_outcome(outcome: &ScanOutcome) {
    println!(
        "   Checked {} package(s): {} up to date, {} update(s) found",
        outcome.scanned,
        outcome.skipped_for(SkipReason::NotNewer),
        outcome.updates.len()
    );
    if outcome.interrupted {
        println!("   {}", "⚠ Scan stopped early, results are partial".yellow());
    }

    let valid: Vec<&ClassifiedUpdate> = outcome.valid().collect();
    if !valid.is_empty() {
        println!("\n{}:", "Updates".cyan().bold());
        for update in valid {
            println!(
                "  • {} {} → {}",
                update.record.package.white().bold(),
                update.record.current.red(),
                update.record.latest.green().bold()
            );
        }
    }

    let questionable: Vec<&ClassifiedUpdate> = outcome.questionable().collect();
    if !questionable.is_empty() {
        println!("\n{}:", "Questionable updates".yellow().bold());
        for update in questionable {
            println!(
                "  • {} {} → {} ({})",
                update.record.package.white().bold(),
                update.record.current.dimmed(),
                update.record.latest.yellow().bold(),
                update.reason.dimmed()
            );
        }
    }

    let skipped: Vec<String> = outcome
        .skipped
        .iter()
        .filter(|(reason, _)| **reason != SkipReason::NotNewer)
        .map(|(reason, count)| format!("{count} {reason}"))
        .collect();
    if !skipped.is_empty() {
        println!("   {}", format!("Skipped: {}", skipped.join(", ")).dimmed());
    }
}

#[derive(Debug, Serialize)]
struct DeviceReport {
    device: String,
    updates: Vec<ClassifiedUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// One report per device; a device that cannot be scanned carries its error.
fn device_reports(
    planner: &UpdatePlanner<'_>,
    devices: &[String],
) -> Result<Vec<DeviceReport>> {
    let mut reports = Vec::with_capacity(devices.len());
    for serial in devices {
        let report = match planner.scan(serial, |_| ControlFlow::Continue(())) {
            Ok(outcome) => DeviceReport {
                device: serial.clone(),
                updates: outcome
                    .valid()
                    .chain(outcome.questionable())
                    .cloned()
                    .collect(),
                error: None,
            },
            Err(e @ ApmError::ToolMissing(_)) => return Err(e),
            Err(e) => DeviceReport {
                device: serial.clone(),
                updates: Vec::new(),
                error: Some(e.to_string()),
            },
        };
        reports.push(report);
    }
    Ok(reports)
}

/// Execute the check workflow (dry-run)
pub fn execute_check(config_path: &Path, device: Option<&str>, json: bool) -> Result<()> {
    let toolbox = Toolbox::load(config_path)?;
    let devices = toolbox.target_devices(device)?;

    if json {
        let planner = UpdatePlanner::new(&toolbox.adb, &toolbox.fdroid);
        let reports = device_reports(&planner, &devices)?;
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("{}", "Checking for available updates...".cyan().bold());
    if devices.is_empty() {
        println!("{}", "No Android devices connected".yellow());
        return Ok(());
    }

    let mut total = 0;
    for serial in &devices {
        print_device_header(&toolbox, serial);
        match scan_device(&toolbox, serial) {
            Ok(outcome) => {
                total += outcome.updates.len();
                print_scan_outcome(&outcome);
            }
            Err(e @ ApmError::ToolMissing(_)) => return Err(e),
            Err(e) => println!(
                "{}",
                format!("⚠ Error checking device {serial}: {e}").yellow()
            ),
        }
    }

    if total == 0 {
        println!("\n{}", "✨ All packages are up to date!".green().bold());
    } else {
        println!("\n{}", "To apply these updates, run:".dimmed());
        println!("  {}", "apm update".cyan());
    }
    Ok(())
}

pub fn execute_search(config_path: &Path, query: Option<&str>) -> Result<()> {
    let toolbox = Toolbox::load(config_path)?;
    let output = toolbox.fdroid.search(query)?;

    if output.trim().is_empty() {
        println!("{}", "No packages found".yellow());
    } else {
        println!("{}", output.trim_end());
    }
    Ok(())
}

pub fn execute_install(config_path: &Path, name: &str, device: Option<&str>) -> Result<()> {
    let toolbox = Toolbox::load(config_path)?;
    let mappings = toolbox.mappings();
    install_by_name(&toolbox, &mappings, name, device)
}

/// Install every package named in `file`, one per non-blank line.
pub fn execute_batch_install(config_path: &Path, file: &Path, device: Option<&str>) -> Result<()> {
    let toolbox = Toolbox::load(config_path)?;
    let content = fs::read_to_string(file).map_err(|e| {
        ApmError::Config(format!("Package list file {}: {e}", file.display()))
    })?;
    let names: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mappings = toolbox.mappings();
    let mut installed = 0;
    for name in &names {
        println!("\n{} {}...", "Installing".cyan(), name.white().bold());
        match install_by_name(&toolbox, &mappings, name, device) {
            Ok(()) => installed += 1,
            Err(e @ ApmError::ToolMissing(_)) => return Err(e),
            Err(e) => println!("   {}", format!("⚠ {e}").yellow()),
        }
    }

    println!(
        "\n{}",
        format!("Installed {installed}/{} packages", names.len())
            .green()
            .bold()
    );
    Ok(())
}

fn install_by_name(
    toolbox: &Toolbox,
    mappings: &PackageMappings,
    name: &str,
    device: Option<&str>,
) -> Result<()> {
    let resolution = mappings.resolve(name);
    print_resolution(name, &resolution);

    let package_id = resolution
        .package_id()
        .ok_or_else(|| ApmError::Unresolved(name.to_string()))?;

    match toolbox.fdroid.install_package(package_id, device)? {
        InstallOutcome::Installed => {
            println!(
                "   {}",
                format!("✓ Successfully installed {package_id}").green()
            );
            Ok(())
        }
        InstallOutcome::Failed { diagnostic } => Err(ApmError::RepositoryTool(format!(
            "Failed to install {package_id}: {}",
            diagnostic.unwrap_or_default()
        ))),
    }
}

fn print_resolution(name: &str, resolution: &Resolution) {
    match resolution {
        Resolution::PackageId(_) => {}
        Resolution::Direct { package_id, .. } => {
            println!("   Resolved '{name}' -> '{}'", package_id.bright_cyan());
        }
        Resolution::Partial {
            name: matched,
            package_id,
        } => {
            println!(
                "   Resolved '{name}' -> '{matched}' -> '{}'",
                package_id.bright_cyan()
            );
        }
        Resolution::Ambiguous(matches) => {
            println!("{}", format!("Multiple matches found for '{name}':").yellow());
            let (shown, hidden) = PackageMappings::ambiguous_preview(matches);
            for (matched, package_id) in shown {
                println!("  {matched} -> {package_id}");
            }
            if hidden > 0 {
                println!("  ... and {hidden} more matches");
            }
        }
        Resolution::Unmapped(_) => {
            println!(
                "   {}",
                format!("No mapping found for '{name}', using as-is").dimmed()
            );
        }
    }
}

pub fn execute_devices(config_path: &Path) -> Result<()> {
    let toolbox = Toolbox::load(config_path)?;
    if !toolbox.adb.is_available() {
        return Err(ApmError::ToolMissing("adb".to_string()));
    }
    let devices = toolbox.adb.list_devices()?;

    if devices.is_empty() {
        println!("{}", "No devices connected".yellow());
        return Ok(());
    }

    println!("{}", "Connected devices:".cyan().bold());
    for serial in &devices {
        match toolbox.adb.device_info(serial) {
            Some(info) => println!("  • {} ({})", serial.bright_cyan(), info.dimmed()),
            None => println!("  • {}", serial.bright_cyan()),
        }
    }
    Ok(())
}

pub fn execute_mappings(config_path: &Path) -> Result<()> {
    let mappings = load_mappings(config_path)?;

    if mappings.is_empty() {
        println!("{}", "No package mappings found".yellow());
        return Ok(());
    }

    println!("{}", "Package Mappings:".cyan().bold());
    for (name, package_id) in mappings.entries() {
        println!("  {name:<25} -> {package_id}");
    }
    Ok(())
}

pub fn execute_add_mapping(config_path: &Path, name: &str, package_id: &str) -> Result<()> {
    let mut mappings = load_mappings(config_path)?;
    mappings.add(name, package_id)?;
    println!(
        "{}",
        format!("✓ Added mapping: {name} -> {package_id}").green()
    );
    Ok(())
}

pub fn execute_remove_mapping(config_path: &Path, name: &str) -> Result<()> {
    let mut mappings = load_mappings(config_path)?;

    if mappings.remove(name)? {
        println!("{}", format!("✓ Removed mapping: {name}").green());
    } else {
        println!("{}", format!("Mapping '{name}' not found").yellow());
    }
    Ok(())
}

pub fn execute_resolve(config_path: &Path, name: &str) -> Result<()> {
    let mappings = load_mappings(config_path)?;
    let resolution = mappings.resolve(name);
    print_resolution(name, &resolution);

    match resolution.package_id() {
        Some(package_id) => println!("Resolved: {name} -> {}", package_id.green().bold()),
        None => println!("{}", format!("Could not resolve: {name}").red()),
    }
    Ok(())
}

pub fn execute_list_categories(config_path: &Path) -> Result<()> {
    let mappings = load_mappings(config_path)?;
    let categories = mappings.categories();

    if categories.is_empty() {
        println!("{}", "No mappings file found".yellow());
        return Ok(());
    }

    println!("{}", "Available Categories:".cyan().bold());
    for category in categories {
        match category.packages {
            Some(count) => println!("  {} ({count} packages)", category.name.white().bold()),
            None => println!("  {}", category.name),
        }
    }
    Ok(())
}

pub fn execute_debug_mappings(config_path: &Path, name: Option<&str>) -> Result<()> {
    let mappings = load_mappings(config_path)?;

    if mappings.is_empty() {
        println!("{}", "No mappings loaded".yellow());
        return Ok(());
    }

    println!("Mappings file: {}", mappings.path().display());
    println!("Total mappings: {}", mappings.len());

    let Some(name) = name else {
        println!("\nFirst {DEBUG_PREVIEW} mappings:");
        for (key, package_id) in mappings.entries().take(DEBUG_PREVIEW) {
            println!("  {key} -> {package_id}");
        }
        return Ok(());
    };

    println!("\nSearching for '{name}':");
    if let Some(package_id) = mappings.get(name) {
        println!("Direct match: {name} -> {}", package_id.green());
    }

    let matches = mappings.partial_matches(name);
    if matches.is_empty() {
        println!("{}", "No matches found".yellow());
    } else {
        println!("Partial matches ({}):", matches.len());
        for (matched, package_id) in matches.iter().take(DEBUG_PREVIEW) {
            println!("  {matched} -> {package_id}");
        }
    }
    Ok(())
}

pub fn execute_repo_status(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;

    if config.repositories.is_empty() {
        println!("{}", "No repositories configured".yellow());
        return Ok(());
    }

    let probe = ConnectivityProbe::new()?;
    println!("{}", "Repository Status Check:".cyan().bold());
    println!("{}", "=".repeat(60));

    for repo in &config.repositories {
        let status = if !repo.enabled {
            "DISABLED".red()
        } else if probe.is_reachable(&repo.url) {
            "ONLINE".green().bold()
        } else {
            "OFFLINE".red().bold()
        };
        println!(
            "{:<25} {} (Priority: {})",
            repo.name,
            status,
            repo.priority_label()
        );
        print_repository_details(repo, 25);
    }
    Ok(())
}

pub fn execute_repo_list(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;

    if config.repositories.is_empty() {
        println!("{}", "No repositories configured".yellow());
        return Ok(());
    }

    println!("{}", "Configured Repositories:".cyan().bold());
    println!("{}", "=".repeat(80));

    for repo in &config.repositories {
        let status = if repo.enabled {
            "✓ ENABLED ".green()
        } else {
            "✗ DISABLED".red()
        };
        println!(
            "{} {:<25} (Priority: {})",
            status,
            repo.name,
            repo.priority_label()
        );
        print_repository_details(repo, 30);
    }

    println!(
        "Total: {} repositories ({} enabled)",
        config.repositories.len(),
        config.enabled_repositories().len()
    );
    Ok(())
}

fn print_repository_details(repo: &RepositoryConfig, width: usize) {
    println!("{:<width$} {}", "  URL:", repo.url.dimmed());
    if let Some(description) = &repo.description {
        println!("{:<width$} {}", "  Description:", description);
    }
    println!();
}
