use super::DeviceBridge;
use crate::error::{ApmError, Result};
use crate::utils::{expand_home, run_captured};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const ADB_TIMEOUT: Duration = Duration::from_secs(30);

const COMMON_ADB_LOCATIONS: &[&str] = &[
    "/usr/bin/adb",
    "/usr/local/bin/adb",
    "~/android-sdk/platform-tools/adb",
    "~/Android/Sdk/platform-tools/adb",
    "/opt/android-sdk/platform-tools/adb",
];

/// Device bridge backed by the `adb` command line tool.
pub struct AdbBridge {
    adb_path: Option<PathBuf>,
}

impl AdbBridge {
    pub fn new(adb_path: Option<PathBuf>) -> Self {
        Self { adb_path }
    }

    /// Locate adb: explicit path first, then `PATH`, then common SDK locations.
    pub fn discover(configured: Option<&Path>) -> Self {
        let adb_path = configured
            .map(expand_home)
            .filter(|p| is_executable(p))
            .or_else(find_in_path)
            .or_else(|| {
                COMMON_ADB_LOCATIONS
                    .iter()
                    .map(expand_home)
                    .find(|p| is_executable(p))
            });

        match &adb_path {
            Some(path) => tracing::debug!(adb = %path.display(), "using adb"),
            None => tracing::warn!("adb not found in PATH; install Android SDK platform-tools"),
        }

        Self::new(adb_path)
    }

    pub fn is_available(&self) -> bool {
        self.adb_path.is_some()
    }

    fn run(&self, device: Option<&str>, args: &[&str]) -> Result<Option<String>> {
        let Some(adb) = &self.adb_path else {
            return Ok(None);
        };

        let mut command = Command::new(adb);
        if let Some(serial) = device.filter(|s| !s.is_empty()) {
            command.args(["-s", serial]);
        }
        command.args(args);

        let output = run_captured(command, Some(ADB_TIMEOUT))?;
        if !output.success() {
            return Err(ApmError::DeviceBridge(format!(
                "adb {} failed: {}",
                args.join(" "),
                output.diagnostic().unwrap_or_default()
            )));
        }

        Ok(Some(output.stdout.trim().to_string()))
    }

    fn getprop(&self, device: &str, prop: &str) -> Option<String> {
        self.run(Some(device), &["shell", "getprop", prop])
            .ok()
            .flatten()
            .filter(|v| !v.is_empty())
    }
}

impl DeviceBridge for AdbBridge {
    fn list_devices(&self) -> Result<Vec<String>> {
        Ok(self
            .run(None, &["devices"])?
            .map(|out| parse_devices(&out))
            .unwrap_or_default())
    }

    fn list_installed_packages(&self, device: &str) -> Result<Vec<String>> {
        // -3 restricts the listing to third-party apps
        Ok(self
            .run(Some(device), &["shell", "pm", "list", "packages", "-3"])?
            .map(|out| parse_packages(&out))
            .unwrap_or_default())
    }

    fn installed_version(&self, device: &str, package: &str) -> Result<Option<String>> {
        Ok(self
            .run(Some(device), &["shell", "dumpsys", "package", package])?
            .and_then(|out| parse_version_name(&out)))
    }

    fn device_info(&self, device: &str) -> Option<String> {
        let brand = self.getprop(device, "ro.product.brand")?;
        let model = self.getprop(device, "ro.product.model")?;
        Some(format!("{brand} {model}"))
    }
}

/// Serials of attached devices in the `device` state (header line skipped).
pub fn parse_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let serial = fields.next()?;
            (fields.next() == Some("device")).then(|| serial.to_string())
        })
        .collect()
}

pub fn parse_packages(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .map(|pkg| pkg.trim().to_string())
        .filter(|pkg| !pkg.is_empty())
        .collect()
}

/// First `versionName=` value from `dumpsys package` output.
pub fn parse_version_name(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (_, rest) = line.split_once("versionName=")?;
        rest.split_whitespace().next().map(str::to_string)
    })
}

fn find_in_path() -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(adb_binary_name()))
        .find(|p| is_executable(p))
}

fn adb_binary_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "adb.exe"
    } else {
        "adb"
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attached_devices() {
        let output = "List of devices attached\n\
                      emulator-5554\tdevice\n\
                      R58M12ABCDE\tunauthorized\n\
                      192.168.1.20:5555\tdevice\n\n";
        assert_eq!(
            parse_devices(output),
            vec!["emulator-5554".to_string(), "192.168.1.20:5555".to_string()]
        );
    }

    #[test]
    fn parses_package_listing() {
        let output = "package:org.fdroid.fdroid\npackage:org.videolan.vlc\r\nnoise\n";
        assert_eq!(
            parse_packages(output),
            vec!["org.fdroid.fdroid".to_string(), "org.videolan.vlc".to_string()]
        );
    }

    #[test]
    fn parses_version_name_from_dumpsys() {
        let output = "Packages:\n  Package [org.videolan.vlc] (1a2b):\n    versionCode=13050405 minSdk=21\n    versionName=3.5.4 Beta 5\n    versionName=9.9\n";
        assert_eq!(parse_version_name(output), Some("3.5.4".to_string()));
        assert_eq!(parse_version_name("nothing here"), None);
    }

    #[test]
    fn missing_adb_reports_no_devices() {
        let bridge = AdbBridge::new(None);
        assert!(!bridge.is_available());
        assert!(bridge.list_devices().unwrap().is_empty());
        assert!(bridge.list_installed_packages("abc").unwrap().is_empty());
        assert_eq!(bridge.installed_version("abc", "org.x").unwrap(), None);
        assert_eq!(bridge.device_info("abc"), None);
    }
}
