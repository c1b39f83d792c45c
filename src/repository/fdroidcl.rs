use super::{IndexUpdate, InstallOutcome, RepositoryClient};
use crate::error::{ApmError, Result};
use crate::utils::run_captured;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const INDEX_UPDATE_TIMEOUT: Duration = Duration::from_secs(120);

/// Variable fdroidcl (through adb) reads to pick the target device.
const SERIAL_ENV: &str = "ANDROID_SERIAL";

/// Repository client driving the `fdroidcl` command line tool.
pub struct FdroidClient {
    program: PathBuf,
    leading_args: Vec<String>,
    lookup_timeout: Duration,
}

impl FdroidClient {
    pub fn new<P: AsRef<Path>>(program: P, lookup_timeout: Duration) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            leading_args: Vec::new(),
            lookup_timeout,
        }
    }

    /// Arguments placed before every subcommand, for wrapper launchers.
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.leading_args).args(args);
        command
    }
}

impl RepositoryClient for FdroidClient {
    fn fetch_package_info_text(&self, package: &str) -> Result<Option<String>> {
        let output = run_captured(self.command(&["show", package]), Some(self.lookup_timeout))?;

        if !output.success() {
            tracing::debug!(
                package,
                stderr = output.stderr.trim(),
                "fdroidcl show returned no package"
            );
            return Ok(None);
        }

        Ok(Some(output.stdout))
    }

    fn install_package(&self, package: &str, device: Option<&str>) -> Result<InstallOutcome> {
        let mut command = self.command(&["install", package]);
        if let Some(serial) = device {
            command.env(SERIAL_ENV, serial);
        }

        let output = run_captured(command, None)?;
        if output.success() {
            Ok(InstallOutcome::Installed)
        } else {
            Ok(InstallOutcome::Failed {
                diagnostic: output.diagnostic(),
            })
        }
    }

    fn search(&self, query: Option<&str>) -> Result<String> {
        let mut args = vec!["search"];
        args.extend(query);

        let output = run_captured(self.command(&args), Some(self.lookup_timeout))?;
        if !output.success() {
            return Err(ApmError::RepositoryTool(format!(
                "fdroidcl search failed: {}",
                output.diagnostic().unwrap_or_default()
            )));
        }

        Ok(output.stdout)
    }

    fn update_index(&self) -> Result<IndexUpdate> {
        let output = run_captured(self.command(&["update"]), Some(INDEX_UPDATE_TIMEOUT))?;

        let errors = output
            .stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(IndexUpdate {
            success: output.success(),
            errors,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Client running a shell script in place of fdroidcl.
    fn fake_client(dir: &TempDir, body: &str) -> FdroidClient {
        let script = dir.path().join("fdroidcl.sh");
        fs::write(&script, format!("{body}\n")).unwrap();
        FdroidClient::new("sh", Duration::from_secs(5))
            .with_leading_args(vec![script.display().to_string()])
    }

    #[test]
    fn show_returns_stdout_on_success() {
        let dir = TempDir::new().unwrap();
        let client = fake_client(&dir, r#"echo "Package: $2"; echo "Version: 1.4.2 (99)""#);

        let text = client.fetch_package_info_text("org.example").unwrap().unwrap();
        assert!(text.contains("Package: org.example"));
        assert!(text.contains("Version: 1.4.2 (99)"));
    }

    #[test]
    fn show_failure_means_unknown_package() {
        let dir = TempDir::new().unwrap();
        let client = fake_client(&dir, "echo 'could not find app' >&2; exit 1");

        assert_eq!(client.fetch_package_info_text("org.missing").unwrap(), None);
    }

    #[test]
    fn install_passes_serial_to_child_only() {
        let dir = TempDir::new().unwrap();
        let client = fake_client(
            &dir,
            r#"[ "$ANDROID_SERIAL" = "emulator-5554" ] || { echo "wrong serial: $ANDROID_SERIAL" >&2; exit 1; }"#,
        );

        assert_eq!(
            client.install_package("org.example", Some("emulator-5554")).unwrap(),
            InstallOutcome::Installed
        );
        assert!(std::env::var("ANDROID_SERIAL").map_or(true, |v| v != "emulator-5554"));

        match client.install_package("org.example", Some("other")).unwrap() {
            InstallOutcome::Failed { diagnostic } => {
                assert_eq!(diagnostic.as_deref(), Some("wrong serial: other"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn index_update_collects_stderr_lines() {
        let dir = TempDir::new().unwrap();
        let client = fake_client(&dir, "echo 'izzyondroid: 404' >&2; echo '' >&2; exit 2");

        let update = client.update_index().unwrap();
        assert!(!update.success);
        assert_eq!(update.errors, vec!["izzyondroid: 404".to_string()]);
    }

    #[test]
    fn missing_tool_is_reported() {
        let client = FdroidClient::new("/nonexistent/fdroidcl", Duration::from_secs(1));
        assert!(matches!(client.search(None), Err(ApmError::ToolMissing(_))));
    }
}
