use super::plan::{ClassifiedUpdate, ScanOutcome, SkipReason, UpdateRecord};
use crate::device::DeviceBridge;
use crate::error::Result;
use crate::repository::RepositoryClient;
use crate::version::{Verdict, VersionAnalyzer};
use std::ops::ControlFlow;

/// Builds update plans by pairing device versions with repository data.
pub struct UpdatePlanner<'a> {
    device: &'a dyn DeviceBridge,
    repository: &'a dyn RepositoryClient,
}

impl<'a> UpdatePlanner<'a> {
    pub fn new(device: &'a dyn DeviceBridge, repository: &'a dyn RepositoryClient) -> Self {
        Self { device, repository }
    }

    /// Check every third-party package installed on `device`.
    ///
    /// `on_package` runs before each package and may stop the scan; updates
    /// found up to that point are kept. Only failing to list the installed
    /// packages is an error, per-package failures are counted as skips.
    pub fn scan<F>(&self, device: &str, on_package: F) -> Result<ScanOutcome>
    where
        F: FnMut(&str) -> ControlFlow<()>,
    {
        let packages = self.device.list_installed_packages(device)?;
        Ok(self.scan_packages(device, &packages, on_package))
    }

    /// Same as [`scan`](Self::scan) over an already listed set of packages.
    pub fn scan_packages<F>(
        &self,
        device: &str,
        packages: &[String],
        mut on_package: F,
    ) -> ScanOutcome
    where
        F: FnMut(&str) -> ControlFlow<()>,
    {
        let mut outcome = ScanOutcome::default();

        for package in packages {
            if on_package(package.as_str()).is_break() {
                outcome.interrupted = true;
                break;
            }

            outcome.scanned += 1;
            match self.check_package(device, package) {
                Ok(update) => outcome.updates.push(update),
                Err(reason) => {
                    tracing::debug!(package = %package, %reason, "no update");
                    outcome.record_skip(reason);
                }
            }
        }

        outcome
    }

    pub fn installed_packages(&self, device: &str) -> Result<Vec<String>> {
        self.device.list_installed_packages(device)
    }

    pub fn check_package(
        &self,
        device: &str,
        package: &str,
    ) -> std::result::Result<ClassifiedUpdate, SkipReason> {
        let current = match self.device.installed_version(device, package) {
            Ok(Some(version)) => version,
            Ok(None) => return Err(SkipReason::CollaboratorUnavailable),
            Err(e) => {
                tracing::warn!(package, error = %e, "could not read installed version");
                return Err(SkipReason::CollaboratorUnavailable);
            }
        };

        let raw_text = match self.repository.fetch_package_info_text(package) {
            Ok(Some(text)) => text,
            Ok(None) => return Err(SkipReason::CollaboratorUnavailable),
            Err(e) => {
                tracing::warn!(package, error = %e, "repository lookup failed");
                return Err(SkipReason::CollaboratorUnavailable);
            }
        };

        Self::evaluate(package, &current, &raw_text)
    }

    /// Decide whether `raw_text` advertises an upgrade over `current`.
    pub fn evaluate(
        package: &str,
        current: &str,
        raw_text: &str,
    ) -> std::result::Result<ClassifiedUpdate, SkipReason> {
        let latest =
            VersionAnalyzer::extract_latest_version(raw_text).ok_or(SkipReason::ExtractionMiss)?;

        if !VersionAnalyzer::is_valid_version(current) || !VersionAnalyzer::is_valid_version(&latest)
        {
            return Err(SkipReason::ValidationFailure);
        }

        if !VersionAnalyzer::is_newer(&latest, current) {
            return Err(SkipReason::NotNewer);
        }

        let verdict = if VersionAnalyzer::is_questionable(current, &latest) {
            VersionAnalyzer::classify(current, &latest)
        } else {
            Verdict::valid()
        };
        let record = UpdateRecord {
            package: package.to_string(),
            current: current.to_string(),
            latest,
        };
        Ok(ClassifiedUpdate::new(record, verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApmError;
    use crate::repository::{IndexUpdate, InstallOutcome};
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeDevice {
        packages: Vec<String>,
        versions: HashMap<String, String>,
        broken: Vec<String>,
    }

    impl FakeDevice {
        fn with(mut self, package: &str, version: &str) -> Self {
            self.packages.push(package.into());
            self.versions.insert(package.into(), version.into());
            self
        }
    }

    impl DeviceBridge for FakeDevice {
        fn list_devices(&self) -> Result<Vec<String>> {
            Ok(vec!["emulator-5554".into()])
        }

        fn list_installed_packages(&self, _device: &str) -> Result<Vec<String>> {
            Ok(self.packages.clone())
        }

        fn installed_version(&self, _device: &str, package: &str) -> Result<Option<String>> {
            if self.broken.iter().any(|p| p == package) {
                return Err(ApmError::DeviceBridge("dumpsys failed".into()));
            }
            Ok(self.versions.get(package).cloned())
        }

        fn device_info(&self, _device: &str) -> Option<String> {
            None
        }
    }

    #[derive(Default)]
    struct FakeRepository {
        info: HashMap<String, String>,
        timeouts: Vec<String>,
    }

    impl FakeRepository {
        fn with(mut self, package: &str, text: &str) -> Self {
            self.info.insert(package.into(), text.into());
            self
        }
    }

    impl RepositoryClient for FakeRepository {
        fn fetch_package_info_text(&self, package: &str) -> Result<Option<String>> {
            if self.timeouts.iter().any(|p| p == package) {
                return Err(ApmError::Timeout {
                    command: format!("fdroidcl show {package}"),
                    seconds: 30,
                });
            }
            Ok(self.info.get(package).cloned())
        }

        fn install_package(&self, _package: &str, _device: Option<&str>) -> Result<InstallOutcome> {
            Ok(InstallOutcome::Installed)
        }

        fn search(&self, _query: Option<&str>) -> Result<String> {
            Ok(String::new())
        }

        fn update_index(&self) -> Result<IndexUpdate> {
            Ok(IndexUpdate {
                success: true,
                errors: Vec::new(),
            })
        }
    }

    #[test]
    fn beta_update_is_questionable_and_left_out_by_default() {
        let update =
            UpdatePlanner::evaluate("org.example", "2.1.0", "Version: 2.3.0-beta (12)\n").unwrap();
        assert_eq!(update.record.latest, "2.3.0-beta");
        assert!(update.is_questionable());

        let outcome = ScanOutcome {
            updates: vec![update],
            ..Default::default()
        };
        let plan = outcome.into_plan(|_| false);
        assert!(plan.is_empty());
        assert_eq!(plan.declined.len(), 1);
    }

    #[test]
    fn plain_minor_update_is_planned() {
        let update = UpdatePlanner::evaluate("org.example", "1.0", "Version: 1.1\n").unwrap();
        assert!(!update.is_questionable());

        let plan = ScanOutcome {
            updates: vec![update],
            ..Default::default()
        }
        .into_plan(|_| false);
        assert_eq!(plan.records.len(), 1);
        assert_eq!(plan.records[0].to_string(), "org.example, 1.0, 1.1");
    }

    #[test]
    fn evaluate_reports_skip_reasons() {
        assert_eq!(
            UpdatePlanner::evaluate("p", "1.0", "nothing useful").unwrap_err(),
            SkipReason::ExtractionMiss
        );
        assert_eq!(
            UpdatePlanner::evaluate("p", "unknown", "Version: 1.1").unwrap_err(),
            SkipReason::ValidationFailure
        );
        assert_eq!(
            UpdatePlanner::evaluate("p", "1.1", "Version: 1.1").unwrap_err(),
            SkipReason::NotNewer
        );
        assert_eq!(
            UpdatePlanner::evaluate("p", "2.0", "Version: 1.9").unwrap_err(),
            SkipReason::NotNewer
        );
    }

    #[test]
    fn scan_skips_failures_and_keeps_going() {
        let mut device = FakeDevice::default()
            .with("org.ok", "1.0")
            .with("org.slow", "1.0")
            .with("org.broken", "1.0")
            .with("org.current", "3.0.0")
            .with("org.unknown", "1.0");
        device.broken.push("org.broken".into());

        let mut repository = FakeRepository::default()
            .with("org.ok", "Version: 1.2 (12)\n")
            .with("org.slow", "Version: 9.0\n")
            .with("org.broken", "Version: 2.0\n")
            .with("org.current", "Version: 3.0.0 (300)\n");
        repository.timeouts.push("org.slow".into());

        let planner = UpdatePlanner::new(&device, &repository);
        let outcome = planner
            .scan("emulator-5554", |_| ControlFlow::Continue(()))
            .unwrap();

        assert_eq!(outcome.scanned, 5);
        assert!(!outcome.interrupted);
        assert_eq!(outcome.updates.len(), 1);
        assert_eq!(outcome.updates[0].record.package, "org.ok");
        assert_eq!(outcome.skipped_for(SkipReason::CollaboratorUnavailable), 3);
        assert_eq!(outcome.skipped_for(SkipReason::NotNewer), 1);
    }

    #[test]
    fn interrupted_scan_keeps_partial_results() {
        let device = FakeDevice::default()
            .with("org.a", "1.0")
            .with("org.b", "1.0")
            .with("org.c", "1.0");
        let repository = FakeRepository::default()
            .with("org.a", "Version: 1.1")
            .with("org.b", "Version: 1.1")
            .with("org.c", "Version: 1.1");

        let planner = UpdatePlanner::new(&device, &repository);
        let mut seen = 0;
        let outcome = planner
            .scan("emulator-5554", |_| {
                seen += 1;
                if seen > 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();

        assert!(outcome.interrupted);
        assert_eq!(outcome.scanned, 2);
        let packages: Vec<_> = outcome
            .updates
            .iter()
            .map(|u| u.record.package.as_str())
            .collect();
        assert_eq!(packages, vec!["org.a", "org.b"]);
    }
}
