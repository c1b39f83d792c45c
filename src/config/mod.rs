use crate::error::{ApmError, Result};
use crate::utils::expand_home;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
const USER_CONFIG: &str = "~/.config/apm/config.yaml";
const DEFAULT_MAPPINGS: &str = "~/.config/apm/package_mappings.yaml";

/// Top level `config.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
    #[serde(default)]
    pub updates: UpdateSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    pub mappings_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub priority: Option<i64>,
    pub description: Option<String>,
}

impl RepositoryConfig {
    pub fn priority_label(&self) -> String {
        self.priority
            .map(|p| p.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpdateSettings {
    pub continue_on_repo_failure: bool,
    pub include_questionable: bool,
    pub lookup_timeout_secs: u64,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            continue_on_repo_failure: true,
            include_questionable: false,
            lookup_timeout_secs: 30,
        }
    }
}

impl UpdateSettings {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub adb: Option<PathBuf>,
    pub fdroidcl: PathBuf,
    pub fdroidcl_args: Vec<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            adb: None,
            fdroidcl: PathBuf::from("fdroidcl"),
            fdroidcl_args: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load the first usable config: `explicit`, then the user config, then
    /// `./config.yaml`. There is no built-in fallback.
    pub fn load(explicit: &Path) -> Result<Self> {
        let locations = Self::search_locations(explicit);

        for path in &locations {
            if !path.exists() {
                continue;
            }

            match Self::from_file(path) {
                Ok(Some(config)) => {
                    tracing::debug!(path = %path.display(), "loaded configuration");
                    return Ok(config);
                }
                Ok(None) => tracing::warn!(path = %path.display(), "configuration file is empty"),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping configuration"),
            }
        }

        Err(ApmError::ConfigNotFound(locations))
    }

    pub fn search_locations(explicit: &Path) -> Vec<PathBuf> {
        let mut locations = Vec::new();
        for candidate in [
            expand_home(explicit),
            expand_home(USER_CONFIG),
            PathBuf::from(DEFAULT_CONFIG_FILE),
        ] {
            if !locations.contains(&candidate) {
                locations.push(candidate);
            }
        }
        locations
    }

    fn from_file(path: &Path) -> Result<Option<Self>> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| {
            ApmError::Config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Parse YAML; an empty document gives `None`.
    pub fn parse(content: &str) -> Result<Option<Self>> {
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_yaml::from_str::<Option<Self>>(content)?)
    }

    pub fn enabled_repositories(&self) -> Vec<&RepositoryConfig> {
        self.repositories.iter().filter(|r| r.enabled).collect()
    }

    pub fn mappings_path(&self) -> PathBuf {
        match &self.mappings_path {
            Some(path) => expand_home(path),
            None => expand_home(DEFAULT_MAPPINGS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
repositories:
  - name: F-Droid
    url: https://f-droid.org/repo
    priority: 1
    description: Main repository
  - name: IzzyOnDroid
    url: https://apt.izzysoft.de/fdroid/repo
    enabled: false
updates:
  include_questionable: true
tools:
  fdroidcl: /opt/fdroidcl
"#;

    #[test]
    fn parses_repositories_with_defaults() {
        let config = Config::parse(SAMPLE).unwrap().unwrap();
        assert_eq!(config.repositories.len(), 2);
        assert!(config.repositories[0].enabled);
        assert_eq!(config.repositories[0].priority_label(), "1");
        assert_eq!(config.repositories[1].priority_label(), "N/A");

        let enabled = config.enabled_repositories();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "F-Droid");

        assert!(config.updates.continue_on_repo_failure);
        assert!(config.updates.include_questionable);
        assert_eq!(config.updates.lookup_timeout(), Duration::from_secs(30));
        assert_eq!(config.tools.fdroidcl, PathBuf::from("/opt/fdroidcl"));
        assert!(config.tools.adb.is_none());
    }

    #[test]
    fn wrapper_args_for_fdroidcl() {
        let yaml = "tools:\n  fdroidcl: flatpak\n  fdroidcl_args: [run, org.example.fdroidcl]\n";
        let config = Config::parse(yaml).unwrap().unwrap();
        assert_eq!(config.tools.fdroidcl, PathBuf::from("flatpak"));
        assert_eq!(config.tools.fdroidcl_args, vec!["run", "org.example.fdroidcl"]);
        assert!(Config::parse(SAMPLE).unwrap().unwrap().tools.fdroidcl_args.is_empty());
    }

    #[test]
    fn empty_document_is_none() {
        assert!(Config::parse("").unwrap().is_none());
        assert!(Config::parse("   \n").unwrap().is_none());
        assert!(Config::parse("~\n").unwrap().is_none());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(Config::parse("repositories: [unclosed").is_err());
    }

    #[test]
    fn load_prefers_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.yaml");
        fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.repositories[0].name, "F-Droid");
    }

    #[test]
    fn explicit_path_is_searched_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.yaml");
        let locations = Config::search_locations(&path);
        assert_eq!(locations[0], path);
        assert!(locations.contains(&PathBuf::from(DEFAULT_CONFIG_FILE)));
    }

    #[test]
    fn mappings_path_defaults_under_config_dir() {
        let config = Config::parse("repositories: []").unwrap().unwrap();
        assert!(config.mappings_path().ends_with(".config/apm/package_mappings.yaml"));
    }
}
