use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No configuration file found (searched: {})", display_paths(.0))]
    ConfigNotFound(Vec<PathBuf>),

    #[error("Package mappings error: {0}")]
    Mappings(String),

    #[error("{0} not found. Please install it first.")]
    ToolMissing(String),

    #[error("Device bridge failed: {0}")]
    DeviceBridge(String),

    #[error("Repository tool failed: {0}")]
    RepositoryTool(String),

    #[error("'{command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not resolve package name: {0}")]
    Unresolved(String),

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ApmError>;
