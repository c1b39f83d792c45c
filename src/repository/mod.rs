use crate::error::Result;

pub mod connectivity;
pub mod fdroidcl;

pub use connectivity::ConnectivityProbe;
pub use fdroidcl::FdroidClient;

/// Outcome of asking the repository tool to install a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    Failed { diagnostic: Option<String> },
}

/// Result of refreshing the local copy of the repository indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexUpdate {
    pub success: bool,
    pub errors: Vec<String>,
}

/// Access to the package repositories through the repository client tool.
pub trait RepositoryClient {
    /// Raw, human-oriented description of a package, `None` if the
    /// repositories do not know it.
    fn fetch_package_info_text(&self, package: &str) -> Result<Option<String>>;

    /// Install (or upgrade) a package on the given device, or on the tool's
    /// default device when `device` is `None`.
    fn install_package(&self, package: &str, device: Option<&str>) -> Result<InstallOutcome>;

    fn search(&self, query: Option<&str>) -> Result<String>;

    fn update_index(&self) -> Result<IndexUpdate>;
}
