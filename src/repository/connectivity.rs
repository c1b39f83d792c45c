use crate::error::{ApmError, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::time::Duration;
use url::Url;

const INDEX_FILE: &str = "index-v1.jar";
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP reachability check for F-Droid style repositories.
pub struct ConnectivityProbe {
    client: Client,
}

impl ConnectivityProbe {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .user_agent(concat!("apm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApmError::Network(e.to_string()))?;

        Ok(Self { client })
    }

    /// HEAD the repository index; 200 and 304 count as reachable.
    pub fn is_reachable(&self, repo_url: &str) -> bool {
        let index_url = match index_url(repo_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(repo_url, error = %e, "skipping probe");
                return false;
            }
        };

        match self.client.head(index_url.as_str()).send() {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(url = %index_url, %status, "probe response");
                matches!(status, StatusCode::OK | StatusCode::NOT_MODIFIED)
            }
            Err(e) => {
                tracing::debug!(url = %index_url, error = %e, "probe failed");
                false
            }
        }
    }
}

/// Location of the signed index inside a repository.
pub fn index_url(repo_url: &str) -> Result<Url> {
    let base = if repo_url.ends_with('/') {
        repo_url.to_string()
    } else {
        format!("{repo_url}/")
    };

    let parsed = Url::parse(&base)
        .map_err(|_| ApmError::Config(format!("Invalid repository URL: {repo_url}")))?;

    match parsed.scheme() {
        "https" | "http" => {}
        scheme => {
            return Err(ApmError::Config(format!(
                "Unsupported repository scheme: {scheme}"
            )));
        }
    }

    parsed
        .join(INDEX_FILE)
        .map_err(|e| ApmError::Config(format!("Invalid repository URL {repo_url}: {e}")))
}
