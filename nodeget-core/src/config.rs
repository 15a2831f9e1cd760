use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::platform::PlatformSpec;

/// Listing page for the current LTS line; artifacts live in the same directory
pub const DEFAULT_LISTING_URL: &str = "https://nodejs.org/dist/latest-v20.x/";

/// Prefix of every artifact name on the listing page
pub const DEFAULT_ARTIFACT_NAME: &str = "node";

/// Directory downloaded archives are written to
pub const DEFAULT_CACHE_DIR: &str = "assets";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Configuration shared by the resolver, the fetcher and the orchestration layer
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Listing page scanned for the version token. Also the download prefix.
    pub listing_url: String,
    /// Artifact prefix, e.g. "node" in `node-v20.1.0-linux-x64.tar.gz`
    pub artifact_name: String,
    /// Where archives are stored; created on demand
    pub cache_dir: PathBuf,
    /// Download attempts per artifact before giving up
    pub max_attempts: u32,
    /// Redirect hops followed per request
    pub max_redirects: u32,
    /// Timeout applied to every request
    pub request_timeout: Duration,
    /// Pause between failed download attempts
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            request_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_secs(1),
            user_agent: format!("nodeget/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchConfig {
    /// Download prefix with a guaranteed trailing slash
    pub fn download_prefix(&self) -> String {
        if self.listing_url.ends_with('/') {
            self.listing_url.clone()
        } else {
            format!("{}/", self.listing_url)
        }
    }
}

/// List of platform/arch pairs fetched by a batch run
///
/// File format: `{"configurations": [{"platform": "win", "arch": "x64"}, ...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformMatrix {
    pub configurations: Vec<PlatformSpec>,
}

impl PlatformMatrix {
    /// Load a matrix from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read platform matrix {}", path.display()))?;
        let matrix: PlatformMatrix = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse platform matrix {}", path.display()))?;

        if matrix.is_empty() {
            anyhow::bail!("Platform matrix {} has no configurations", path.display());
        }

        Ok(matrix)
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}

impl Default for PlatformMatrix {
    fn default() -> Self {
        let pairs = [
            ("win", "x64"),
            ("win", "arm64"),
            ("linux", "x64"),
            ("linux", "arm64"),
            ("darwin", "x64"),
            ("darwin", "arm64"),
        ];

        Self {
            configurations: pairs
                .iter()
                .map(|(platform, arch)| PlatformSpec::new(*platform, *arch))
                .collect(),
        }
    }
}
