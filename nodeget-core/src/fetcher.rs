use log::{debug, info, warn};
use reqwest::Url;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::http::{self, Transport};
use crate::platform::PlatformSpec;
use crate::version::ReleaseVersion;

/// Name, remote location and local path of one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub file_name: String,
    pub url: String,
    pub local_path: PathBuf,
}

impl DownloadTarget {
    /// Derive the target from the same version/platform/arch triple for name and URL
    pub fn new(config: &FetchConfig, version: &ReleaseVersion, spec: &PlatformSpec) -> Self {
        let file_name = artifact_file_name(&config.artifact_name, version, spec);
        Self {
            url: format!("{}{}", config.download_prefix(), file_name),
            local_path: config.cache_dir.join(&file_name),
            file_name,
        }
    }
}

/// `<artifact>-v<version>-<platform>-<arch>.<ext>`, `zip` for Windows and `tar.gz` otherwise
pub fn artifact_file_name(artifact_name: &str, version: &ReleaseVersion, spec: &PlatformSpec) -> String {
    let extension = if spec.is_windows() { "zip" } else { "tar.gz" };
    format!(
        "{}-v{}-{}-{}.{}",
        artifact_name, version, spec.platform, spec.arch, extension
    )
}

/// How a fetch was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Transferred over the network, on the given attempt
    Downloaded { attempts: u32 },
    /// File already present in the cache directory; no request was made
    Cached,
}

/// Downloads artifacts into the cache directory with bounded retry
pub struct BinaryFetcher<'a> {
    config: &'a FetchConfig,
    transport: &'a dyn Transport,
}

impl<'a> BinaryFetcher<'a> {
    pub fn new(config: &'a FetchConfig, transport: &'a dyn Transport) -> Self {
        Self { config, transport }
    }

    /// Fetch one artifact and return its file name
    pub fn fetch_binary(
        &self,
        version: &ReleaseVersion,
        platform: &str,
        arch: &str,
    ) -> Result<String, FetchError> {
        let spec = PlatformSpec::new(platform, arch);
        let (target, _) = self.fetch(version, &spec)?;
        Ok(target.file_name)
    }

    /// Fetch one artifact, reporting whether it came from the cache
    pub fn fetch(
        &self,
        version: &ReleaseVersion,
        spec: &PlatformSpec,
    ) -> Result<(DownloadTarget, FetchOutcome), FetchError> {
        let target = DownloadTarget::new(self.config, version, spec);

        fs::create_dir_all(&self.config.cache_dir).map_err(|e| {
            FetchError::io(
                format!(
                    "Failed to create cache directory {}",
                    self.config.cache_dir.display()
                ),
                e,
            )
        })?;

        // Existence only; a truncated earlier download counts as a hit
        if target.local_path.exists() {
            info!(
                "File {} already exists. No need to download.",
                target.file_name
            );
            return Ok((target, FetchOutcome::Cached));
        }

        let url = http::parse_url(&target.url)?;
        let max_attempts = self.config.max_attempts.max(1);
        info!("Downloading {} {} for {}", self.config.artifact_name, version, spec);

        let mut attempt = 1;
        loop {
            match self.attempt(&url, &target.local_path) {
                Ok(bytes) => {
                    info!("Downloaded {} ({} bytes)", target.file_name, bytes);
                    return Ok((target, FetchOutcome::Downloaded { attempts: attempt }));
                }
                Err(err) => {
                    warn!(
                        "Download attempt {}/{} for {} failed: {}",
                        attempt, max_attempts, target.file_name, err
                    );
                    remove_partial(&target.local_path);

                    if attempt >= max_attempts {
                        return Err(FetchError::DownloadExhausted {
                            file_name: target.file_name,
                            attempts: attempt,
                            source: Box::new(err),
                        });
                    }

                    info!("Retrying download of {}...", target.file_name);
                    if !self.config.retry_delay.is_zero() {
                        thread::sleep(self.config.retry_delay);
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// One GET (following redirects) streamed straight into `path`
    fn attempt(&self, url: &Url, path: &Path) -> Result<u64, FetchError> {
        let (final_url, mut response) =
            http::get_following_redirects(self.transport, url, self.config.max_redirects)?;
        debug!("Streaming {} to {}", final_url, path.display());

        let file = File::create(path)
            .map_err(|e| FetchError::io(format!("Failed to create {}", path.display()), e))?;
        let mut writer = BufWriter::new(file);

        let bytes = io::copy(&mut response.body, &mut writer).map_err(|e| {
            FetchError::network(final_url.as_str(), format!("transfer interrupted: {}", e))
        })?;
        writer
            .flush()
            .map_err(|e| FetchError::io(format!("Failed to write {}", path.display()), e))?;

        Ok(bytes)
    }
}

fn remove_partial(path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed partial file {}", path.display()),
        Err(e) => warn!("Failed to remove partial file {}: {}", path.display(), e),
    }
}
