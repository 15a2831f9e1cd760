// Internal modules
mod config;
mod error;
mod fetcher;
mod http;
mod platform;
mod version;

#[cfg(test)]
mod testing;

// Re-export public types
pub use config::{
    FetchConfig, PlatformMatrix, DEFAULT_ARTIFACT_NAME, DEFAULT_CACHE_DIR, DEFAULT_LISTING_URL,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_REDIRECTS,
};
pub use error::FetchError;
pub use fetcher::{artifact_file_name, BinaryFetcher, DownloadTarget, FetchOutcome};
pub use http::{classify, get_following_redirects, Hop, HttpResponse, ReqwestTransport, Transport};
pub use platform::{current_platform_details, normalize_platform, PlatformSpec};
pub use version::{ReleaseVersion, VersionResolver};

/// Progress callback: message and percentage of the batch completed
pub type ProgressCallback = Box<dyn Fn(&str, u8) + Send + Sync>;

/// What a batch run does after one platform fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Keep going and report every platform's outcome
    #[default]
    Continue,
    /// Stop at the first failed platform
    Abort,
}

/// A single artifact fetched for one platform
#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    pub version: ReleaseVersion,
    pub target: DownloadTarget,
    pub outcome: FetchOutcome,
}

/// Outcome of one platform entry in a batch run
#[derive(Debug, Clone)]
pub struct PlatformResult {
    pub spec: PlatformSpec,
    /// Artifact file name (derived even when the download failed)
    pub file_name: String,
    /// How the artifact was obtained, if it was
    pub outcome: Option<FetchOutcome>,
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
}

/// Aggregated results of a batch run
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub version: ReleaseVersion,
    pub results: Vec<PlatformResult>,
    /// Entries never attempted because the run was aborted
    pub skipped: Vec<PlatformSpec>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.skipped.is_empty() && self.results.iter().all(|r| r.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &PlatformResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn downloaded_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Some(FetchOutcome::Downloaded { .. })))
            .count()
    }

    pub fn cached_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == Some(FetchOutcome::Cached))
            .count()
    }
}

/// Progress reporting for batch runs
struct ProgressReporter<'a> {
    callback: &'a Option<ProgressCallback>,
}

impl<'a> ProgressReporter<'a> {
    fn new(callback: &'a Option<ProgressCallback>) -> Self {
        Self { callback }
    }

    fn report(&self, message: &str, percentage: u8) {
        if let Some(ref cb) = self.callback {
            cb(message, percentage);
        } else {
            log::debug!("[{}%] {}", percentage, message);
        }
    }
}

/// Resolves the latest release once and fetches its artifacts sequentially
pub struct Downloader<T: Transport = ReqwestTransport> {
    config: FetchConfig,
    transport: T,
}

impl Downloader<ReqwestTransport> {
    /// Create a downloader backed by a blocking reqwest client
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self { config, transport })
    }
}

impl<T: Transport> Downloader<T> {
    /// Create a downloader over any transport
    pub fn with_transport(config: FetchConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Latest version advertised on the listing page
    pub fn latest_version(&self) -> Result<ReleaseVersion, FetchError> {
        VersionResolver::new(&self.config, &self.transport)?.resolve_latest_version()
    }

    /// Fetch one artifact for an already resolved version
    pub fn fetch_binary(
        &self,
        version: &ReleaseVersion,
        platform: &str,
        arch: &str,
    ) -> Result<String, FetchError> {
        self.fetcher().fetch_binary(version, platform, arch)
    }

    /// Resolve the latest version and fetch it for a single platform
    pub fn fetch_one(&self, spec: &PlatformSpec) -> Result<FetchedArtifact, FetchError> {
        let version = self.latest_version()?;
        let (target, outcome) = self.fetcher().fetch(&version, spec)?;
        Ok(FetchedArtifact {
            version,
            target,
            outcome,
        })
    }

    /// Resolve the latest version once, then fetch every entry in order
    ///
    /// A resolver failure is returned as an error. Per-platform failures are
    /// recorded in the report; with [`FailurePolicy::Abort`] the remaining
    /// entries are listed as skipped.
    pub fn fetch_matrix(
        &self,
        specs: &[PlatformSpec],
        policy: FailurePolicy,
        progress: Option<ProgressCallback>,
    ) -> Result<BatchReport, FetchError> {
        let reporter = ProgressReporter::new(&progress);

        reporter.report("Resolving latest version", 0);
        let version = self.latest_version()?;

        let fetcher = self.fetcher();
        let total = specs.len().max(1);
        let mut results = Vec::with_capacity(specs.len());
        let mut skipped = Vec::new();

        for (index, spec) in specs.iter().enumerate() {
            let file_name = artifact_file_name(&self.config.artifact_name, &version, spec);

            let result = match fetcher.fetch(&version, spec) {
                Ok((_, outcome)) => PlatformResult {
                    spec: spec.clone(),
                    file_name,
                    outcome: Some(outcome),
                    success: true,
                    error: None,
                },
                Err(e) => {
                    let message = e.full_message();
                    log::error!("Failed to fetch {} for {}: {}", version, spec, message);
                    PlatformResult {
                        spec: spec.clone(),
                        file_name,
                        outcome: None,
                        success: false,
                        error: Some(message),
                    }
                }
            };

            let failed = !result.success;
            let percentage = ((index + 1) * 100 / total) as u8;
            let verb = if failed { "Failed" } else { "Fetched" };
            reporter.report(&format!("{} {}", verb, spec), percentage);

            results.push(result);

            if failed && policy == FailurePolicy::Abort {
                skipped.extend(specs[index + 1..].iter().cloned());
                if !skipped.is_empty() {
                    log::warn!("Aborting batch, {} platforms skipped", skipped.len());
                }
                break;
            }
        }

        Ok(BatchReport {
            version,
            results,
            skipped,
        })
    }

    fn fetcher(&self) -> BinaryFetcher<'_> {
        BinaryFetcher::new(&self.config, &self.transport)
    }
}
