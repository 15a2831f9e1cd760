use log::{debug, info};
use regex::Regex;
use semver::Version;
use std::fmt;
use std::io::Read;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::http::{self, Transport};

/// Release version exactly as it appears on the listing page
///
/// Archive names and URLs are built from the captured text, so `20.01.0`
/// stays `20.01.0`. The numeric [`Version`] is kept alongside for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    raw: String,
    semver: Version,
}

impl ReleaseVersion {
    /// Parse `<major>.<minor>.<patch>` made of ASCII digits
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split('.');
        let major = numeric_part(parts.next()?)?;
        let minor = numeric_part(parts.next()?)?;
        let patch = numeric_part(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            raw: raw.to_string(),
            semver: Version::new(major, minor, patch),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn semver(&self) -> &Version {
        &self.semver
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn numeric_part(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Finds the newest release advertised on the listing page
pub struct VersionResolver<'a> {
    config: &'a FetchConfig,
    transport: &'a dyn Transport,
    pattern: Regex,
}

impl<'a> VersionResolver<'a> {
    pub fn new(config: &'a FetchConfig, transport: &'a dyn Transport) -> Result<Self, FetchError> {
        Ok(Self {
            config,
            transport,
            pattern: version_pattern(&config.artifact_name)?,
        })
    }

    /// Fetch the listing page and return the first version token on it
    ///
    /// Not retried: a transport or status failure propagates immediately.
    pub fn resolve_latest_version(&self) -> Result<ReleaseVersion, FetchError> {
        let listing_url = http::parse_url(&self.config.listing_url)?;
        info!("Resolving latest version from {}", listing_url);

        let (final_url, mut response) = http::get_following_redirects(
            self.transport,
            &listing_url,
            self.config.max_redirects,
        )?;

        let mut raw = Vec::new();
        response
            .body
            .read_to_end(&mut raw)
            .map_err(|e| FetchError::network(final_url.as_str(), e))?;
        let body = String::from_utf8_lossy(&raw);
        debug!("Listing page is {} bytes", raw.len());

        let version = self
            .extract_version(&body)
            .ok_or_else(|| FetchError::Parse {
                artifact: self.config.artifact_name.clone(),
                url: final_url.to_string(),
            })?;

        info!("Latest version: {}", version);
        Ok(version)
    }

    /// First `<artifact>-v<major>.<minor>.<patch>` token in document order
    ///
    /// Components are ASCII digits only. A token whose components overflow
    /// `u64` is passed over in favour of the next one.
    pub fn extract_version(&self, body: &str) -> Option<ReleaseVersion> {
        self.pattern
            .captures_iter(body)
            .find_map(|captures| ReleaseVersion::parse(captures.get(1)?.as_str()))
    }
}

fn version_pattern(artifact_name: &str) -> Result<Regex, FetchError> {
    if artifact_name.trim().is_empty() {
        return Err(FetchError::InvalidArtifactName {
            name: artifact_name.to_string(),
            message: "name is empty".to_string(),
        });
    }

    let pattern = format!(
        r"{}-v([0-9]+\.[0-9]+\.[0-9]+)",
        regex::escape(artifact_name)
    );
    Regex::new(&pattern).map_err(|e| FetchError::InvalidArtifactName {
        name: artifact_name.to_string(),
        message: e.to_string(),
    })
}
