use thiserror::Error;

/// Errors produced while resolving or downloading a release
#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream answered with a status that is neither 200 nor a usable redirect
    #[error("upstream returned HTTP {status} for {url}")]
    Upstream { status: u16, url: String },

    /// The listing page did not contain a version token
    #[error("could not find a `{artifact}-v<major>.<minor>.<patch>` token in {url}")]
    Parse { artifact: String, url: String },

    /// Every download attempt failed
    #[error("failed to download {file_name} after {attempts} attempts")]
    DownloadExhausted {
        file_name: String,
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },

    /// Transport-level failure (connect, timeout, reset, interrupted body)
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Redirect chain exceeded the configured hop limit
    #[error("gave up after {hops} redirects starting from {url}")]
    TooManyRedirects { url: String, hops: u32 },

    /// Artifact name cannot form a version pattern (empty, or too large to compile)
    #[error("invalid artifact name {name:?}: {message}")]
    InvalidArtifactName { name: String, message: String },

    /// Listing URL or redirect target is not a valid absolute URL
    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// Local filesystem failure outside a download attempt
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn network(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        FetchError::Network {
            url: url.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        FetchError::Io {
            context: context.into(),
            source,
        }
    }

    /// Message followed by every underlying cause, colon separated
    pub fn full_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        message
    }

    /// Number of attempts recorded by a `DownloadExhausted` error
    pub fn attempts(&self) -> Option<u32> {
        match self {
            FetchError::DownloadExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_exhausted_error_keeps_last_cause() {
        let err = FetchError::DownloadExhausted {
            file_name: "node-v20.1.0-linux-x64.tar.gz".to_string(),
            attempts: 3,
            source: Box::new(FetchError::Upstream {
                status: 503,
                url: "https://example.test/x".to_string(),
            }),
        };

        assert_eq!(err.attempts(), Some(3));
        assert_eq!(
            err.to_string(),
            "failed to download node-v20.1.0-linux-x64.tar.gz after 3 attempts"
        );
        let cause = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(cause.contains("HTTP 503"));
        assert_eq!(
            err.full_message(),
            "failed to download node-v20.1.0-linux-x64.tar.gz after 3 attempts: \
             upstream returned HTTP 503 for https://example.test/x"
        );
    }

    #[test]
    fn test_io_error_reports_context_then_cause() {
        let err = FetchError::io(
            "Failed to create cache directory assets",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
        );
        assert_eq!(err.to_string(), "Failed to create cache directory assets");
        assert_eq!(
            err.full_message(),
            "Failed to create cache directory assets: permission denied"
        );
    }

    #[test]
    fn test_attempts_only_on_exhausted() {
        let err = FetchError::network("https://example.test", "connection reset");
        assert_eq!(err.attempts(), None);
        assert_eq!(
            err.to_string(),
            "network error for https://example.test: connection reset"
        );
    }
}
