use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system identifier used by upstream for Windows builds
const WINDOWS_OS_ID: &str = "win32";

/// Short platform token used in Windows artifact names
pub const WINDOWS_PLATFORM: &str = "win";

/// A platform/architecture pair as it appears in artifact names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformSpec {
    pub platform: String,
    pub arch: String,
}

impl PlatformSpec {
    pub fn new(platform: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            arch: arch.into(),
        }
    }

    /// Parse `{"platform": "...", "arch": "..."}`
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .with_context(|| format!("Expected {{\"platform\": .., \"arch\": ..}}, got: {}", text))
    }

    pub fn is_windows(&self) -> bool {
        self.platform == WINDOWS_PLATFORM
    }
}

impl fmt::Display for PlatformSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.platform, self.arch)
    }
}

/// Maps the Windows OS identifier to "win"; everything else passes through
pub fn normalize_platform(os_id: &str) -> String {
    if os_id == WINDOWS_OS_ID {
        WINDOWS_PLATFORM.to_string()
    } else {
        os_id.to_string()
    }
}

/// Platform details of the running host, in artifact-name vocabulary
pub fn current_platform_details() -> PlatformSpec {
    PlatformSpec {
        platform: normalize_platform(host_os_id(std::env::consts::OS)),
        arch: host_arch_id(std::env::consts::ARCH).to_string(),
    }
}

// Rust's target names differ from the identifiers upstream uses in file names.
fn host_os_id(os: &str) -> &str {
    match os {
        "windows" => WINDOWS_OS_ID,
        "macos" => "darwin",
        other => other,
    }
}

fn host_arch_id(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "ia32",
        "powerpc64" => "ppc64",
        other => other,
    }
}
