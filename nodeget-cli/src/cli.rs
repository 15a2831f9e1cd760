use clap::Parser;
use nodeget_core::{DEFAULT_CACHE_DIR, DEFAULT_LISTING_URL, DEFAULT_MAX_ATTEMPTS};
use std::path::PathBuf;

/// Download the latest Node.js LTS binary archives
#[derive(Parser, Debug)]
#[command(name = "nodeget")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetches the latest Node.js LTS binaries into a local cache directory", long_about = None)]
pub struct Args {
    /// Platform to fetch as JSON, e.g. '{"platform":"linux","arch":"x64"}' (defaults to this host)
    #[arg(value_name = "PLATFORM_JSON")]
    pub platform: Option<String>,

    /// Print the latest version and exit
    #[arg(short = 'l', long = "latest")]
    pub latest: bool,

    /// Fetch every platform in the platform matrix
    #[arg(short = 'a', long = "all", conflicts_with = "platform")]
    pub all: bool,

    /// Platform matrix JSON file (implies --all)
    #[arg(short = 'm', long = "matrix", value_name = "FILE", conflicts_with = "platform")]
    pub matrix: Option<PathBuf>,

    /// Stop a matrix run at the first failed platform
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Directory archives are downloaded to
    #[arg(short = 'c', long = "cache-dir", value_name = "DIR", default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Listing page scanned for the latest version
    #[arg(long = "listing-url", value_name = "URL", default_value = DEFAULT_LISTING_URL)]
    pub listing_url: String,

    /// Total download attempts per archive, including the first
    #[arg(
        short = 'n',
        long = "attempts",
        value_name = "N",
        default_value_t = DEFAULT_MAX_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub attempts: u32,

    /// Request timeout in seconds
    #[arg(long = "timeout", value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Also copy the fetched archive into this directory
    #[arg(short = 'o', long = "output-dir", value_name = "DIR", conflicts_with_all = ["all", "matrix"])]
    pub output_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Args {
    pub fn is_matrix_run(&self) -> bool {
        self.all || self.matrix.is_some()
    }
}

/// Parses command-line arguments
pub fn parse_args() -> Args {
    Args::parse()
}
