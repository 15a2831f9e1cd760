use anyhow::{Context, Result};
use nodeget_core::{
    current_platform_details, BatchReport, Downloader, FailurePolicy, FetchConfig, PlatformMatrix,
    PlatformSpec, ProgressCallback,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod cli;

fn main() -> Result<()> {
    let args = cli::parse_args();

    // Initialize logger with appropriate level based on verbose flag
    if std::env::var("RUST_LOG").is_err() {
        if args.verbose {
            std::env::set_var("RUST_LOG", "debug");
        } else {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    let config = FetchConfig {
        listing_url: args.listing_url.clone(),
        cache_dir: args.cache_dir.clone(),
        max_attempts: args.attempts,
        request_timeout: Duration::from_secs(args.timeout),
        ..FetchConfig::default()
    };
    let downloader = Downloader::new(config).context("Failed to create HTTP client")?;
    log::debug!(
        "Cache directory: {}",
        downloader.config().cache_dir.display()
    );

    if args.latest {
        let version = downloader
            .latest_version()
            .context("Error fetching the latest Node.js version")?;
        println!("{}", version);
        return Ok(());
    }

    if args.is_matrix_run() {
        return run_matrix(&downloader, &args);
    }

    let spec = match &args.platform {
        Some(json) => PlatformSpec::from_json(json)?,
        None => current_platform_details(),
    };
    log::info!("Fetching Node.js for {}", spec);

    let fetched = downloader.fetch_one(&spec)?;
    if let Some(output_dir) = &args.output_dir {
        copy_artifact(&fetched.target.local_path, output_dir)?;
    }

    println!("{}", fetched.target.file_name);
    Ok(())
}

fn run_matrix(downloader: &Downloader, args: &cli::Args) -> Result<()> {
    let matrix = match &args.matrix {
        Some(path) => PlatformMatrix::load(path)?,
        None => PlatformMatrix::default(),
    };
    let policy = if args.fail_fast {
        FailurePolicy::Abort
    } else {
        FailurePolicy::Continue
    };

    log::info!("Fetching {} platforms", matrix.len());
    let progress: ProgressCallback =
        Box::new(|msg: &str, pct: u8| log::info!("[{:>3}%] {}", pct, msg));
    let report = downloader.fetch_matrix(&matrix.configurations, policy, Some(progress))?;

    write_report(&report, &mut io::stdout().lock(), &mut io::stderr().lock())
        .context("Failed to write report")?;

    log::info!(
        "Node.js {}: {} downloaded, {} already cached, {} failed",
        report.version,
        report.downloaded_count(),
        report.cached_count(),
        report.failed().count()
    );

    let code = exit_code(&report);
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

/// Fetched file names go to `out`, failures and skipped platforms to `err`
fn write_report(report: &BatchReport, out: &mut impl Write, err: &mut impl Write) -> io::Result<()> {
    for result in &report.results {
        if result.success {
            writeln!(out, "{}", result.file_name)?;
        } else {
            writeln!(
                err,
                "✗ {} - {}",
                result.spec,
                result.error.as_deref().unwrap_or("unknown error")
            )?;
        }
    }
    for spec in &report.skipped {
        writeln!(err, "- {} skipped", spec)?;
    }
    Ok(())
}

/// Non-zero when any platform failed or was skipped
fn exit_code(report: &BatchReport) -> i32 {
    if report.is_success() {
        0
    } else {
        1
    }
}

/// Copy a fetched archive into `output_dir` under its own name
fn copy_artifact(source: &Path, output_dir: &Path) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .context("Downloaded archive has no file name")?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let destination = output_dir.join(file_name);
    fs::copy(source, &destination).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            destination.display()
        )
    })?;

    log::info!("Copied to {}", destination.display());
    Ok(destination)
}
