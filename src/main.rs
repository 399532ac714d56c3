//! SSO Assignment Report
//!
//! Lists which users and groups hold which permission sets on every active
//! account of an AWS organization and writes the result to a CSV file.
//! Credentials come from the default AWS provider chain or a named profile.
//!
//! # Usage
//! ```bash
//! # Report using the default credential chain
//! sso-assignment-report
//!
//! # Use a named profile and write into ./reports
//! sso-assignment-report --profile audit --output-dir reports
//!
//! # Pick one of several Identity Center instances
//! sso-assignment-report --instance-arn arn:aws:sso:::instance/ssoins-1234
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sso_assignment_report::config::{load_sdk_config, DEFAULT_REGION};
use sso_assignment_report::writer::write_report;
use sso_assignment_report::{
    generate_report, AwsSsoDirectory, ReportConfig, RetryPolicy, SsoDirectory,
};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser, Debug)]
#[command(name = "sso-assignment-report")]
#[command(about = "Report IAM Identity Center account assignments as CSV", long_about = None)]
#[command(version)]
struct Cli {
    /// AWS region for all API calls
    #[arg(long, env = "SSO_REPORT_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// Named AWS credentials profile
    #[arg(long, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// Identity Center instance to report on (required if several exist)
    #[arg(long, env = "SSO_INSTANCE_ARN")]
    instance_arn: Option<String>,

    /// Accounts processed in parallel (default: logical CPU count)
    #[arg(long, env = "SSO_REPORT_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Directory for the CSV report
    #[arg(long, env = "SSO_REPORT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Attempts per API call when throttled
    #[arg(long, env = "SSO_REPORT_MAX_ATTEMPTS", default_value = "5")]
    max_attempts: u32,

    /// Abort on the first failed account instead of writing a partial report
    #[arg(long)]
    fail_fast: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn report_config(&self) -> ReportConfig {
        ReportConfig::default()
            .region(self.region.clone())
            .profile(self.profile.clone())
            .instance_arn(self.instance_arn.clone())
            .concurrency(self.concurrency)
            .output_dir(self.output_dir.clone())
            .retry(RetryPolicy::new(self.max_attempts))
            .fail_fast(self.fail_fast)
    }
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs)?;

    let start = Instant::now();
    let config = cli.report_config();

    info!(
        region = %config.region,
        concurrency = config.concurrency,
        "🚀 Starting SSO assignment report"
    );

    let sdk_config = load_sdk_config(&config).await;
    let directory: Arc<dyn SsoDirectory> = Arc::new(AwsSsoDirectory::new(&sdk_config));

    let outcome = generate_report(directory, &config).await?;

    let path = write_report(&config.output_dir, &outcome.rows, chrono::Local::now())
        .context("Failed to write report")?;
    println!("✅ Report written to {}", path.display());
    println!(
        "The report took {} to generate.",
        format_elapsed(start.elapsed())
    );

    if !outcome.is_complete() {
        for failure in &outcome.failures {
            error!("Account {} is missing from the report: {}", failure.account, failure.error);
        }
        bail!(
            "{} of the accounts failed; the report is incomplete",
            outcome.failures.len()
        );
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
    }
}

/// "<minutes> minutes and <seconds> seconds", whole units only
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{} minutes and {} seconds", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(900)), "0 minutes and 0 seconds");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "0 minutes and 59 seconds");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2 minutes and 5 seconds");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["sso-assignment-report"]).unwrap();
        let config = cli.report_config();

        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.retry.max_attempts, 5);
        assert!(!config.fail_fast);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "sso-assignment-report",
            "--region",
            "eu-central-1",
            "--instance-arn",
            "arn:aws:sso:::instance/ssoins-1",
            "--concurrency",
            "3",
            "--fail-fast",
        ])
        .unwrap();
        let config = cli.report_config();

        assert_eq!(config.region, "eu-central-1");
        assert_eq!(config.instance_arn.as_deref(), Some("arn:aws:sso:::instance/ssoins-1"));
        assert_eq!(config.concurrency, 3);
        assert!(config.fail_fast);
    }
}
