//! Report Configuration
//!
//! Explicit run configuration handed to the AWS client factory and the
//! report pipeline. Nothing here touches process-wide state.

use std::path::PathBuf;

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::debug;

use crate::retry::RetryPolicy;

/// Region all API calls go to unless overridden
pub const DEFAULT_REGION: &str = "us-east-1";

/// Attempts the SDK itself makes before an error reaches [`RetryPolicy`]
const SDK_MAX_ATTEMPTS: u32 = 3;

/// Configuration for one report run
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// AWS region for every client
    pub region: String,
    /// Named credentials profile; `None` uses the default provider chain
    pub profile: Option<String>,
    /// Instance to report on when more than one is visible
    pub instance_arn: Option<String>,
    /// Maximum number of accounts processed at once
    pub concurrency: usize,
    /// Directory the CSV is written to
    pub output_dir: PathBuf,
    /// Backoff applied to throttled or transient calls
    pub retry: RetryPolicy,
    /// Abort on the first failed account instead of writing a partial report
    pub fail_fast: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            profile: None,
            instance_arn: None,
            concurrency: default_concurrency(),
            output_dir: PathBuf::from("."),
            retry: RetryPolicy::default(),
            fail_fast: false,
        }
    }
}

impl ReportConfig {
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn instance_arn(mut self, arn: Option<String>) -> Self {
        self.instance_arn = arn;
        self
    }

    /// Set the account concurrency; zero falls back to the host default
    pub fn concurrency(mut self, concurrency: Option<usize>) -> Self {
        self.concurrency = match concurrency {
            Some(n) if n > 0 => n,
            _ => default_concurrency(),
        };
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Logical cores visible to the process, at least 1
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1)
}

/// Build the shared SDK config from the run configuration
pub async fn load_sdk_config(config: &ReportConfig) -> SdkConfig {
    debug!(
        region = %config.region,
        profile = ?config.profile,
        "Loading AWS SDK configuration"
    );

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .retry_config(RetryConfig::standard().with_max_attempts(SDK_MAX_ATTEMPTS));

    if let Some(profile) = &config.profile {
        loader = loader.profile_name(profile);
    }

    loader.load().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReportConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert!(config.profile.is_none());
        assert!(config.concurrency >= 1);
        assert!(!config.fail_fast);
    }

    #[test]
    fn test_zero_concurrency_uses_host_default() {
        let config = ReportConfig::default().concurrency(Some(0));
        assert_eq!(config.concurrency, default_concurrency());

        let config = ReportConfig::default().concurrency(Some(4));
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_builder() {
        let config = ReportConfig::default()
            .region("eu-west-1")
            .profile(Some("audit".to_string()))
            .instance_arn(Some("arn:aws:sso:::instance/ssoins-1".to_string()))
            .output_dir("/tmp/reports")
            .fail_fast(true);

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.profile.as_deref(), Some("audit"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/reports"));
        assert!(config.fail_fast);
    }
}
