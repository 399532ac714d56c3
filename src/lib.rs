//! SSO Assignment Report Library
//!
//! Enumerates IAM Identity Center account assignments across an AWS
//! organization and writes them to a CSV report.

pub mod aws;
pub mod catalog;
pub mod config;
pub mod directory;
pub mod discovery;
pub mod identity;
pub mod report;
pub mod retry;
pub mod types;
pub mod writer;

pub use aws::AwsSsoDirectory;
pub use config::ReportConfig;
pub use directory::SsoDirectory;
pub use report::{build_report, generate_report, ReportContext};
pub use retry::RetryPolicy;
pub use types::{Account, ReportOutcome, ReportRow, SsoInstance};
