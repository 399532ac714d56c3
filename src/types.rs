//! Report Types
//!
//! Core types for organization accounts, the SSO instance, permission sets,
//! account assignments and the rows of the generated report.

use thiserror::Error;

/// Lifecycle status of an organization account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Suspended,
    PendingClosure,
    Unknown,
}

/// An account as listed by the organization, before status filtering
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub id: String,
    pub name: String,
    pub status: AccountStatus,
}

/// An active organization account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// 12-digit account ID (kept as a string to preserve leading zeros)
    pub id: String,
    /// Account display name
    pub name: String,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// An IAM Identity Center instance and its backing identity store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoInstance {
    pub instance_arn: String,
    pub identity_store_id: String,
}

impl SsoInstance {
    pub fn new(instance_arn: impl Into<String>, identity_store_id: impl Into<String>) -> Self {
        Self {
            instance_arn: instance_arn.into(),
            identity_store_id: identity_store_id.into(),
        }
    }
}

/// A described permission set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSet {
    /// Display name, unique within an instance
    pub name: String,
    pub arn: String,
}

/// Permission sets of one instance, ordered by name
///
/// Names and ARNs are both unique; the builder in [`crate::catalog`]
/// rejects anything else.
#[derive(Debug, Clone, Default)]
pub struct PermissionSetCatalog {
    entries: Vec<PermissionSet>,
}

impl PermissionSetCatalog {
    pub(crate) fn from_sorted(entries: Vec<PermissionSet>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionSet> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Kind of principal an assignment grants access to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrincipalType {
    User,
    Group,
}

impl std::fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrincipalType::User => write!(f, "USER"),
            PrincipalType::Group => write!(f, "GROUP"),
        }
    }
}

/// One principal assigned a permission set on an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub principal_type: PrincipalType,
    pub principal_id: String,
}

impl Assignment {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            principal_type: PrincipalType::User,
            principal_id: id.into(),
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self {
            principal_type: PrincipalType::Group,
            principal_id: id.into(),
        }
    }
}

/// A single line of the report: (account, permission set, principal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub account_id: String,
    pub account_name: String,
    pub object_type: PrincipalType,
    pub object_name: String,
    pub permission_set_name: String,
}

/// Ordered report rows
pub type Report = Vec<ReportRow>;

/// An account whose task failed while building the report
#[derive(Debug, Clone)]
pub struct AccountFailure {
    pub account: Account,
    pub error: String,
}

/// Everything gathered by the aggregator
#[derive(Debug, Default)]
pub struct ReportOutcome {
    pub rows: Report,
    pub failures: Vec<AccountFailure>,
}

impl ReportOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Classified failure of a remote directory call
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// The requested resource does not exist (or no longer exists)
    #[error("{operation}: resource not found: {message}")]
    NotFound { operation: String, message: String },

    /// The service throttled the request
    #[error("{operation}: throttled: {message}")]
    Throttled { operation: String, message: String },

    /// Timeout or connection failure before a response was received
    #[error("{operation}: transient failure: {message}")]
    Transient { operation: String, message: String },

    /// Any other service or client error
    #[error("{operation}: {message}")]
    Service { operation: String, message: String },
}

impl DirectoryError {
    /// Whether the call may succeed if repeated
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DirectoryError::Throttled { .. } | DirectoryError::Transient { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::NotFound { .. })
    }
}

/// Errors while locating the SSO instance to report on
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("No IAM Identity Center instance is visible to the caller")]
    NoInstances,

    #[error("Found {count} IAM Identity Center instances ({arns}); select one with --instance-arn")]
    MultipleInstances { count: usize, arns: String },

    #[error("IAM Identity Center instance not found: {0}")]
    InstanceNotFound(String),
}

/// Errors while building the permission set catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Permission set name {name} is used by both {first} and {second}")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },

    #[error("Permission set {0} was listed more than once")]
    DuplicateArn(String),

    #[error("Permission set {0} has no name")]
    Unnamed(String),
}
