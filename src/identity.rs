//! Identity Resolution
//!
//! Maps assignment principals to human-readable names. Users and groups
//! share one typed lookup result; the sentinel written for a missing or
//! unresolvable principal depends on its kind.

use tracing::{error, warn};

use crate::directory::SsoDirectory;
use crate::retry::{with_backoff, RetryPolicy};
use crate::types::{Assignment, DirectoryError, PrincipalType};

/// Name written for any group that cannot be described
pub const DELETED_GROUP: &str = "DELETED-GROUP";

/// Outcome of describing a principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityLookup {
    /// The principal exists and has this name
    Found(String),
    /// The principal no longer exists
    NotFound,
    /// The lookup failed for another reason (retries exhausted, access denied, ...)
    Failed(String),
}

impl From<Result<String, DirectoryError>> for IdentityLookup {
    fn from(result: Result<String, DirectoryError>) -> Self {
        match result {
            Ok(name) => IdentityLookup::Found(name),
            Err(err) if err.is_not_found() => IdentityLookup::NotFound,
            Err(err) => IdentityLookup::Failed(err.to_string()),
        }
    }
}

/// Name for a user id that no longer exists
pub fn unknown_user(user_id: &str) -> String {
    format!("UnknownUser-{}", user_id)
}

/// Name for a user id whose lookup failed
pub fn unresolved_user(user_id: &str) -> String {
    format!("UnresolvedUser-{}", user_id)
}

/// Describe a user in the identity store
pub async fn resolve_user(
    directory: &dyn SsoDirectory,
    retry: &RetryPolicy,
    identity_store_id: &str,
    user_id: &str,
) -> IdentityLookup {
    with_backoff(retry, "DescribeUser", || {
        directory.describe_user(identity_store_id, user_id)
    })
    .await
    .into()
}

/// Describe a group in the identity store
pub async fn resolve_group(
    directory: &dyn SsoDirectory,
    retry: &RetryPolicy,
    identity_store_id: &str,
    group_id: &str,
) -> IdentityLookup {
    with_backoff(retry, "DescribeGroup", || {
        directory.describe_group(identity_store_id, group_id)
    })
    .await
    .into()
}

/// Turn a lookup into the name written to the report, logging misses
pub fn object_name(principal_type: PrincipalType, principal_id: &str, lookup: IdentityLookup) -> String {
    match (principal_type, lookup) {
        (_, IdentityLookup::Found(name)) => name,
        (PrincipalType::User, IdentityLookup::NotFound) => {
            warn!("User with ID {} not found", principal_id);
            unknown_user(principal_id)
        }
        (PrincipalType::User, IdentityLookup::Failed(reason)) => {
            error!("Failed to describe user {}: {}", principal_id, reason);
            unresolved_user(principal_id)
        }
        (PrincipalType::Group, IdentityLookup::NotFound) => {
            warn!("Group was deleted while the report was running: {}", principal_id);
            DELETED_GROUP.to_string()
        }
        (PrincipalType::Group, IdentityLookup::Failed(reason)) => {
            warn!(
                "Group {} could not be described, reporting it as deleted: {}",
                principal_id, reason
            );
            DELETED_GROUP.to_string()
        }
    }
}

/// Resolve the report name of an assignment's principal
pub async fn principal_name(
    directory: &dyn SsoDirectory,
    retry: &RetryPolicy,
    identity_store_id: &str,
    assignment: &Assignment,
) -> String {
    let id = assignment.principal_id.as_str();
    let lookup = match assignment.principal_type {
        PrincipalType::User => resolve_user(directory, retry, identity_store_id, id).await,
        PrincipalType::Group => resolve_group(directory, retry, identity_store_id, id).await,
    };
    object_name(assignment.principal_type, id, lookup)
}
