//! Account and Instance Discovery
//!
//! Builds the static context of a run: the active accounts of the
//! organization and the single IAM Identity Center instance to report on.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::directory::SsoDirectory;
use crate::retry::{with_backoff, RetryPolicy};
use crate::types::{Account, AccountStatus, DiscoveryError, SsoInstance};

/// List the organization's ACTIVE accounts, in listing order
pub async fn enumerate_accounts(
    directory: &dyn SsoDirectory,
    retry: &RetryPolicy,
) -> Result<Vec<Account>> {
    let records = with_backoff(retry, "ListAccounts", || directory.list_accounts())
        .await
        .context("Failed to list organization accounts")?;

    let total = records.len();
    let accounts: Vec<Account> = records
        .into_iter()
        .filter(|record| record.status == AccountStatus::Active)
        .map(|record| Account::new(record.id, record.name))
        .collect();

    info!(
        "Found {} active accounts ({} skipped as inactive)",
        accounts.len(),
        total - accounts.len()
    );
    Ok(accounts)
}

/// List every instance visible to the caller
pub async fn list_instances(
    directory: &dyn SsoDirectory,
    retry: &RetryPolicy,
) -> Result<Vec<SsoInstance>> {
    with_backoff(retry, "ListInstances", || directory.list_instances())
        .await
        .context("Failed to list IAM Identity Center instances")
}

/// Pick the instance to report on
///
/// With no explicit ARN exactly one instance must exist. With an ARN it must
/// be among the discovered instances.
pub fn select_instance(
    instances: Vec<SsoInstance>,
    requested_arn: Option<&str>,
) -> Result<SsoInstance, DiscoveryError> {
    if let Some(arn) = requested_arn {
        return instances
            .into_iter()
            .find(|instance| instance.instance_arn == arn)
            .ok_or_else(|| DiscoveryError::InstanceNotFound(arn.to_string()));
    }

    match instances.len() {
        0 => Err(DiscoveryError::NoInstances),
        1 => Ok(instances.into_iter().next().ok_or(DiscoveryError::NoInstances)?),
        count => Err(DiscoveryError::MultipleInstances {
            count,
            arns: instances
                .iter()
                .map(|i| i.instance_arn.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Discover and validate the instance to report on
pub async fn resolve_instance(
    directory: &dyn SsoDirectory,
    retry: &RetryPolicy,
    requested_arn: Option<&str>,
) -> Result<SsoInstance> {
    let instances = list_instances(directory, retry).await?;
    debug!("Discovered {} IAM Identity Center instances", instances.len());

    let instance = select_instance(instances, requested_arn)?;
    info!(
        instance_arn = %instance.instance_arn,
        identity_store_id = %instance.identity_store_id,
        "Using IAM Identity Center instance"
    );
    Ok(instance)
}
