//! Permission Set Catalog
//!
//! Lists every permission set of an instance and describes each one to get
//! its display name. Describe calls are issued one at a time.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::directory::SsoDirectory;
use crate::retry::{with_backoff, RetryPolicy};
use crate::types::{CatalogError, PermissionSet, PermissionSetCatalog};

/// Build the name-ordered catalog of an instance's permission sets
pub async fn build_catalog(
    directory: &dyn SsoDirectory,
    retry: &RetryPolicy,
    instance_arn: &str,
) -> Result<PermissionSetCatalog> {
    let arns = with_backoff(retry, "ListPermissionSets", || {
        directory.list_permission_sets(instance_arn)
    })
    .await
    .context("Failed to list permission sets")?;

    debug!("Describing {} permission sets", arns.len());

    let mut entries = Vec::with_capacity(arns.len());
    for arn in arns {
        let name = with_backoff(retry, "DescribePermissionSet", || {
            directory.describe_permission_set(instance_arn, &arn)
        })
        .await
        .with_context(|| format!("Failed to describe permission set {}", arn))?;

        debug!("Permission set {} -> {}", name, arn);
        entries.push(PermissionSet { name, arn });
    }

    let catalog = catalog_from_entries(entries)?;
    info!("Loaded {} permission sets", catalog.len());
    Ok(catalog)
}

/// Validate uniqueness of names and ARNs, then order by name
pub fn catalog_from_entries(
    mut entries: Vec<PermissionSet>,
) -> Result<PermissionSetCatalog, CatalogError> {
    let mut by_name: HashMap<&str, &str> = HashMap::new();
    let mut seen_arns: HashSet<&str> = HashSet::new();

    for entry in &entries {
        if entry.name.is_empty() {
            return Err(CatalogError::Unnamed(entry.arn.clone()));
        }
        if !seen_arns.insert(entry.arn.as_str()) {
            return Err(CatalogError::DuplicateArn(entry.arn.clone()));
        }
        if let Some(first) = by_name.insert(entry.name.as_str(), entry.arn.as_str()) {
            return Err(CatalogError::DuplicateName {
                name: entry.name.clone(),
                first: first.to_string(),
                second: entry.arn.clone(),
            });
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(PermissionSetCatalog::from_sorted(entries))
}
