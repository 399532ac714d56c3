//! Report Aggregation
//!
//! Fans the assignment listing and identity resolution out over all active
//! accounts. Each account runs as its own task; at most `concurrency` of
//! them work at once and results are collected in account order.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::catalog::build_catalog;
use crate::config::ReportConfig;
use crate::directory::SsoDirectory;
use crate::discovery::{enumerate_accounts, resolve_instance};
use crate::identity::principal_name;
use crate::retry::{with_backoff, RetryPolicy};
use crate::types::{
    Account, AccountFailure, Assignment, PermissionSetCatalog, ReportOutcome, ReportRow,
    SsoInstance,
};

/// Read-only state shared by every account task
#[derive(Debug)]
pub struct ReportContext {
    pub accounts: Vec<Account>,
    pub instance: SsoInstance,
    pub catalog: PermissionSetCatalog,
    pub retry: RetryPolicy,
}

/// List the principals assigned one permission set on one account
pub async fn fetch_assignments(
    directory: &dyn SsoDirectory,
    retry: &RetryPolicy,
    instance: &SsoInstance,
    account_id: &str,
    permission_set_arn: &str,
) -> Result<Vec<Assignment>> {
    with_backoff(retry, "ListAccountAssignments", || {
        directory.list_account_assignments(&instance.instance_arn, account_id, permission_set_arn)
    })
    .await
    .with_context(|| {
        format!(
            "Failed to list assignments of {} on account {}",
            permission_set_arn, account_id
        )
    })
}

/// Build the rows of one account, permission set by permission set
pub async fn process_account(
    directory: &dyn SsoDirectory,
    ctx: &ReportContext,
    account: &Account,
) -> Result<Vec<ReportRow>> {
    info!("Processing account {}", account);

    let mut rows = Vec::new();
    for permission_set in ctx.catalog.iter() {
        let assignments = fetch_assignments(
            directory,
            &ctx.retry,
            &ctx.instance,
            &account.id,
            &permission_set.arn,
        )
        .await?;

        for assignment in &assignments {
            let object_name = principal_name(
                directory,
                &ctx.retry,
                &ctx.instance.identity_store_id,
                assignment,
            )
            .await;

            rows.push(ReportRow {
                account_id: account.id.clone(),
                account_name: account.name.clone(),
                object_type: assignment.principal_type,
                object_name,
                permission_set_name: permission_set.name.clone(),
            });
        }
    }

    info!("Finished account {}: {} rows", account, rows.len());
    Ok(rows)
}

/// Run one task per account and gather their rows
///
/// A failed account is recorded in [`ReportOutcome::failures`], or aborts
/// the whole report when `config.fail_fast` is set.
pub async fn build_report(
    directory: Arc<dyn SsoDirectory>,
    ctx: Arc<ReportContext>,
    config: &ReportConfig,
) -> Result<ReportOutcome> {
    let concurrency = config.concurrency.max(1);
    info!(
        "Building report for {} accounts and {} permission sets ({} at a time)",
        ctx.accounts.len(),
        ctx.catalog.len(),
        concurrency
    );

    // Every account gets a task right away; the semaphore bounds how many
    // run at once and a freed permit goes to the next waiting account.
    let permits = Arc::new(Semaphore::new(concurrency));
    let handles: Vec<(Account, JoinHandle<Result<Vec<ReportRow>>>)> = ctx
        .accounts
        .iter()
        .map(|account| {
            let directory = Arc::clone(&directory);
            let task_ctx = Arc::clone(&ctx);
            let permits = Arc::clone(&permits);
            let task_account = account.clone();
            let handle = tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .context("Account worker pool closed")?;
                process_account(directory.as_ref(), &task_ctx, &task_account).await
            });
            (account.clone(), handle)
        })
        .collect();

    let mut outcome = ReportOutcome::default();

    for (account, handle) in handles {
        let result = handle
            .await
            .map_err(|e| anyhow!("Task for account {} did not complete: {}", account, e))
            .and_then(|task_result| task_result);

        match result {
            Ok(rows) => outcome.rows.extend(rows),
            Err(err) => {
                error!(account_id = %account.id, "Failed to process account {}: {:#}", account, err);
                if config.fail_fast {
                    permits.close();
                    return Err(err.context(format!("Failed to process account {}", account)));
                }
                outcome.failures.push(AccountFailure {
                    account,
                    error: format!("{:#}", err),
                });
            }
        }
    }

    Ok(outcome)
}

/// Discover the run context and build the full report
pub async fn generate_report(
    directory: Arc<dyn SsoDirectory>,
    config: &ReportConfig,
) -> Result<ReportOutcome> {
    let retry = config.retry;

    let accounts = enumerate_accounts(directory.as_ref(), &retry).await?;
    let instance =
        resolve_instance(directory.as_ref(), &retry, config.instance_arn.as_deref()).await?;
    let catalog = build_catalog(directory.as_ref(), &retry, &instance.instance_arn).await?;

    let ctx = Arc::new(ReportContext {
        accounts,
        instance,
        catalog,
        retry,
    });

    build_report(directory, ctx, config).await
}
