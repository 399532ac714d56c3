//! AWS SDK Directory
//!
//! `SsoDirectory` backed by the Organizations, SSO Admin and Identity Store
//! APIs. Paginated listings are drained through the SDK paginators and every
//! SDK error is classified into a [`DirectoryError`].

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_identitystore::Client as IdentityStoreClient;
use aws_sdk_organizations::types::AccountStatus as OrgAccountStatus;
use aws_sdk_organizations::Client as OrganizationsClient;
use aws_sdk_ssoadmin::config::http::HttpResponse;
use aws_sdk_ssoadmin::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ssoadmin::types::PrincipalType as SdkPrincipalType;
use aws_sdk_ssoadmin::Client as SsoAdminClient;
use tracing::{debug, warn};

use crate::directory::SsoDirectory;
use crate::types::{
    AccountRecord, AccountStatus, Assignment, DirectoryError, PrincipalType, SsoInstance,
};

/// Directory client over the three AWS services
#[derive(Clone)]
pub struct AwsSsoDirectory {
    organizations: OrganizationsClient,
    sso_admin: SsoAdminClient,
    identity_store: IdentityStoreClient,
}

impl AwsSsoDirectory {
    /// Create clients for all services from one shared SDK config
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            organizations: OrganizationsClient::new(config),
            sso_admin: SsoAdminClient::new(config),
            identity_store: IdentityStoreClient::new(config),
        }
    }
}

/// Map an SDK error onto the directory error taxonomy
fn classify_sdk_error<E>(operation: &str, err: SdkError<E, HttpResponse>) -> DirectoryError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = err.code().unwrap_or_default().to_string();
    let message = DisplayErrorContext(&err).to_string();
    let operation = operation.to_string();

    match &err {
        SdkError::ServiceError(ctx) => {
            let status = ctx.raw().status().as_u16();
            if code == "ResourceNotFoundException" {
                DirectoryError::NotFound { operation, message }
            } else if code.contains("Throttl")
                || code == "TooManyRequestsException"
                || status == 429
                || status == 503
            {
                DirectoryError::Throttled { operation, message }
            } else {
                DirectoryError::Service { operation, message }
            }
        }
        SdkError::TimeoutError(_) => DirectoryError::Transient { operation, message },
        SdkError::DispatchFailure(df) if df.is_timeout() || df.is_io() => {
            DirectoryError::Transient { operation, message }
        }
        SdkError::ResponseError(ctx) => {
            let status = ctx.raw().status().as_u16();
            if status == 429 || status == 503 {
                DirectoryError::Throttled { operation, message }
            } else {
                DirectoryError::Service { operation, message }
            }
        }
        _ => DirectoryError::Service { operation, message },
    }
}

fn missing_field(operation: &str, field: &str) -> DirectoryError {
    DirectoryError::Service {
        operation: operation.to_string(),
        message: format!("response missing {}", field),
    }
}

fn account_status(status: Option<&OrgAccountStatus>) -> AccountStatus {
    match status {
        Some(OrgAccountStatus::Active) => AccountStatus::Active,
        Some(OrgAccountStatus::Suspended) => AccountStatus::Suspended,
        Some(OrgAccountStatus::PendingClosure) => AccountStatus::PendingClosure,
        _ => AccountStatus::Unknown,
    }
}

#[async_trait]
impl SsoDirectory for AwsSsoDirectory {
    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, DirectoryError> {
        const OP: &str = "organizations:ListAccounts";

        // this paginator yields whole pages only
        let pages = self
            .organizations
            .list_accounts()
            .into_paginator()
            .send()
            .try_collect()
            .await
            .map_err(|e| classify_sdk_error(OP, e))?;

        let records = pages
            .iter()
            .flat_map(|page| page.accounts())
            .filter_map(|account| {
                let id = account.id()?.to_string();
                #[allow(deprecated)]
                let status = account_status(account.status());
                Some(AccountRecord {
                    name: account.name().unwrap_or_default().to_string(),
                    id,
                    status,
                })
            })
            .collect::<Vec<_>>();

        debug!("Listed {} organization accounts", records.len());
        Ok(records)
    }

    async fn list_instances(&self) -> Result<Vec<SsoInstance>, DirectoryError> {
        const OP: &str = "sso:ListInstances";

        let instances = self
            .sso_admin
            .list_instances()
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| classify_sdk_error(OP, e))?;

        instances
            .into_iter()
            .map(|instance| {
                let arn = instance
                    .instance_arn()
                    .ok_or_else(|| missing_field(OP, "InstanceArn"))?;
                let store = instance
                    .identity_store_id()
                    .ok_or_else(|| missing_field(OP, "IdentityStoreId"))?;
                Ok(SsoInstance::new(arn, store))
            })
            .collect()
    }

    async fn list_permission_sets(
        &self,
        instance_arn: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        self.sso_admin
            .list_permission_sets()
            .instance_arn(instance_arn)
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| classify_sdk_error("sso:ListPermissionSets", e))
    }

    async fn describe_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> Result<String, DirectoryError> {
        const OP: &str = "sso:DescribePermissionSet";

        let output = self
            .sso_admin
            .describe_permission_set()
            .instance_arn(instance_arn)
            .permission_set_arn(permission_set_arn)
            .send()
            .await
            .map_err(|e| classify_sdk_error(OP, e))?;

        output
            .permission_set()
            .and_then(|ps| ps.name())
            .map(str::to_string)
            .ok_or_else(|| missing_field(OP, "PermissionSet.Name"))
    }

    async fn list_account_assignments(
        &self,
        instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
    ) -> Result<Vec<Assignment>, DirectoryError> {
        let rows = self
            .sso_admin
            .list_account_assignments()
            .instance_arn(instance_arn)
            .account_id(account_id)
            .permission_set_arn(permission_set_arn)
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| classify_sdk_error("sso:ListAccountAssignments", e))?;

        let mut assignments = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(principal_id) = row.principal_id() else {
                warn!(account_id = %account_id, "Skipping assignment without a principal id");
                continue;
            };
            let principal_type = match row.principal_type() {
                Some(SdkPrincipalType::User) => PrincipalType::User,
                Some(SdkPrincipalType::Group) => PrincipalType::Group,
                other => {
                    warn!(
                        account_id = %account_id,
                        principal_id = %principal_id,
                        "Skipping assignment with unsupported principal type {:?}",
                        other
                    );
                    continue;
                }
            };
            assignments.push(Assignment {
                principal_type,
                principal_id: principal_id.to_string(),
            });
        }

        Ok(assignments)
    }

    async fn describe_user(
        &self,
        identity_store_id: &str,
        user_id: &str,
    ) -> Result<String, DirectoryError> {
        const OP: &str = "identitystore:DescribeUser";

        let output = self
            .identity_store
            .describe_user()
            .identity_store_id(identity_store_id)
            .user_id(user_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error(OP, e))?;

        output
            .user_name()
            .map(str::to_string)
            .ok_or_else(|| missing_field(OP, "UserName"))
    }

    async fn describe_group(
        &self,
        identity_store_id: &str,
        group_id: &str,
    ) -> Result<String, DirectoryError> {
        const OP: &str = "identitystore:DescribeGroup";

        let output = self
            .identity_store
            .describe_group()
            .identity_store_id(identity_store_id)
            .group_id(group_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error(OP, e))?;

        output
            .display_name()
            .map(str::to_string)
            .ok_or_else(|| missing_field(OP, "DisplayName"))
    }
}
