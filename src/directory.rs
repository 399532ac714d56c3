//! SSO Directory Abstraction
//!
//! Trait over the remote services the report reads from: the organization
//! account listing, the SSO admin API and the identity store. Every listing
//! operation returns all pages.

use async_trait::async_trait;

use crate::types::{AccountRecord, Assignment, DirectoryError, SsoInstance};

/// Read-only access to organization, SSO admin and identity store data
#[async_trait]
pub trait SsoDirectory: Send + Sync {
    /// List every account in the organization, regardless of status
    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, DirectoryError>;

    /// List the IAM Identity Center instances visible to the caller
    async fn list_instances(&self) -> Result<Vec<SsoInstance>, DirectoryError>;

    /// List permission set ARNs provisioned in an instance
    async fn list_permission_sets(&self, instance_arn: &str)
        -> Result<Vec<String>, DirectoryError>;

    /// Get the display name of a permission set
    async fn describe_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> Result<String, DirectoryError>;

    /// List principals assigned a permission set on an account
    async fn list_account_assignments(
        &self,
        instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
    ) -> Result<Vec<Assignment>, DirectoryError>;

    /// Get a user's user name
    async fn describe_user(
        &self,
        identity_store_id: &str,
        user_id: &str,
    ) -> Result<String, DirectoryError>;

    /// Get a group's display name
    async fn describe_group(
        &self,
        identity_store_id: &str,
        group_id: &str,
    ) -> Result<String, DirectoryError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory directory for exercising the report pipeline.

    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::types::AccountStatus;

    #[derive(Default)]
    pub struct InMemoryDirectory {
        pub accounts: Vec<AccountRecord>,
        pub instances: Vec<SsoInstance>,
        /// (arn, name) in listing order
        pub permission_sets: Vec<(String, String)>,
        /// (account id, permission set arn) -> assignments
        pub assignments: HashMap<(String, String), Vec<Assignment>>,
        pub users: HashMap<String, String>,
        pub groups: HashMap<String, String>,
        /// Principals whose lookup fails with a non-retryable service error
        pub broken_principals: HashSet<String>,
        /// Accounts whose assignment listing always fails
        pub broken_accounts: HashSet<String>,
        /// Number of identity lookups to throttle before answering
        pub throttle_budget: AtomicU32,
        pub identity_calls: AtomicU32,
        /// Latency of each assignment listing, per account
        pub account_delays: HashMap<String, Duration>,
        /// "start <id>" / "end <id>" for every assignment listing, in call order
        pub events: Mutex<Vec<String>>,
    }

    fn not_found(operation: &str, id: &str) -> DirectoryError {
        DirectoryError::NotFound {
            operation: operation.to_string(),
            message: format!("{} does not exist", id),
        }
    }

    impl InMemoryDirectory {
        pub fn with_instance(mut self, arn: &str, identity_store_id: &str) -> Self {
            self.instances.push(SsoInstance::new(arn, identity_store_id));
            self
        }

        pub fn with_account(mut self, id: &str, name: &str, status: AccountStatus) -> Self {
            self.accounts.push(AccountRecord {
                id: id.to_string(),
                name: name.to_string(),
                status,
            });
            self
        }

        pub fn with_permission_set(mut self, arn: &str, name: &str) -> Self {
            self.permission_sets.push((arn.to_string(), name.to_string()));
            self
        }

        pub fn with_assignment(mut self, account_id: &str, ps_arn: &str, assignment: Assignment) -> Self {
            self.assignments
                .entry((account_id.to_string(), ps_arn.to_string()))
                .or_default()
                .push(assignment);
            self
        }

        pub fn with_user(mut self, id: &str, name: &str) -> Self {
            self.users.insert(id.to_string(), name.to_string());
            self
        }

        pub fn with_group(mut self, id: &str, name: &str) -> Self {
            self.groups.insert(id.to_string(), name.to_string());
            self
        }

        pub fn with_broken_principal(mut self, id: &str) -> Self {
            self.broken_principals.insert(id.to_string());
            self
        }

        pub fn with_broken_account(mut self, id: &str) -> Self {
            self.broken_accounts.insert(id.to_string());
            self
        }

        pub fn with_account_delay(mut self, id: &str, delay: Duration) -> Self {
            self.account_delays.insert(id.to_string(), delay);
            self
        }

        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn record(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        pub fn throttle_identity_lookups(self, times: u32) -> Self {
            self.throttle_budget.store(times, Ordering::SeqCst);
            self
        }

        fn identity_preflight(&self, operation: &str, id: &str) -> Result<(), DirectoryError> {
            self.identity_calls.fetch_add(1, Ordering::SeqCst);

            let throttled = self
                .throttle_budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if throttled {
                return Err(DirectoryError::Throttled {
                    operation: operation.to_string(),
                    message: "Rate exceeded".to_string(),
                });
            }

            if self.broken_principals.contains(id) {
                return Err(DirectoryError::Service {
                    operation: operation.to_string(),
                    message: "AccessDeniedException".to_string(),
                });
            }

            Ok(())
        }
    }

    #[async_trait]
    impl SsoDirectory for InMemoryDirectory {
        async fn list_accounts(&self) -> Result<Vec<AccountRecord>, DirectoryError> {
            Ok(self.accounts.clone())
        }

        async fn list_instances(&self) -> Result<Vec<SsoInstance>, DirectoryError> {
            Ok(self.instances.clone())
        }

        async fn list_permission_sets(
            &self,
            _instance_arn: &str,
        ) -> Result<Vec<String>, DirectoryError> {
            Ok(self.permission_sets.iter().map(|(arn, _)| arn.clone()).collect())
        }

        async fn describe_permission_set(
            &self,
            _instance_arn: &str,
            permission_set_arn: &str,
        ) -> Result<String, DirectoryError> {
            self.permission_sets
                .iter()
                .find(|(arn, _)| arn == permission_set_arn)
                .map(|(_, name)| name.clone())
                .ok_or_else(|| not_found("DescribePermissionSet", permission_set_arn))
        }

        async fn list_account_assignments(
            &self,
            _instance_arn: &str,
            account_id: &str,
            permission_set_arn: &str,
        ) -> Result<Vec<Assignment>, DirectoryError> {
            self.record(format!("start {}", account_id));
            if let Some(delay) = self.account_delays.get(account_id) {
                tokio::time::sleep(*delay).await;
            }
            self.record(format!("end {}", account_id));

            if self.broken_accounts.contains(account_id) {
                return Err(DirectoryError::Service {
                    operation: "ListAccountAssignments".to_string(),
                    message: format!("AccessDeniedException for {}", account_id),
                });
            }

            Ok(self
                .assignments
                .get(&(account_id.to_string(), permission_set_arn.to_string()))
                .cloned()
                .unwrap_or_default())
        }

        async fn describe_user(
            &self,
            _identity_store_id: &str,
            user_id: &str,
        ) -> Result<String, DirectoryError> {
            self.identity_preflight("DescribeUser", user_id)?;
            self.users
                .get(user_id)
                .cloned()
                .ok_or_else(|| not_found("DescribeUser", user_id))
        }

        async fn describe_group(
            &self,
            _identity_store_id: &str,
            group_id: &str,
        ) -> Result<String, DirectoryError> {
            self.identity_preflight("DescribeGroup", group_id)?;
            self.groups
                .get(group_id)
                .cloned()
                .ok_or_else(|| not_found("DescribeGroup", group_id))
        }
    }
}
