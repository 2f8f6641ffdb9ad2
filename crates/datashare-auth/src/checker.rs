//! Permission gate backed by stored resource policies.

use tracing::{debug, warn};
use uuid::Uuid;

use datashare_core::error::AppError;
use datashare_core::result::AppResult;
use datashare_database::ShareSession;

/// Checks group permissions on resources against the policy store.
///
/// A user holds a permission on a resource when any of their groups has a
/// policy on that resource granting it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourcePolicyChecker;

impl ResourcePolicyChecker {
    /// Creates a new checker.
    pub fn new() -> Self {
        Self
    }

    /// Returns whether any of `groups` holds `permission` on the resource.
    pub async fn has_permission(
        &self,
        session: &mut dyn ShareSession,
        groups: &[String],
        resource_uri: Uuid,
        permission: &str,
    ) -> AppResult<bool> {
        if groups.is_empty() {
            return Ok(false);
        }
        let policies = session.find_resource_policies(groups, resource_uri).await?;
        Ok(policies.iter().any(|p| p.grants(permission)))
    }

    /// Fails with an authorization error unless the user holds `permission`.
    pub async fn check_user_resource_permission(
        &self,
        session: &mut dyn ShareSession,
        username: &str,
        groups: &[String],
        resource_uri: Uuid,
        permission: &str,
    ) -> AppResult<()> {
        if self
            .has_permission(session, groups, resource_uri, permission)
            .await?
        {
            debug!(username, resource_uri = %resource_uri, permission, "Permission granted");
            return Ok(());
        }

        warn!(username, resource_uri = %resource_uri, permission, "Permission denied");
        Err(AppError::authorization(format!(
            "User '{username}' is not authorized to perform {permission} on {resource_uri}"
        )))
    }
}
