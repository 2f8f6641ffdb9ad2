//! Attaching and detaching named permission sets on resources.

use tracing::info;
use uuid::Uuid;

use datashare_core::result::AppResult;
use datashare_database::ShareSession;
use datashare_entity::permission::{ResourcePolicy, ResourceType};

/// Writes group permission sets for resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourcePolicyStore;

impl ResourcePolicyStore {
    /// Creates a new policy store.
    pub fn new() -> Self {
        Self
    }

    /// Attach a permission set to a group, replacing any previous set.
    pub async fn attach_resource_policy(
        &self,
        session: &mut dyn ShareSession,
        group_name: &str,
        resource_uri: Uuid,
        resource_type: ResourceType,
        permissions: &[&str],
    ) -> AppResult<()> {
        let policy = ResourcePolicy::new(group_name, resource_uri, resource_type, permissions);
        session.attach_resource_policy(&policy).await?;
        info!(
            group = group_name,
            resource_uri = %resource_uri,
            resource_type = %resource_type,
            "Resource policy attached"
        );
        Ok(())
    }

    /// Detach a group's permission set from a resource.
    pub async fn delete_resource_policy(
        &self,
        session: &mut dyn ShareSession,
        group_name: &str,
        resource_uri: Uuid,
    ) -> AppResult<bool> {
        let deleted = session.delete_resource_policy(group_name, resource_uri).await?;
        if deleted {
            info!(group = group_name, resource_uri = %resource_uri, "Resource policy detached");
        }
        Ok(deleted)
    }
}
