//! Resource policy repository implementation.

use sqlx::PgConnection;
use uuid::Uuid;

use datashare_core::error::{AppError, ErrorKind};
use datashare_core::result::AppResult;
use datashare_entity::permission::ResourcePolicy;

/// Repository for group permission sets on resources.
#[derive(Debug, Clone, Copy)]
pub struct ResourcePolicyRepository;

impl ResourcePolicyRepository {
    /// Find the policies any of the groups holds on a resource.
    pub async fn find_for_groups(
        conn: &mut PgConnection,
        groups: &[String],
        resource_uri: Uuid,
    ) -> AppResult<Vec<ResourcePolicy>> {
        sqlx::query_as::<_, ResourcePolicy>(
            "SELECT * FROM resource_policies WHERE resource_uri = $1 AND group_name = ANY($2)",
        )
        .bind(resource_uri)
        .bind(groups)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find resource policies", e)
        })
    }

    /// Attach a policy, replacing the group's existing one on the resource.
    pub async fn upsert(conn: &mut PgConnection, policy: &ResourcePolicy) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO resource_policies (id, group_name, resource_uri, resource_type, permissions, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (group_name, resource_uri) \
             DO UPDATE SET permissions = EXCLUDED.permissions, resource_type = EXCLUDED.resource_type",
        )
        .bind(policy.id)
        .bind(&policy.group_name)
        .bind(policy.resource_uri)
        .bind(policy.resource_type)
        .bind(&policy.permissions)
        .bind(policy.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to attach resource policy", e)
        })?;
        Ok(())
    }

    /// Delete a group's policy on a resource.
    pub async fn delete(conn: &mut PgConnection, group_name: &str, resource_uri: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM resource_policies WHERE group_name = $1 AND resource_uri = $2",
        )
        .bind(group_name)
        .bind(resource_uri)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to delete resource policy", e)
        })?;
        Ok(result.rows_affected() > 0)
    }
}
