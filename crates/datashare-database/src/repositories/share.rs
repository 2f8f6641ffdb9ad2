//! Share object repository implementation.

use sqlx::PgConnection;

use datashare_core::error::{AppError, ErrorKind};
use datashare_core::result::AppResult;
use datashare_core::types::{DatasetId, EnvironmentId, ShareId};
use datashare_entity::share::{ShareObject, ShareObjectStatus};

/// Repository for share object persistence.
#[derive(Debug, Clone, Copy)]
pub struct ShareRepository;

impl ShareRepository {
    /// Find a share object by ID.
    pub async fn find_by_id(conn: &mut PgConnection, id: ShareId) -> AppResult<Option<ShareObject>> {
        sqlx::query_as::<_, ShareObject>("SELECT * FROM share_objects WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find share", e))
    }

    /// Find the live share object of a group for a dataset and environment.
    pub async fn find_for_principal(
        conn: &mut PgConnection,
        dataset_id: DatasetId,
        environment_id: EnvironmentId,
        principal_group: &str,
    ) -> AppResult<Option<ShareObject>> {
        sqlx::query_as::<_, ShareObject>(
            "SELECT * FROM share_objects \
             WHERE dataset_id = $1 AND environment_id = $2 AND principal_group = $3 \
             AND deleted_at IS NULL",
        )
        .bind(dataset_id)
        .bind(environment_id)
        .bind(principal_group)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find share for principal", e)
        })
    }

    /// Insert a new share object.
    pub async fn create(conn: &mut PgConnection, share: &ShareObject) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO share_objects (id, dataset_id, source_environment_id, environment_id, \
             principal_group, owner, status, request_purpose, reject_purpose, submitted_at, \
             deleted_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(share.id)
        .bind(share.dataset_id)
        .bind(share.source_environment_id)
        .bind(share.environment_id)
        .bind(&share.principal_group)
        .bind(&share.owner)
        .bind(share.status)
        .bind(&share.request_purpose)
        .bind(&share.reject_purpose)
        .bind(share.submitted_at)
        .bind(share.deleted_at)
        .bind(share.created_at)
        .bind(share.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create share", e))?;
        Ok(())
    }

    /// Persist the editable fields of a share object. The status is left untouched.
    pub async fn update(conn: &mut PgConnection, share: &ShareObject) -> AppResult<()> {
        sqlx::query(
            "UPDATE share_objects SET request_purpose = $2, reject_purpose = $3, \
             submitted_at = $4, deleted_at = $5, updated_at = NOW() WHERE id = $1",
        )
        .bind(share.id)
        .bind(&share.request_purpose)
        .bind(&share.reject_purpose)
        .bind(share.submitted_at)
        .bind(share.deleted_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update share", e))?;
        Ok(())
    }

    /// Set the derived status of a share object.
    pub async fn update_status(
        conn: &mut PgConnection,
        id: ShareId,
        status: ShareObjectStatus,
    ) -> AppResult<()> {
        sqlx::query("UPDATE share_objects SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update share status", e)
            })?;
        Ok(())
    }
}
