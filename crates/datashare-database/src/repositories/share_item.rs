//! Share item repository implementation.

use sqlx::PgConnection;
use uuid::Uuid;

use datashare_core::error::{AppError, ErrorKind};
use datashare_core::result::AppResult;
use datashare_core::types::{ShareId, ShareItemId};
use datashare_entity::share::{ShareItem, ShareItemStatus};

/// Repository for share item persistence and state updates.
#[derive(Debug, Clone, Copy)]
pub struct ShareItemRepository;

impl ShareItemRepository {
    /// Find a share item by ID.
    pub async fn find_by_id(conn: &mut PgConnection, id: ShareItemId) -> AppResult<Option<ShareItem>> {
        sqlx::query_as::<_, ShareItem>("SELECT * FROM share_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find share item", e))
    }

    /// List all items of a share.
    pub async fn find_by_share(conn: &mut PgConnection, share_id: ShareId) -> AppResult<Vec<ShareItem>> {
        sqlx::query_as::<_, ShareItem>(
            "SELECT * FROM share_items WHERE share_id = $1 ORDER BY created_at ASC",
        )
        .bind(share_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list share items", e))
    }

    /// Lock the items of a share in a status (SKIP LOCKED for concurrent runs).
    pub async fn lock_by_status(
        conn: &mut PgConnection,
        share_id: ShareId,
        status: ShareItemStatus,
    ) -> AppResult<Vec<ShareItem>> {
        sqlx::query_as::<_, ShareItem>(
            "SELECT * FROM share_items WHERE share_id = $1 AND status = $2 \
             ORDER BY created_at ASC FOR UPDATE SKIP LOCKED",
        )
        .bind(share_id)
        .bind(status)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock share items", e))
    }

    /// Find the item of a share referring to a resource.
    pub async fn find_by_resource(
        conn: &mut PgConnection,
        share_id: ShareId,
        item_uri: Uuid,
    ) -> AppResult<Option<ShareItem>> {
        sqlx::query_as::<_, ShareItem>(
            "SELECT * FROM share_items WHERE share_id = $1 AND item_uri = $2",
        )
        .bind(share_id)
        .bind(item_uri)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find share item by resource", e)
        })
    }

    /// List the items of every share referring to a resource.
    pub async fn find_for_resource(conn: &mut PgConnection, item_uri: Uuid) -> AppResult<Vec<ShareItem>> {
        sqlx::query_as::<_, ShareItem>(
            "SELECT * FROM share_items WHERE item_uri = $1 ORDER BY created_at ASC",
        )
        .bind(item_uri)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list share items by resource", e)
        })
    }

    /// Insert a new share item.
    pub async fn create(conn: &mut PgConnection, item: &ShareItem) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO share_items (id, share_id, item_type, item_uri, item_name, status, \
             last_error, created_at, status_changed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(item.id)
        .bind(item.share_id)
        .bind(item.item_type)
        .bind(item.item_uri)
        .bind(&item.item_name)
        .bind(item.status)
        .bind(&item.last_error)
        .bind(item.created_at)
        .bind(item.status_changed_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create share item", e))?;
        Ok(())
    }

    /// Update the status of a share item.
    pub async fn update_status(
        conn: &mut PgConnection,
        id: ShareItemId,
        status: ShareItemStatus,
        last_error: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE share_items SET status = $2, last_error = $3, status_changed_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(last_error)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update share item status", e)
        })?;
        Ok(())
    }

    /// Delete a share item.
    pub async fn delete(conn: &mut PgConnection, id: ShareItemId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM share_items WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete share item", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}
