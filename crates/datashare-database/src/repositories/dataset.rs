//! Dataset, table, and bucket repository implementation.

use sqlx::PgConnection;

use datashare_core::error::{AppError, ErrorKind};
use datashare_core::result::AppResult;
use datashare_core::types::{BucketId, DatasetId, TableId};
use datashare_entity::dataset::{Dataset, DatasetBucket, DatasetTable};

/// Read-only repository for dataset context records.
#[derive(Debug, Clone, Copy)]
pub struct DatasetRepository;

impl DatasetRepository {
    /// Find a dataset by ID.
    pub async fn find_by_id(conn: &mut PgConnection, id: DatasetId) -> AppResult<Option<Dataset>> {
        sqlx::query_as::<_, Dataset>("SELECT * FROM datasets WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find dataset", e))
    }

    /// Find a dataset table by ID.
    pub async fn find_table(conn: &mut PgConnection, id: TableId) -> AppResult<Option<DatasetTable>> {
        sqlx::query_as::<_, DatasetTable>("SELECT * FROM dataset_tables WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find dataset table", e)
            })
    }

    /// Find a dataset bucket by ID.
    pub async fn find_bucket(
        conn: &mut PgConnection,
        id: BucketId,
    ) -> AppResult<Option<DatasetBucket>> {
        sqlx::query_as::<_, DatasetBucket>("SELECT * FROM dataset_buckets WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find dataset bucket", e)
            })
    }

    /// Lock a dataset table row for the rest of the transaction.
    pub async fn lock_table(conn: &mut PgConnection, id: TableId) -> AppResult<Option<DatasetTable>> {
        sqlx::query_as::<_, DatasetTable>("SELECT * FROM dataset_tables WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to lock dataset table", e)
            })
    }

    /// Lock a dataset bucket row for the rest of the transaction.
    pub async fn lock_bucket(
        conn: &mut PgConnection,
        id: BucketId,
    ) -> AppResult<Option<DatasetBucket>> {
        sqlx::query_as::<_, DatasetBucket>("SELECT * FROM dataset_buckets WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to lock dataset bucket", e)
            })
    }
}
