//! Environment repository implementation.

use sqlx::PgConnection;

use datashare_core::error::{AppError, ErrorKind};
use datashare_core::result::AppResult;
use datashare_core::types::EnvironmentId;
use datashare_entity::environment::{Environment, EnvironmentGroup};

/// Read-only repository for environment context records.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentRepository;

impl EnvironmentRepository {
    /// Find an environment by ID.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: EnvironmentId,
    ) -> AppResult<Option<Environment>> {
        sqlx::query_as::<_, Environment>("SELECT * FROM environments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find environment", e)
            })
    }

    /// Find a group's membership in an environment.
    pub async fn find_group(
        conn: &mut PgConnection,
        environment_id: EnvironmentId,
        group_name: &str,
    ) -> AppResult<Option<EnvironmentGroup>> {
        sqlx::query_as::<_, EnvironmentGroup>(
            "SELECT * FROM environment_groups WHERE environment_id = $1 AND group_name = $2",
        )
        .bind(environment_id)
        .bind(group_name)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find environment group", e)
        })
    }
}
