//! Per-kind share managers: the cloud-side grant and revoke operations.
//!
//! Grants must be safe to re-run after a partial attempt, and revokes must
//! succeed when the access is already partly or fully removed.

pub mod bucket;
pub mod table;

use std::fmt::Debug;

use async_trait::async_trait;

use datashare_cloud::CloudError;
use datashare_core::error::{AppError, ErrorKind};
use datashare_core::result::AppResult;
use datashare_database::ShareSession;
use datashare_entity::share::{ShareItem, ShareItemType};

use super::context::ShareContext;

pub use bucket::BucketShareManager;
pub use table::TableShareManager;

/// Cross-account access operations for one resource kind.
#[async_trait]
pub trait ShareManager: Send + Sync + Debug + 'static {
    /// Kind of item this manager handles.
    fn kind(&self) -> ShareItemType;

    /// Give the requester access to the item's resource.
    async fn grant(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
        item: &ShareItem,
    ) -> AppResult<()>;

    /// Remove the requester's access to the item's resource.
    async fn revoke(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
        item: &ShareItem,
    ) -> AppResult<()>;

    /// Tear down share-level resources no item needs any more.
    async fn clean_up_share(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
    ) -> AppResult<()>;
}

/// Wrap a cloud failure as a manager operation error.
pub(crate) fn manager_error(context: &str, err: CloudError) -> AppError {
    AppError::with_source(ErrorKind::ManagerOperation, format!("{context}: {err}"), err)
}

/// Treat a missing resource as success.
pub(crate) fn tolerate_not_found(result: Result<(), CloudError>) -> Result<(), CloudError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}
