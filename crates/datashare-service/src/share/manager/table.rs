//! Table sharing through catalog grants and resource links.
//!
//! A granted table is reachable in the target account as a resource link
//! in a per-share database named after the source database. The catalog
//! grant itself is per target account, so every share of a table into that
//! account relies on the same grant.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use datashare_cloud::{CatalogProvider, CloudError, TableGrant, TableRef};
use datashare_core::config::SharingConfig;
use datashare_core::error::AppError;
use datashare_core::result::AppResult;
use datashare_core::types::TableId;
use datashare_database::ShareSession;
use datashare_entity::dataset::DatasetTable;
use datashare_entity::share::{ShareItem, ShareItemStatus, ShareItemType};

use super::{ShareManager, manager_error, tolerate_not_found};
use crate::share::context::ShareContext;

/// Shares catalog tables across accounts.
#[derive(Debug, Clone)]
pub struct TableShareManager {
    catalog: Arc<dyn CatalogProvider>,
    config: SharingConfig,
}

impl TableShareManager {
    /// Creates a new table share manager.
    pub fn new(catalog: Arc<dyn CatalogProvider>, config: SharingConfig) -> Self {
        Self { catalog, config }
    }

    /// Name of the database holding the share's resource links.
    pub fn shared_database_name(&self, ctx: &ShareContext) -> String {
        format!(
            "{}{}{}",
            ctx.dataset.glue_database_name,
            self.config.shared_database_suffix,
            ctx.share.id.as_uuid().simple()
        )
    }

    async fn load_table(
        &self,
        session: &mut dyn ShareSession,
        item: &ShareItem,
    ) -> AppResult<DatasetTable> {
        let table_id = TableId::from(item.item_uri);
        session
            .lock_table(table_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Table {table_id} not found")))
    }

    /// Whether another live share still relies on the catalog grant of
    /// this item's table in the run's target account.
    async fn grant_held_elsewhere(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
        item: &ShareItem,
    ) -> AppResult<bool> {
        let target_account = &ctx.target_environment.aws_account_id;
        for other in session.list_share_items_for_resource(item.item_uri).await? {
            if other.share_id == ctx.share.id
                || !(other.status.is_granted() || other.status == ShareItemStatus::ShareApproved)
            {
                continue;
            }
            let Some(share) = session.find_share(other.share_id).await? else {
                continue;
            };
            if share.is_deleted() {
                continue;
            }
            let Some(env) = session.find_environment(share.environment_id).await? else {
                continue;
            };
            if &env.aws_account_id == target_account {
                debug!(share_id = %share.id, item_id = %other.id, "Table grant still in use");
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn source_ref(table: &DatasetTable) -> TableRef {
        TableRef {
            account_id: table.aws_account_id.clone(),
            region: table.region.clone(),
            database: table.glue_database_name.clone(),
            table: table.glue_table_name.clone(),
        }
    }

    fn link_ref(&self, ctx: &ShareContext, table: &DatasetTable) -> TableRef {
        TableRef {
            account_id: ctx.target_environment.aws_account_id.clone(),
            region: ctx.target_environment.region.clone(),
            database: self.shared_database_name(ctx),
            table: table.glue_table_name.clone(),
        }
    }

    fn grant_for(&self, ctx: &ShareContext, table: &DatasetTable) -> TableGrant {
        TableGrant {
            table: Self::source_ref(table),
            principal_account_id: ctx.target_environment.aws_account_id.clone(),
            permissions: self.config.table_permissions.clone(),
        }
    }

    async fn ensure_grant(&self, grant: &TableGrant) -> AppResult<()> {
        let exists = self
            .catalog
            .has_table_grant(grant)
            .await
            .map_err(|e| manager_error("Failed to read table grants", e))?;
        if !exists {
            self.catalog
                .grant_table_permissions(grant)
                .await
                .map_err(|e| manager_error("Failed to grant table permissions", e))?;
        }
        Ok(())
    }

    async fn ensure_database(&self, ctx: &ShareContext) -> AppResult<String> {
        let env = &ctx.target_environment;
        let database = self.shared_database_name(ctx);
        let exists = self
            .catalog
            .database_exists(&env.aws_account_id, &env.region, &database)
            .await
            .map_err(|e| manager_error("Failed to look up shared database", e))?;
        if !exists {
            match self
                .catalog
                .create_database(&env.aws_account_id, &env.region, &database)
                .await
            {
                Ok(()) | Err(CloudError::AlreadyExists(_)) => {
                    debug!(database = %database, account = %env.aws_account_id, "Shared database created");
                }
                Err(e) => return Err(manager_error("Failed to create shared database", e)),
            }
        }
        Ok(database)
    }

    async fn ensure_link(&self, link: &TableRef, target: &TableRef) -> AppResult<()> {
        let existing = self
            .catalog
            .get_resource_link(link)
            .await
            .map_err(|e| manager_error("Failed to look up resource link", e))?;
        match existing {
            Some(current) if current.same_table(target) => Ok(()),
            Some(current) => Err(AppError::manager_operation(format!(
                "Table {}.{} already exists and points at {}.{}",
                link.database, link.table, current.database, current.table
            ))),
            None => self
                .catalog
                .create_resource_link(link, target)
                .await
                .map_err(|e| manager_error("Failed to create resource link", e)),
        }
    }
}

#[async_trait]
impl ShareManager for TableShareManager {
    fn kind(&self) -> ShareItemType {
        ShareItemType::Table
    }

    async fn grant(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
        item: &ShareItem,
    ) -> AppResult<()> {
        let table = self.load_table(session, item).await?;
        let grant = self.grant_for(ctx, &table);

        self.ensure_grant(&grant).await?;
        self.ensure_database(ctx).await?;
        self.ensure_link(&self.link_ref(ctx, &table), &grant.table)
            .await?;

        info!(
            share_id = %ctx.share.id,
            table = %table.glue_table_name,
            target_account = %ctx.target_environment.aws_account_id,
            "Table access granted"
        );
        Ok(())
    }

    async fn revoke(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
        item: &ShareItem,
    ) -> AppResult<()> {
        let table = self.load_table(session, item).await?;

        tolerate_not_found(self.catalog.delete_table(&self.link_ref(ctx, &table)).await)
            .map_err(|e| manager_error("Failed to delete resource link", e))?;
        if self.grant_held_elsewhere(session, ctx, item).await? {
            info!(
                share_id = %ctx.share.id,
                table = %table.glue_table_name,
                target_account = %ctx.target_environment.aws_account_id,
                "Table grant kept for other shares"
            );
        } else {
            tolerate_not_found(
                self.catalog
                    .revoke_table_permissions(&self.grant_for(ctx, &table))
                    .await,
            )
            .map_err(|e| manager_error("Failed to revoke table permissions", e))?;
        }

        info!(
            share_id = %ctx.share.id,
            table = %table.glue_table_name,
            target_account = %ctx.target_environment.aws_account_id,
            "Table access revoked"
        );
        Ok(())
    }

    async fn clean_up_share(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
    ) -> AppResult<()> {
        let items = session.list_share_items(ctx.share.id).await?;
        let still_shared = items.iter().any(|i| {
            i.item_type == ShareItemType::Table && (i.status.is_granted() || i.status.is_approved())
        });
        if still_shared {
            return Ok(());
        }

        let env = &ctx.target_environment;
        let database = self.shared_database_name(ctx);
        let exists = self
            .catalog
            .database_exists(&env.aws_account_id, &env.region, &database)
            .await
            .map_err(|e| manager_error("Failed to look up shared database", e))?;
        if exists {
            tolerate_not_found(
                self.catalog
                    .delete_database(&env.aws_account_id, &env.region, &database)
                    .await,
            )
            .map_err(|e| manager_error("Failed to delete shared database", e))?;
            info!(share_id = %ctx.share.id, database = %database, "Shared database dropped");
        }
        Ok(())
    }
}
