//! Data catalog provider on Glue and Lake Formation (requires `aws` feature).
//!
//! Databases and resource links live in Glue. Cross-account table grants
//! are Lake Formation permissions with the target account as principal.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_glue::Client as GlueClient;
use aws_sdk_glue::error::ProvideErrorMetadata;
use aws_sdk_glue::types::{DatabaseInput, TableIdentifier, TableInput};
use aws_sdk_lakeformation::Client as LakeFormationClient;
use aws_sdk_lakeformation::types::{DataLakePrincipal, Permission, Resource, TableResource};
use tracing::{debug, info};

use crate::error::{CloudError, CloudResult};
use crate::provider::{CatalogProvider, TableGrant, TableRef};

const ENTITY_NOT_FOUND: &str = "EntityNotFoundException";
const ALREADY_EXISTS: &str = "AlreadyExistsException";
const ACCESS_DENIED: &str = "AccessDeniedException";

/// Catalog provider backed by the Glue and Lake Formation APIs.
///
/// Clients are built per call for the region of the addressed catalog.
/// Accounts are addressed through catalog ids, so the ambient credentials
/// must be trusted by the catalogs of both source and target accounts.
#[derive(Debug, Clone)]
pub struct GlueCatalogProvider {
    config: SdkConfig,
}

impl GlueCatalogProvider {
    /// Create a provider from a loaded SDK configuration.
    pub fn new(config: SdkConfig) -> Self {
        Self { config }
    }

    fn glue(&self, region: &str) -> GlueClient {
        let config = aws_sdk_glue::config::Builder::from(&self.config)
            .region(aws_sdk_glue::config::Region::new(region.to_string()))
            .build();
        GlueClient::from_conf(config)
    }

    fn lake_formation(&self, region: &str) -> LakeFormationClient {
        let config = aws_sdk_lakeformation::config::Builder::from(&self.config)
            .region(aws_sdk_lakeformation::config::Region::new(region.to_string()))
            .build();
        LakeFormationClient::from_conf(config)
    }

    fn principal(grant: &TableGrant) -> DataLakePrincipal {
        DataLakePrincipal::builder()
            .data_lake_principal_identifier(&grant.principal_account_id)
            .build()
    }

    fn resource(grant: &TableGrant) -> CloudResult<Resource> {
        let table = TableResource::builder()
            .catalog_id(&grant.table.account_id)
            .database_name(&grant.table.database)
            .name(&grant.table.table)
            .build()
            .map_err(|e| CloudError::Service(format!("table resource: {e}")))?;
        Ok(Resource::builder().table(table).build())
    }

    fn permissions(grant: &TableGrant) -> Vec<Permission> {
        grant
            .permissions
            .iter()
            .map(|p| Permission::from(p.as_str()))
            .collect()
    }
}

fn classify<E>(resource: &str, err: E) -> CloudError
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    match err.code() {
        Some(ENTITY_NOT_FOUND) => CloudError::NotFound(format!("{resource}: {err}")),
        Some(ALREADY_EXISTS) => CloudError::AlreadyExists(format!("{resource}: {err}")),
        Some(ACCESS_DENIED) => CloudError::AccessDenied(format!("{resource}: {err}")),
        _ => CloudError::Service(format!("{resource}: {err}")),
    }
}

fn table_name(table: &TableRef) -> String {
    format!("{}.{}", table.database, table.table)
}

#[async_trait]
impl CatalogProvider for GlueCatalogProvider {
    async fn has_table_grant(&self, grant: &TableGrant) -> CloudResult<bool> {
        let name = table_name(&grant.table);
        let client = self.lake_formation(&grant.table.region);
        let mut held: Vec<String> = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = client
                .list_permissions()
                .catalog_id(&grant.table.account_id)
                .principal(Self::principal(grant))
                .resource(Self::resource(grant)?)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| classify(&name, e.into_service_error()))?;
            for entry in output.principal_resource_permissions.unwrap_or_default() {
                held.extend(
                    entry
                        .permissions
                        .unwrap_or_default()
                        .iter()
                        .map(|p| p.as_str().to_string()),
                );
            }
            match output.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        Ok(grant.permissions.iter().all(|p| held.contains(p)))
    }

    async fn grant_table_permissions(&self, grant: &TableGrant) -> CloudResult<()> {
        let name = table_name(&grant.table);
        self.lake_formation(&grant.table.region)
            .grant_permissions()
            .catalog_id(&grant.table.account_id)
            .principal(Self::principal(grant))
            .resource(Self::resource(grant)?)
            .set_permissions(Some(Self::permissions(grant)))
            .send()
            .await
            .map_err(|e| classify(&name, e.into_service_error()))?;
        info!(table = %name, principal = %grant.principal_account_id, "Lake Formation grant created");
        Ok(())
    }

    async fn revoke_table_permissions(&self, grant: &TableGrant) -> CloudResult<()> {
        let name = table_name(&grant.table);
        // Revoking an absent grant is an input error in Lake Formation.
        if !self.has_table_grant(grant).await? {
            return Err(CloudError::NotFound(format!("grant on {name}")));
        }
        self.lake_formation(&grant.table.region)
            .revoke_permissions()
            .catalog_id(&grant.table.account_id)
            .principal(Self::principal(grant))
            .resource(Self::resource(grant)?)
            .set_permissions(Some(Self::permissions(grant)))
            .send()
            .await
            .map_err(|e| classify(&name, e.into_service_error()))?;
        info!(table = %name, principal = %grant.principal_account_id, "Lake Formation grant revoked");
        Ok(())
    }

    async fn database_exists(&self, account_id: &str, region: &str, database: &str) -> CloudResult<bool> {
        match self
            .glue(region)
            .get_database()
            .catalog_id(account_id)
            .name(database)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match classify(database, e.into_service_error()) {
                CloudError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_database(&self, account_id: &str, region: &str, database: &str) -> CloudResult<()> {
        let input = DatabaseInput::builder()
            .name(database)
            .build()
            .map_err(|e| CloudError::Service(format!("database input {database}: {e}")))?;
        self.glue(region)
            .create_database()
            .catalog_id(account_id)
            .database_input(input)
            .send()
            .await
            .map_err(|e| classify(database, e.into_service_error()))?;
        debug!(account_id, database, "Glue database created");
        Ok(())
    }

    async fn delete_database(&self, account_id: &str, region: &str, database: &str) -> CloudResult<()> {
        self.glue(region)
            .delete_database()
            .catalog_id(account_id)
            .name(database)
            .send()
            .await
            .map_err(|e| classify(database, e.into_service_error()))?;
        debug!(account_id, database, "Glue database deleted");
        Ok(())
    }

    async fn get_resource_link(&self, link: &TableRef) -> CloudResult<Option<TableRef>> {
        let name = table_name(link);
        let output = match self
            .glue(&link.region)
            .get_table()
            .catalog_id(&link.account_id)
            .database_name(&link.database)
            .name(&link.table)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return match classify(&name, e.into_service_error()) {
                    CloudError::NotFound(_) => Ok(None),
                    other => Err(other),
                };
            }
        };

        // A plain table in the link's place points nowhere.
        let Some(target) = output.table.and_then(|t| t.target_table) else {
            return Ok(Some(link.clone()));
        };
        Ok(Some(TableRef {
            account_id: target.catalog_id.unwrap_or_default(),
            // Glue does not report the region of a link target.
            region: link.region.clone(),
            database: target.database_name.unwrap_or_default(),
            table: target.name.unwrap_or_default(),
        }))
    }

    async fn create_resource_link(&self, link: &TableRef, target: &TableRef) -> CloudResult<()> {
        let name = table_name(link);
        let input = TableInput::builder()
            .name(&link.table)
            .target_table(
                TableIdentifier::builder()
                    .catalog_id(&target.account_id)
                    .database_name(&target.database)
                    .name(&target.table)
                    .build(),
            )
            .build()
            .map_err(|e| CloudError::Service(format!("table input {name}: {e}")))?;
        self.glue(&link.region)
            .create_table()
            .catalog_id(&link.account_id)
            .database_name(&link.database)
            .table_input(input)
            .send()
            .await
            .map_err(|e| classify(&name, e.into_service_error()))?;
        debug!(link = %name, target = %table_name(target), "Resource link created");
        Ok(())
    }

    async fn delete_table(&self, table: &TableRef) -> CloudResult<()> {
        let name = table_name(table);
        self.glue(&table.region)
            .delete_table()
            .catalog_id(&table.account_id)
            .database_name(&table.database)
            .name(&table.table)
            .send()
            .await
            .map_err(|e| classify(&name, e.into_service_error()))?;
        debug!(table = %name, "Glue table deleted");
        Ok(())
    }
}
