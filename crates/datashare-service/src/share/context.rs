//! Records a processing run works against.

use tracing::debug;

use datashare_core::error::AppError;
use datashare_core::result::AppResult;
use datashare_core::types::ShareId;
use datashare_database::ShareSession;
use datashare_entity::dataset::Dataset;
use datashare_entity::environment::{Environment, EnvironmentGroup};
use datashare_entity::share::ShareObject;

/// Read-only context of one processing run, loaded once when the run starts.
#[derive(Debug, Clone)]
pub struct ShareContext {
    /// The share being processed.
    pub share: ShareObject,
    /// The shared dataset.
    pub dataset: Dataset,
    /// Environment owning the dataset.
    pub source_environment: Environment,
    /// Environment access is granted into.
    pub target_environment: Environment,
    /// The requesting group's membership in the target environment.
    pub env_group: EnvironmentGroup,
}

impl ShareContext {
    /// Load the context of a share. Any missing record fails the load.
    pub async fn load(session: &mut dyn ShareSession, share_id: ShareId) -> AppResult<Self> {
        let share = session
            .find_share(share_id)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or_else(|| AppError::not_found(format!("Share {share_id} not found")))?;

        let dataset = session
            .find_dataset(share.dataset_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Dataset {} not found", share.dataset_id)))?;

        let source_environment = session
            .find_environment(share.source_environment_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Source environment {} not found",
                    share.source_environment_id
                ))
            })?;

        let target_environment = session
            .find_environment(share.environment_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Target environment {} not found", share.environment_id))
            })?;

        let env_group = session
            .find_environment_group(share.environment_id, &share.principal_group)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Group '{}' is not a member of environment {}",
                    share.principal_group, share.environment_id
                ))
            })?;

        debug!(
            share_id = %share.id,
            dataset_id = %dataset.id,
            source_account = %source_environment.aws_account_id,
            target_account = %target_environment.aws_account_id,
            "Share context loaded"
        );

        Ok(Self {
            share,
            dataset,
            source_environment,
            target_environment,
            env_group,
        })
    }
}
