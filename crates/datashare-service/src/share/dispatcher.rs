//! Routes a share's approved work to the processor of each item kind.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{info, instrument};

use datashare_cloud::CloudProviders;
use datashare_core::config::SharingConfig;
use datashare_core::error::AppError;
use datashare_core::result::AppResult;
use datashare_core::types::ShareId;
use datashare_database::store::finish;
use datashare_database::{ShareSession, ShareStore};
use datashare_entity::share::ShareItemType;

use super::context::ShareContext;
use super::manager::{BucketShareManager, TableShareManager};
use super::processor::{ShareFlow, ShareProcessor};

/// Runs share and revoke processing for a share, one session per run.
#[derive(Clone)]
pub struct ShareProcessorDispatcher {
    store: Arc<dyn ShareStore>,
    processors: HashMap<ShareItemType, ShareProcessor>,
}

impl std::fmt::Debug for ShareProcessorDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareProcessorDispatcher")
            .field("kinds", &self.processors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ShareProcessorDispatcher {
    /// Creates a dispatcher with the bucket and table processors.
    pub fn new(store: Arc<dyn ShareStore>, cloud: &CloudProviders, config: &SharingConfig) -> Self {
        Self::with_processors(
            store,
            vec![
                ShareProcessor::new(Arc::new(BucketShareManager::new(
                    cloud.buckets.clone(),
                    config.clone(),
                ))),
                ShareProcessor::new(Arc::new(TableShareManager::new(
                    cloud.catalog.clone(),
                    config.clone(),
                ))),
            ],
        )
    }

    /// Creates a dispatcher from explicit processors, one per kind.
    pub fn with_processors(store: Arc<dyn ShareStore>, processors: Vec<ShareProcessor>) -> Self {
        let processors = processors.into_iter().map(|p| (p.kind(), p)).collect();
        Self { store, processors }
    }

    /// Grant access for every `Share_Approved` item of a share.
    ///
    /// Returns `true` when every processed item succeeded. The persisted
    /// item states are the authoritative outcome.
    #[instrument(skip_all, fields(share_id = %share_id))]
    pub async fn approve_share(&self, share_id: ShareId) -> AppResult<bool> {
        self.run(share_id, ShareFlow::Share).await
    }

    /// Remove access for every `Revoke_Approved` item of a share.
    #[instrument(skip_all, fields(share_id = %share_id))]
    pub async fn revoke_share(&self, share_id: ShareId) -> AppResult<bool> {
        self.run(share_id, ShareFlow::Revoke).await
    }

    async fn run(&self, share_id: ShareId, flow: ShareFlow) -> AppResult<bool> {
        let mut session = self.store.begin().await?;
        let result = self.run_in_session(session.as_mut(), share_id, flow).await;
        finish(session, result).await
    }

    async fn run_in_session(
        &self,
        session: &mut dyn ShareSession,
        share_id: ShareId,
        flow: ShareFlow,
    ) -> AppResult<bool> {
        let ctx = ShareContext::load(session, share_id).await?;
        if !ctx.target_environment.sharing_enabled {
            return Err(AppError::configuration(format!(
                "Sharing is disabled for environment {}",
                ctx.target_environment.label
            )));
        }

        let kinds: BTreeSet<ShareItemType> = session
            .list_share_items(share_id)
            .await?
            .into_iter()
            .filter(|i| i.status == flow.eligible_status())
            .map(|i| i.item_type)
            .collect();

        let mut selected = Vec::with_capacity(kinds.len());
        for kind in &kinds {
            let processor = self.processors.get(kind).ok_or_else(|| {
                AppError::configuration(format!("No share processor registered for {kind} items"))
            })?;
            selected.push(processor);
        }

        let mut all_succeeded = true;
        for processor in selected {
            let succeeded = match flow {
                ShareFlow::Share => processor.process_approved_shares(session, &ctx).await?,
                ShareFlow::Revoke => processor.process_revoked_shares(session, &ctx).await?,
            };
            all_succeeded &= succeeded;
        }

        info!(
            share_id = %share_id,
            kinds = kinds.len(),
            succeeded = all_succeeded,
            "Share processing finished"
        );
        Ok(all_succeeded)
    }
}
