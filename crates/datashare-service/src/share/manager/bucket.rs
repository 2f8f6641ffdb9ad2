//! Bucket sharing through bucket policy statements.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use datashare_cloud::{BucketPolicyDocument, BucketPolicyProvider, PolicyStatement};
use datashare_core::config::SharingConfig;
use datashare_core::error::AppError;
use datashare_core::result::AppResult;
use datashare_core::types::{BucketId, ShareId};
use datashare_database::ShareSession;
use datashare_entity::dataset::DatasetBucket;
use datashare_entity::share::{ShareItem, ShareItemStatus, ShareItemType};

use super::{ShareManager, manager_error, tolerate_not_found};
use crate::share::context::ShareContext;

/// Grants read access to a bucket by adding one statement per share to its policy.
#[derive(Debug, Clone)]
pub struct BucketShareManager {
    buckets: Arc<dyn BucketPolicyProvider>,
    config: SharingConfig,
}

impl BucketShareManager {
    /// Creates a new bucket share manager.
    pub fn new(buckets: Arc<dyn BucketPolicyProvider>, config: SharingConfig) -> Self {
        Self { buckets, config }
    }

    /// Statement id owned by a share on a bucket.
    pub fn statement_sid(&self, share_id: ShareId, bucket_id: BucketId) -> String {
        format!(
            "{}{}{}",
            self.config.bucket_statement_prefix,
            share_id.as_uuid().simple(),
            bucket_id.as_uuid().simple()
        )
    }

    /// Load and lock the item's bucket so concurrent runs edit its policy one at a time.
    async fn load_bucket(
        &self,
        session: &mut dyn ShareSession,
        item: &ShareItem,
    ) -> AppResult<DatasetBucket> {
        let bucket_id = BucketId::from(item.item_uri);
        session
            .lock_bucket(bucket_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Bucket {bucket_id} not found")))
    }

    async fn load_policy(&self, bucket: &DatasetBucket) -> AppResult<BucketPolicyDocument> {
        let raw = self
            .buckets
            .get_bucket_policy(&bucket.aws_account_id, &bucket.bucket_name)
            .await
            .map_err(|e| manager_error("Failed to read bucket policy", e))?;
        BucketPolicyDocument::parse(raw.as_deref())
            .map_err(|e| manager_error("Failed to parse bucket policy", e))
    }

    async fn store_policy(&self, bucket: &DatasetBucket, doc: &BucketPolicyDocument) -> AppResult<()> {
        let account = &bucket.aws_account_id;
        let name = &bucket.bucket_name;
        if doc.is_empty() {
            tolerate_not_found(self.buckets.delete_bucket_policy(account, name).await)
                .map_err(|e| manager_error("Failed to delete bucket policy", e))
        } else {
            let policy = doc
                .to_json()
                .map_err(|e| manager_error("Failed to serialize bucket policy", e))?;
            self.buckets
                .put_bucket_policy(account, name, &policy)
                .await
                .map_err(|e| manager_error("Failed to write bucket policy", e))
        }
    }

    async fn remove_statement(&self, bucket: &DatasetBucket, sid: &str) -> AppResult<bool> {
        let mut doc = self.load_policy(bucket).await?;
        if !doc.remove_statement(sid) {
            return Ok(false);
        }
        self.store_policy(bucket, &doc).await?;
        Ok(true)
    }
}

#[async_trait]
impl ShareManager for BucketShareManager {
    fn kind(&self) -> ShareItemType {
        ShareItemType::Bucket
    }

    async fn grant(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
        item: &ShareItem,
    ) -> AppResult<()> {
        let bucket = self.load_bucket(session, item).await?;
        let sid = self.statement_sid(ctx.share.id, bucket.id);
        let statement = PolicyStatement::allow(
            &sid,
            &ctx.env_group.iam_role_arn,
            &self.config.bucket_actions,
            &[bucket.arn(), bucket.objects_arn()],
        );

        let mut doc = self.load_policy(&bucket).await?;
        let changed = doc
            .upsert_statement(&statement)
            .map_err(|e| manager_error("Failed to build bucket policy statement", e))?;
        if !changed {
            debug!(bucket = %bucket.bucket_name, sid = %sid, "Bucket policy already grants access");
            return Ok(());
        }

        self.store_policy(&bucket, &doc).await?;
        info!(
            share_id = %ctx.share.id,
            bucket = %bucket.bucket_name,
            principal = %ctx.env_group.iam_role_arn,
            sid = %sid,
            "Bucket access granted"
        );
        Ok(())
    }

    async fn revoke(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
        item: &ShareItem,
    ) -> AppResult<()> {
        let bucket = self.load_bucket(session, item).await?;
        let sid = self.statement_sid(ctx.share.id, bucket.id);

        if self.remove_statement(&bucket, &sid).await? {
            info!(share_id = %ctx.share.id, bucket = %bucket.bucket_name, sid = %sid, "Bucket access revoked");
        } else {
            debug!(bucket = %bucket.bucket_name, sid = %sid, "Bucket access already revoked");
        }
        Ok(())
    }

    async fn clean_up_share(
        &self,
        session: &mut dyn ShareSession,
        ctx: &ShareContext,
    ) -> AppResult<()> {
        let items = session.list_share_items(ctx.share.id).await?;
        for item in items.iter().filter(|i| {
            i.item_type == ShareItemType::Bucket && i.status == ShareItemStatus::RevokeSucceeded
        }) {
            let bucket = self.load_bucket(session, item).await?;
            let sid = self.statement_sid(ctx.share.id, bucket.id);
            if self.remove_statement(&bucket, &sid).await? {
                warn!(
                    share_id = %ctx.share.id,
                    bucket = %bucket.bucket_name,
                    sid = %sid,
                    "Removed leftover statement of a revoked bucket"
                );
            }
        }
        Ok(())
    }
}
