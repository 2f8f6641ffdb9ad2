//! S3 bucket policy provider (requires `aws` feature).

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use tracing::debug;

use crate::error::{CloudError, CloudResult};
use crate::provider::BucketPolicyProvider;

const NO_SUCH_BUCKET_POLICY: &str = "NoSuchBucketPolicy";
const NO_SUCH_BUCKET: &str = "NoSuchBucket";
const ACCESS_DENIED: &str = "AccessDenied";

/// Bucket policy provider backed by the S3 API.
///
/// Calls run with the ambient credentials, which must be able to manage
/// policies of the dataset buckets; `account_id` is passed as the expected
/// bucket owner.
#[derive(Debug, Clone)]
pub struct S3BucketPolicyProvider {
    client: S3Client,
}

impl S3BucketPolicyProvider {
    /// Create a provider from a loaded SDK configuration.
    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: S3Client::new(config),
        }
    }

    /// Create a provider from an existing client.
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

fn classify<E>(bucket: &str, err: E) -> CloudError
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    match err.code() {
        Some(code @ (NO_SUCH_BUCKET_POLICY | NO_SUCH_BUCKET)) => {
            CloudError::NotFound(format!("bucket {bucket}: {code}"))
        }
        Some(ACCESS_DENIED) => CloudError::AccessDenied(format!("bucket {bucket}: {err}")),
        _ => CloudError::Service(format!("bucket {bucket}: {err}")),
    }
}

#[async_trait]
impl BucketPolicyProvider for S3BucketPolicyProvider {
    async fn get_bucket_policy(&self, account_id: &str, bucket: &str) -> CloudResult<Option<String>> {
        match self
            .client
            .get_bucket_policy()
            .bucket(bucket)
            .expected_bucket_owner(account_id)
            .send()
            .await
        {
            Ok(output) => Ok(output.policy().map(str::to_string)),
            Err(e) => {
                let err = e.into_service_error();
                if err.code() == Some(NO_SUCH_BUCKET_POLICY) {
                    Ok(None)
                } else {
                    Err(classify(bucket, err))
                }
            }
        }
    }

    async fn put_bucket_policy(&self, account_id: &str, bucket: &str, policy: &str) -> CloudResult<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .expected_bucket_owner(account_id)
            .policy(policy)
            .send()
            .await
            .map_err(|e| classify(bucket, e.into_service_error()))?;
        debug!(bucket, "Bucket policy updated");
        Ok(())
    }

    async fn delete_bucket_policy(&self, account_id: &str, bucket: &str) -> CloudResult<()> {
        self.client
            .delete_bucket_policy()
            .bucket(bucket)
            .expected_bucket_owner(account_id)
            .send()
            .await
            .map_err(|e| classify(bucket, e.into_service_error()))?;
        debug!(bucket, "Bucket policy deleted");
        Ok(())
    }
}
