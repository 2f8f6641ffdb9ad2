//! Wiring of the AWS-backed providers (requires `aws` feature).

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::info;

use crate::glue::GlueCatalogProvider;
use crate::provider::CloudProviders;
use crate::s3::S3BucketPolicyProvider;
use crate::sns::SnsNotificationPublisher;

/// Load the SDK configuration from the default credential chain.
pub async fn load_config(region: Option<String>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    loader.load().await
}

/// Build bucket, catalog and notification providers sharing one configuration.
pub async fn providers(region: Option<String>) -> CloudProviders {
    let config = load_config(region).await;
    info!(region = ?config.region(), "Initializing AWS sharing providers");
    CloudProviders {
        buckets: Arc::new(S3BucketPolicyProvider::from_config(&config)),
        catalog: Arc::new(GlueCatalogProvider::new(config.clone())),
        notifications: Arc::new(SnsNotificationPublisher::new(config)),
    }
}
