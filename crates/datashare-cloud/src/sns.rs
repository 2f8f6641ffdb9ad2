//! SNS notification publisher (requires `aws` feature).

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sns::Client as SnsClient;
use aws_sdk_sns::error::ProvideErrorMetadata;
use serde_json::Value;
use tracing::debug;

use crate::error::{CloudError, CloudResult};
use crate::provider::NotificationPublisher;

const NOT_FOUND: &str = "NotFound";
const AUTHORIZATION_ERROR: &str = "AuthorizationError";

/// Publishes dataset notifications to SNS topics.
///
/// Topics are addressed by name; the ARN is derived from the dataset's
/// account and region.
#[derive(Debug, Clone)]
pub struct SnsNotificationPublisher {
    config: SdkConfig,
}

impl SnsNotificationPublisher {
    /// Create a publisher from a loaded SDK configuration.
    pub fn new(config: SdkConfig) -> Self {
        Self { config }
    }

    fn client(&self, region: &str) -> SnsClient {
        let config = aws_sdk_sns::config::Builder::from(&self.config)
            .region(aws_sdk_sns::config::Region::new(region.to_string()))
            .build();
        SnsClient::from_conf(config)
    }
}

/// ARN of a topic owned by `account_id` in `region`.
pub fn topic_arn(account_id: &str, region: &str, topic: &str) -> String {
    format!("arn:aws:sns:{region}:{account_id}:{topic}")
}

fn classify<E>(topic: &str, err: E) -> CloudError
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    match err.code() {
        Some(NOT_FOUND) => CloudError::NotFound(format!("topic {topic}: {err}")),
        Some(AUTHORIZATION_ERROR) => CloudError::AccessDenied(format!("topic {topic}: {err}")),
        _ => CloudError::Service(format!("topic {topic}: {err}")),
    }
}

#[async_trait]
impl NotificationPublisher for SnsNotificationPublisher {
    async fn publish(
        &self,
        account_id: &str,
        region: &str,
        topic: &str,
        message: &Value,
    ) -> CloudResult<String> {
        let body = serde_json::to_string(message)
            .map_err(|e| CloudError::Malformed(format!("notification for {topic}: {e}")))?;
        let output = self
            .client(region)
            .publish()
            .topic_arn(topic_arn(account_id, region, topic))
            .message(body)
            .send()
            .await
            .map_err(|e| classify(topic, e.into_service_error()))?;
        let message_id = output.message_id.unwrap_or_default();
        debug!(topic, %message_id, "Notification published");
        Ok(message_id)
    }
}
