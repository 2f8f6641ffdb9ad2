//! Environment and environment-group entity models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use datashare_core::types::EnvironmentId;

/// A cloud environment: one account in one region.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Environment {
    /// Unique environment identifier.
    pub id: EnvironmentId,
    /// Display label.
    pub label: String,
    /// Cloud account id.
    pub aws_account_id: String,
    /// Cloud region.
    pub region: String,
    /// Whether this environment may receive shares.
    pub sharing_enabled: bool,
    /// Whether dataset update notifications are enabled.
    pub subscriptions_enabled: bool,
    /// Topic that receives dataset update notifications.
    pub subscriptions_producers_topic_name: Option<String>,
}

/// A group's membership in an environment, with the IAM role it acts through.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnvironmentGroup {
    /// Environment the group is invited to.
    pub environment_id: EnvironmentId,
    /// Group name.
    pub group_name: String,
    /// Role name the group assumes in the environment.
    pub iam_role_name: String,
    /// Role ARN the group assumes in the environment.
    pub iam_role_arn: String,
}
