//! Action names tasks are dispatched on.

/// Grant access for the approved items of a share.
pub const SHARE_APPROVE: &str = "ecs.share.approve";

/// Revoke access for the revoke-approved items of a share.
pub const SHARE_REVOKE: &str = "ecs.share.revoke";

/// Notify subscribers that a dataset table changed.
pub const DATASET_PUBLISH_UPDATE: &str = "sns.dataset.publish_update";
