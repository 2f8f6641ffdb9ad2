//! Request context carrying the caller's identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the user an operation is performed for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The username.
    pub username: String,
    /// Groups the user belongs to.
    pub groups: Vec<String>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(username: &str, groups: &[&str]) -> Self {
        Self {
            username: username.to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            request_time: Utc::now(),
        }
    }

    /// Whether the user belongs to `group`.
    pub fn is_member(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}
