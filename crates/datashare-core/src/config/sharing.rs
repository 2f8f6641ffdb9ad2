//! Share processing configuration.

use serde::{Deserialize, Serialize};

/// Which cloud access backend the share managers talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudBackend {
    /// In-process account model. Used for local runs and tests.
    Memory,
    /// Real AWS accounts (requires the `aws` feature).
    Aws,
}

/// Settings consumed by the bucket and table share managers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingConfig {
    /// Cloud access backend.
    #[serde(default = "default_backend")]
    pub backend: CloudBackend,
    /// Region for AWS clients; the default chain decides when unset.
    #[serde(default)]
    pub aws_region: Option<String>,
    /// Prefix of the bucket-policy statement ids written by bucket grants.
    #[serde(default = "default_statement_prefix")]
    pub bucket_statement_prefix: String,
    /// S3 actions granted on shared buckets.
    #[serde(default = "default_bucket_actions")]
    pub bucket_actions: Vec<String>,
    /// Catalog permissions granted on shared tables.
    #[serde(default = "default_table_permissions")]
    pub table_permissions: Vec<String>,
    /// Infix used to name the shared database in the target account.
    #[serde(default = "default_shared_database_suffix")]
    pub shared_database_suffix: String,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            aws_region: None,
            bucket_statement_prefix: default_statement_prefix(),
            bucket_actions: default_bucket_actions(),
            table_permissions: default_table_permissions(),
            shared_database_suffix: default_shared_database_suffix(),
        }
    }
}

fn default_backend() -> CloudBackend {
    CloudBackend::Memory
}

fn default_statement_prefix() -> String {
    "DataShare".to_string()
}

fn default_bucket_actions() -> Vec<String> {
    vec!["s3:GetObject".to_string(), "s3:ListBucket".to_string()]
}

fn default_table_permissions() -> Vec<String> {
    vec!["SELECT".to_string(), "DESCRIBE".to_string()]
}

fn default_shared_database_suffix() -> String {
    "_shared_".to_string()
}
