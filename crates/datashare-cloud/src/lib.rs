//! # datashare-cloud
//!
//! Access to the cloud accounts that shares are provisioned in.
//!
//! Share managers talk to three seams: bucket policies, the data catalog,
//! and the notification topics datasets publish updates to. The in-memory
//! account implements all three. With the `aws` feature they are backed by
//! S3, Glue with Lake Formation, and SNS.

#[cfg(feature = "aws")]
pub mod aws;
pub mod error;
#[cfg(feature = "aws")]
pub mod glue;
#[cfg(feature = "memory")]
pub mod memory;
pub mod policy;
pub mod provider;
#[cfg(feature = "aws")]
pub mod s3;
#[cfg(feature = "aws")]
pub mod sns;

pub use error::{CloudError, CloudResult};
#[cfg(feature = "memory")]
pub use memory::InMemoryCloudAccount;
pub use policy::{BucketPolicyDocument, PolicyStatement};
pub use provider::{
    BucketPolicyProvider, CatalogProvider, CloudProviders, NotificationPublisher, TableGrant,
    TableRef,
};
#[cfg(feature = "aws")]
pub use glue::GlueCatalogProvider;
#[cfg(feature = "aws")]
pub use s3::S3BucketPolicyProvider;
#[cfg(feature = "aws")]
pub use sns::SnsNotificationPublisher;
