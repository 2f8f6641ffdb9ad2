//! Cloud call errors.

use datashare_core::error::{AppError, ErrorKind};

/// Result alias for cloud calls.
pub type CloudResult<T> = Result<T, CloudError>;

/// Failure of a call against a cloud account.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// The addressed resource does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),
    /// The resource already exists.
    #[error("resource already exists: {0}")]
    AlreadyExists(String),
    /// The caller is not allowed to perform the call.
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// A stored document could not be parsed.
    #[error("malformed document: {0}")]
    Malformed(String),
    /// The service rejected or failed the call.
    #[error("service error: {0}")]
    Service(String),
}

impl CloudError {
    /// Whether the error reports a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<CloudError> for AppError {
    fn from(err: CloudError) -> Self {
        let kind = match &err {
            CloudError::NotFound(_) => ErrorKind::NotFound,
            CloudError::AlreadyExists(_) => ErrorKind::Conflict,
            CloudError::AccessDenied(_) => ErrorKind::Authorization,
            CloudError::Malformed(_) => ErrorKind::Serialization,
            CloudError::Service(_) => ErrorKind::ExternalService,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}
