//! Policy store seam: where policies are read from and conditionally written to.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Policy;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("etag mismatch: policy was read at '{expected}' but the store holds '{actual}'")]
    Conflict { expected: String, actual: String },
    #[error("Policy store I/O error: {0}")]
    Io(String),
    #[error("Policy serialization error: {0}")]
    Serialization(String),
    #[error("Policy store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// External holder of IAM policies, keyed by resource name
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Fetch the current policy. A resource with no policy yields [`Policy::default`].
    async fn get_policy(&self, resource: &str) -> StoreResult<Policy>;

    /// Replace the policy if `policy.etag` still matches the stored one.
    ///
    /// Returns the policy as stored, carrying its new etag.
    async fn set_policy(&self, resource: &str, policy: &Policy) -> StoreResult<Policy>;
}

/// Etag check shared by store implementations
pub fn check_etag(stored: &str, submitted: &str) -> StoreResult<()> {
    if stored == submitted {
        Ok(())
    } else {
        Err(StoreError::Conflict {
            expected: submitted.to_string(),
            actual: stored.to_string(),
        })
    }
}
