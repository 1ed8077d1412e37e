use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the service layer. The reconciliation engine itself is infallible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingsError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Policy changed concurrently on every attempt; gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

impl BindingsError {
    /// True when the underlying failure is an etag conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Conflict { .. }) | Self::RetriesExhausted { .. }
        )
    }
}

pub type BindingsResult<T> = Result<T, BindingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_conflict() {
        let conflict = BindingsError::from(StoreError::Conflict {
            expected: "a".into(),
            actual: "b".into(),
        });
        assert!(conflict.is_conflict());
        assert!(BindingsError::RetriesExhausted { attempts: 4 }.is_conflict());
        assert!(!BindingsError::from(StoreError::Io("disk".into())).is_conflict());
    }

    #[test]
    fn test_display() {
        let err = BindingsError::RetriesExhausted { attempts: 4 };
        assert_eq!(
            err.to_string(),
            "Policy changed concurrently on every attempt; gave up after 4 attempts"
        );
    }
}
