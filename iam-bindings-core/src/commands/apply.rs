//! Apply logic for the bindings service

use log::{info, warn};

use crate::error::{BindingsError, BindingsResult};
use crate::store::{PolicyStore, StoreError};
use crate::types::{ApplyOptions, ApplyResult, PolicyDelta};

impl<S: PolicyStore> super::service::BindingsService<S> {
    /// Read, reconcile and conditionally write a policy.
    ///
    /// An etag conflict means someone else wrote the policy after we read it; the
    /// policy is re-read and the change recomputed, at most `options.max_retries`
    /// times. When the change is already in effect nothing is written.
    pub async fn apply(
        &self,
        resource: &str,
        to_add: Option<&PolicyDelta>,
        to_remove: Option<&PolicyDelta>,
        options: ApplyOptions,
    ) -> BindingsResult<ApplyResult> {
        let max_attempts = options.max_retries.saturating_add(1);

        for attempt in 1..=max_attempts {
            let current = self.store.get_policy(resource).await?;
            let (changed, proposed) = current.change_bindings(to_add, to_remove);

            if !changed {
                info!("Bindings for {} already up to date", resource);
                return Ok(ApplyResult {
                    changed: false,
                    attempts: attempt,
                    policy: current,
                });
            }

            match self.store.set_policy(resource, &proposed).await {
                Ok(policy) => {
                    info!(
                        "Updated policy for {} ({} bindings, etag {})",
                        resource,
                        policy.bindings.len(),
                        policy.etag
                    );
                    return Ok(ApplyResult {
                        changed: true,
                        attempts: attempt,
                        policy,
                    });
                }
                Err(StoreError::Conflict { expected, actual }) => {
                    warn!(
                        "Policy for {} changed during update (read {}, found {}), attempt {}/{}",
                        resource, expected, actual, attempt, max_attempts
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(BindingsError::RetriesExhausted {
            attempts: max_attempts,
        })
    }

    /// Grant `delta.email` the roles in `delta`
    pub async fn grant(
        &self,
        resource: &str,
        delta: &PolicyDelta,
        options: ApplyOptions,
    ) -> BindingsResult<ApplyResult> {
        self.apply(resource, Some(delta), None, options).await
    }

    /// Revoke the roles in `delta` from `delta.email`
    pub async fn revoke(
        &self,
        resource: &str,
        delta: &PolicyDelta,
        options: ApplyOptions,
    ) -> BindingsResult<ApplyResult> {
        self.apply(resource, None, Some(delta), options).await
    }
}
