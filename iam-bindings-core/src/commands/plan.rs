//! Dry-run logic for the bindings service

use log::info;

use crate::error::BindingsResult;
use crate::store::PolicyStore;
use crate::types::{PlanResult, PolicyDelta};

impl<S: PolicyStore> super::service::BindingsService<S> {
    /// Compute the policy a change would produce without writing it
    pub async fn plan(
        &self,
        resource: &str,
        to_add: Option<&PolicyDelta>,
        to_remove: Option<&PolicyDelta>,
    ) -> BindingsResult<PlanResult> {
        let current = self.store.get_policy(resource).await?;
        let (changed, proposed) = current.change_bindings(to_add, to_remove);
        let proposed = proposed.into_owned();

        info!(
            "Planned change for {}: {}",
            resource,
            if changed { "policy would change" } else { "no change" }
        );

        Ok(PlanResult {
            changed,
            current,
            proposed,
        })
    }
}
