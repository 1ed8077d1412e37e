//! IAM bindings service layer
//!
//! Wraps a [`PolicyStore`] and provides the high-level operations (plan, apply)
//! used by front ends. Each operation reads the current policy from the store and
//! runs the reconciliation engine on it; apply then writes the result back
//! guarded by the policy's etag.

use crate::store::PolicyStore;

/// Main service struct holding the policy store
pub struct BindingsService<S> {
    pub(crate) store: S,
}

impl<S: PolicyStore> BindingsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // plan() is in plan.rs
    // apply(), grant() and revoke() are in apply.rs
}
