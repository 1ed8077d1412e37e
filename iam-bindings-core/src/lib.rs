//! This crate provides the core logic for reconciling IAM role bindings:
//! - The policy model (policies, bindings, conditions, deltas)
//! - The binding reconciliation engine
//! - The policy store seam and an in-memory store
//! - Etag-guarded plan/apply on top of a store
//!

pub mod commands;
mod error;
pub mod reconcile;
pub mod store;
mod types;

// Re-exports for a small, focused public API
pub use commands::BindingsService;
pub use error::{BindingsError, BindingsResult};
pub use reconcile::{binding_exists, service_account_member};
pub use store::memory::InMemoryPolicyStore;
pub use store::{PolicyStore, StoreError, StoreResult};
pub use types::{
    ApplyOptions, ApplyResult, Binding, BindingKey, Condition, PlanResult, Policy, PolicyDelta,
    RoleSet,
};
