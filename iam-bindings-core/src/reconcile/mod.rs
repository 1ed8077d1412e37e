//! Binding reconciliation (pure, no I/O)

pub mod engine;
pub mod member;

pub use engine::binding_exists;
pub use member::{service_account_member, SERVICE_ACCOUNT_MEMBER_PREFIX};
