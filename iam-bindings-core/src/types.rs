//! Policy model shared by the engine, the store seam and the service layer.
//!
//! The serialized shape follows the cloud IAM policy wire format: every field is
//! optional and empty values are omitted rather than emitted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of role identifiers named by a [`PolicyDelta`]
pub type RoleSet = BTreeSet<String>;

/// A full access-control policy for a resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,
    /// Opaque optimistic-concurrency token owned by the policy store
    #[serde(skip_serializing_if = "String::is_empty")]
    pub etag: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub version: i32,
}

impl Policy {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self {
            bindings,
            ..Self::default()
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = etag.into();
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    /// Look up the binding with the given identity
    pub fn find_binding(&self, role: &str, condition: Option<&Condition>) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|b| b.role == role && b.condition.as_ref() == condition)
    }
}

/// A role held by a set of members, optionally scoped by a condition.
///
/// Identity is the `(role, condition)` pair; see [`Binding::key`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Binding {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

/// Borrowed binding identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey<'a> {
    pub role: &'a str,
    pub condition: Option<&'a Condition>,
}

impl Binding {
    pub fn new(role: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            members,
            role: role.into(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn key(&self) -> BindingKey<'_> {
        BindingKey {
            role: &self.role,
            condition: self.condition.as_ref(),
        }
    }

    /// True when both bindings share role and condition
    pub fn same_identity(&self, other: &Binding) -> bool {
        self.key() == other.key()
    }

    pub fn has_member(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }
}

/// Scoping predicate attached to a binding. All fields are opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub expression: String,
}

impl Condition {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            expression: expression.into(),
        }
    }
}

/// A requested grant or revoke for one principal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDelta {
    pub roles: RoleSet,
    /// Bare principal identifier, without the member prefix
    pub email: String,
    /// Bindings only match when their condition equals this one
    pub condition: Option<Condition>,
}

impl PolicyDelta {
    pub fn new<I, R>(email: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            email: email.into(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: Option<Condition>) -> Self {
        self.condition = condition;
        self
    }

    pub fn matches(&self, binding: &Binding) -> bool {
        self.roles.contains(&binding.role) && self.condition == binding.condition
    }
}

/// Options for [`crate::BindingsService::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Re-read and retry attempts after an etag conflict
    pub max_retries: u32,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Outcome of a dry run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanResult {
    pub changed: bool,
    pub current: Policy,
    pub proposed: Policy,
}

/// Outcome of an applied change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyResult {
    pub changed: bool,
    /// Number of read-reconcile-write rounds performed
    pub attempts: u32,
    /// The policy as held by the store after the call
    pub policy: Policy,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(v: &i32) -> bool {
    *v == 0
}
