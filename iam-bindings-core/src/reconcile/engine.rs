//! Binding reconciliation engine
//!
//! Computes a new policy from an existing one plus an optional grant and an
//! optional revoke. Bindings are identified by `(role, condition)`: a delta only
//! touches bindings whose role it names and whose condition is structurally
//! equal to its own. Member lists are treated as sets, bindings sharing an
//! identity are merged into the first of them, bindings left without members
//! are pruned, and roles the grant names but no existing binding satisfies get a
//! freshly synthesized binding appended after the existing ones.
//!
//! The input policy is never mutated. When nothing changes the caller gets the
//! original policy back as [`Cow::Borrowed`].

use log::{debug, trace};
use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use super::member::service_account_member;
use crate::types::{Binding, BindingKey, Policy, PolicyDelta};

impl Policy {
    /// Grant `to_add.email` every role in `to_add.roles` under `to_add.condition`
    pub fn add_bindings(&self, to_add: &PolicyDelta) -> (bool, Cow<'_, Policy>) {
        self.change_bindings(Some(to_add), None)
    }

    /// Revoke `to_remove.email` from every role in `to_remove.roles` under `to_remove.condition`
    pub fn remove_bindings(&self, to_remove: &PolicyDelta) -> (bool, Cow<'_, Policy>) {
        self.change_bindings(None, Some(to_remove))
    }

    /// Apply a grant and/or a revoke in a single pass.
    ///
    /// Returns `(changed, policy)`. `policy` is borrowed from `self` exactly when
    /// `changed` is false; otherwise it is a new policy carrying this policy's
    /// `etag` and `version`.
    pub fn change_bindings(
        &self,
        to_add: Option<&PolicyDelta>,
        to_remove: Option<&PolicyDelta>,
    ) -> (bool, Cow<'_, Policy>) {
        if to_add.is_none() && to_remove.is_none() {
            return (false, Cow::Borrowed(self));
        }

        let add = to_add.map(|delta| (delta, service_account_member(&delta.email)));
        let remove = to_remove.map(|delta| (delta, service_account_member(&delta.email)));

        let mut changed = false;
        // Member sets per identity, in first-seen order; duplicate identities merge here
        let mut merged: Vec<(&Binding, BTreeSet<&str>)> = Vec::with_capacity(self.bindings.len());
        let mut positions: HashMap<BindingKey<'_>, usize> = HashMap::new();
        // Existing bindings the grant matched; no binding is synthesized for these
        let mut already_added: Vec<&Binding> = Vec::new();

        for binding in &self.bindings {
            let mut members: BTreeSet<&str> = binding.members.iter().map(String::as_str).collect();

            if let Some((delta, member)) = &add {
                if delta.matches(binding) {
                    already_added.push(binding);
                    if members.insert(member.as_str()) {
                        trace!("Adding {} to {}", member, binding.role);
                        changed = true;
                    }
                }
            }

            if let Some((delta, member)) = &remove {
                if delta.matches(binding) && members.remove(member.as_str()) {
                    trace!("Removing {} from {}", member, binding.role);
                    changed = true;
                }
            }

            match positions.entry(binding.key()) {
                Entry::Occupied(slot) => {
                    trace!("Merging duplicate binding for {}", binding.role);
                    changed = true;
                    merged[*slot.get()].1.extend(members);
                }
                Entry::Vacant(slot) => {
                    slot.insert(merged.len());
                    merged.push((binding, members));
                }
            }
        }

        let mut new_bindings: Vec<Binding> = Vec::with_capacity(merged.len());
        for (binding, members) in merged {
            if members.is_empty() {
                trace!("Dropping empty binding for {}", binding.role);
                continue;
            }
            new_bindings.push(Binding {
                members: members.into_iter().map(str::to_owned).collect(),
                role: binding.role.clone(),
                condition: binding.condition.clone(),
            });
        }

        if let Some((delta, member)) = &add {
            for role in &delta.roles {
                let binding = Binding {
                    members: vec![member.clone()],
                    role: role.clone(),
                    condition: delta.condition.clone(),
                };
                if binding_exists(already_added.iter().copied(), &binding) {
                    continue;
                }
                trace!("Creating binding for {} with {}", role, member);
                changed = true;
                new_bindings.push(binding);
            }
        }

        if !changed {
            debug!("Bindings unchanged");
            return (false, Cow::Borrowed(self));
        }

        debug!(
            "Bindings changed: {} -> {} bindings",
            self.bindings.len(),
            new_bindings.len()
        );
        (
            true,
            Cow::Owned(Policy {
                bindings: new_bindings,
                etag: self.etag.clone(),
                version: self.version,
            }),
        )
    }
}

/// True if any of `existing` has the same role and condition as `binding`
pub fn binding_exists<'a>(
    existing: impl IntoIterator<Item = &'a Binding>,
    binding: &Binding,
) -> bool {
    existing.into_iter().any(|b| b.same_identity(binding))
}
