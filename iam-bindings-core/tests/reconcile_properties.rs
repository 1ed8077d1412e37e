use iam_bindings_core::{Binding, Condition, Policy, PolicyDelta};
use proptest::prelude::*;
use std::borrow::Cow;
use std::collections::BTreeSet;

type BindingSet = BTreeSet<(String, Option<Condition>, BTreeSet<String>)>;

fn binding_set(policy: &Policy) -> BindingSet {
    policy
        .bindings
        .iter()
        .map(|b| {
            (
                b.role.clone(),
                b.condition.clone(),
                b.members.iter().cloned().collect(),
            )
        })
        .collect()
}

fn arb_role() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["roles/viewer", "roles/editor", "roles/owner", "roles/custom"])
        .prop_map(String::from)
}

fn arb_condition() -> impl Strategy<Value = Option<Condition>> {
    prop_oneof![
        Just(None),
        Just(Some(Condition::default())),
        Just(Some(Condition::new("weekdays", "", "request.time.getDayOfWeek() < 5"))),
        Just(Some(Condition::new("prefix", "bucket", "resource.name.startsWith(\"b\")"))),
    ]
}

fn arb_email() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a@x.iam", "b@x.iam", "c@x.iam"]).prop_map(String::from)
}

/// Policies as a store would hand them out: unique binding identities, non-empty members
fn arb_policy() -> impl Strategy<Value = Policy> {
    prop::collection::btree_map(
        (arb_role(), arb_condition()),
        prop::collection::btree_set(arb_email().prop_map(|e| format!("serviceAccount:{e}")), 1..3),
        0..6,
    )
    .prop_map(|bindings| {
        Policy::new(
            bindings
                .into_iter()
                .map(|((role, condition), members)| Binding {
                    members: members.into_iter().collect(),
                    role,
                    condition,
                })
                .collect(),
        )
        .with_etag("BwXyz")
        .with_version(3)
    })
}

/// Hand-edited policies may repeat an identity
fn arb_policy_with_duplicates() -> impl Strategy<Value = Policy> {
    prop::collection::vec(
        (
            arb_role(),
            arb_condition(),
            prop::collection::vec(arb_email().prop_map(|e| format!("serviceAccount:{e}")), 0..3),
        ),
        0..8,
    )
    .prop_map(|bindings| {
        Policy::new(
            bindings
                .into_iter()
                .map(|(role, condition, members)| Binding {
                    members,
                    role,
                    condition,
                })
                .collect(),
        )
    })
}

fn arb_delta() -> impl Strategy<Value = PolicyDelta> {
    (
        arb_email(),
        prop::collection::btree_set(arb_role(), 0..4),
        arb_condition(),
    )
        .prop_map(|(email, roles, condition)| {
            PolicyDelta::new(email, roles).with_condition(condition)
        })
}

proptest! {
    #[test]
    fn second_identical_add_is_noop(policy in arb_policy(), delta in arb_delta()) {
        let (_, once) = policy.add_bindings(&delta);
        let (changed, twice) = once.add_bindings(&delta);
        prop_assert!(!changed);
        prop_assert!(matches!(twice, Cow::Borrowed(_)));
    }

    #[test]
    fn add_then_remove_restores_bindings(policy in arb_policy(), delta in arb_delta()) {
        let member = format!("serviceAccount:{}", delta.email);
        // Only meaningful when the member was not already granted anywhere the delta touches
        prop_assume!(!policy.bindings.iter().any(|b| delta.matches(b) && b.has_member(&member)));

        let (_, added) = policy.add_bindings(&delta);
        let (_, restored) = added.remove_bindings(&delta);
        prop_assert_eq!(binding_set(&restored), binding_set(&policy));
    }

    #[test]
    fn output_has_unique_identities_and_no_empty_bindings(
        policy in arb_policy(),
        add in prop::option::of(arb_delta()),
        remove in prop::option::of(arb_delta()),
    ) {
        let (_, result) = policy.change_bindings(add.as_ref(), remove.as_ref());

        let keys: BTreeSet<_> = result.bindings.iter().map(Binding::key).collect();
        prop_assert_eq!(keys.len(), result.bindings.len());
        prop_assert!(result.bindings.iter().all(|b| !b.members.is_empty()));
        prop_assert_eq!(&result.etag, &policy.etag);
        prop_assert_eq!(result.version, policy.version);
    }

    #[test]
    fn unchanged_result_is_original(
        policy in arb_policy(),
        add in prop::option::of(arb_delta()),
        remove in prop::option::of(arb_delta()),
    ) {
        let snapshot = policy.clone();
        let (changed, result) = policy.change_bindings(add.as_ref(), remove.as_ref());

        prop_assert_eq!(changed, matches!(result, Cow::Owned(_)));
        if !changed {
            prop_assert!(std::ptr::eq(&*result, &policy));
        }
        prop_assert_eq!(&policy, &snapshot);
    }

    #[test]
    fn granted_member_holds_every_role(policy in arb_policy(), delta in arb_delta()) {
        let member = format!("serviceAccount:{}", delta.email);
        let (_, result) = policy.add_bindings(&delta);

        for role in &delta.roles {
            let binding = result.find_binding(role, delta.condition.as_ref());
            prop_assert!(binding.is_some_and(|b| b.has_member(&member)));
        }
    }

    #[test]
    fn duplicate_identities_merge_without_losing_members(
        policy in arb_policy_with_duplicates(),
        delta in arb_delta(),
    ) {
        let (_, result) = policy.add_bindings(&delta);

        let keys: BTreeSet<_> = result.bindings.iter().map(Binding::key).collect();
        prop_assert_eq!(keys.len(), result.bindings.len());
        for binding in &policy.bindings {
            for member in &binding.members {
                let merged = result.find_binding(&binding.role, binding.condition.as_ref());
                prop_assert!(merged.is_some_and(|b| b.has_member(member)));
            }
        }
    }
}
