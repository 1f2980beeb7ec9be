//! Property-Based Test Generators
//!
//! Provides proptest strategies for relation sets. Ids are drawn from a
//! small pool so generated current and desired sets overlap often.

use std::collections::BTreeSet;

use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for non-nil ids from a pool of 16
pub fn pooled_id_strategy() -> impl Strategy<Value = Uuid> {
    (1u128..=16).prop_map(Uuid::from_u128)
}

/// Strategy for a stored relation set
pub fn relation_set_strategy() -> impl Strategy<Value = BTreeSet<Uuid>> {
    prop::collection::btree_set(pooled_id_strategy(), 0..10)
}

/// Strategy for a duplicate-free desired set, in arbitrary order
pub fn desired_set_strategy() -> impl Strategy<Value = Vec<Uuid>> {
    relation_set_strategy()
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}
