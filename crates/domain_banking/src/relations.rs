//! Many-to-many relation model and set reconciliation
//!
//! A relation set belongs to exactly one owner aggregate. Updating an
//! aggregate hands in a *desired* set per relation type; [`reconcile`] turns
//! the current and desired sets into the minimal list of inserts and deletes.
//!
//! # Desired-set policy
//!
//! [`DesiredRelations`] distinguishes three intents per relation type:
//!
//! - **keep** (the type is absent from the map): the stored set is not read
//!   or written at all
//! - **set**: the stored set becomes exactly the given targets
//! - **clear**: shorthand for setting an empty set, which deletes every row
//!   of that type
//!
//! An empty desired set always means "clear". There is no implicit resync.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{AggregateRecord, EntityKind};
use crate::error::BankError;

/// The four association tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// `(deposit_id, client_id)`, owned by the client
    DepositClient,
    /// `(client_id, credit_program_id)`, owned by the client
    ClientCreditProgram,
    /// `(deposit_id, currency_id)`, owned by the deposit
    DepositCurrency,
    /// `(credit_program_id, currency_id)`, owned by the credit program
    CreditProgramCurrency,
}

impl RelationKind {
    pub const ALL: [RelationKind; 4] = [
        RelationKind::DepositClient,
        RelationKind::ClientCreditProgram,
        RelationKind::DepositCurrency,
        RelationKind::CreditProgramCurrency,
    ];

    /// The aggregate whose update drives this relation set
    pub fn owner(&self) -> EntityKind {
        match self {
            RelationKind::DepositClient | RelationKind::ClientCreditProgram => EntityKind::Client,
            RelationKind::DepositCurrency => EntityKind::Deposit,
            RelationKind::CreditProgramCurrency => EntityKind::CreditProgram,
        }
    }

    /// The aggregate referenced by the other side of the pair
    pub fn target(&self) -> EntityKind {
        match self {
            RelationKind::DepositClient => EntityKind::Deposit,
            RelationKind::ClientCreditProgram => EntityKind::CreditProgram,
            RelationKind::DepositCurrency | RelationKind::CreditProgramCurrency => {
                EntityKind::Currency
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::DepositClient => "DepositClient",
            RelationKind::ClientCreditProgram => "ClientCreditProgram",
            RelationKind::DepositCurrency => "DepositCurrency",
            RelationKind::CreditProgramCurrency => "CreditProgramCurrency",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One association row, oriented from the owner's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationPair {
    pub owner_id: Uuid,
    pub target_id: Uuid,
}

impl RelationPair {
    pub fn new(owner_id: impl Into<Uuid>, target_id: impl Into<Uuid>) -> Self {
        Self {
            owner_id: owner_id.into(),
            target_id: target_id.into(),
        }
    }
}

/// Minimal change set for one relation type of one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDiff {
    pub kind: RelationKind,
    pub owner_id: Uuid,
    /// Targets to insert, ascending
    pub to_insert: Vec<Uuid>,
    /// Targets to delete, ascending
    pub to_delete: Vec<Uuid>,
}

impl RelationDiff {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_delete.is_empty()
    }

    /// Number of storage statements applying this diff will issue
    pub fn operation_count(&self) -> usize {
        self.to_insert.len() + self.to_delete.len()
    }

    pub fn inserts(&self) -> impl Iterator<Item = RelationPair> + '_ {
        self.to_insert
            .iter()
            .map(move |target| RelationPair::new(self.owner_id, *target))
    }

    pub fn deletes(&self) -> impl Iterator<Item = RelationPair> + '_ {
        self.to_delete
            .iter()
            .map(move |target| RelationPair::new(self.owner_id, *target))
    }
}

/// Caller-supplied target state for the relation sets of one aggregate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredRelations {
    sets: BTreeMap<RelationKind, Vec<Uuid>>,
}

impl DesiredRelations {
    /// No relation type is touched
    pub fn new() -> Self {
        Self::default()
    }

    /// Every relation set owned by `record`, taken from the record itself
    pub fn from_record(record: &AggregateRecord) -> Self {
        let mut desired = Self::new();
        for kind in record.kind().owned_relations() {
            if let Some(targets) = record.relation_targets(*kind) {
                desired.sets.insert(*kind, targets.into_iter().collect());
            }
        }
        desired
    }

    /// The stored set of `kind` becomes exactly `targets`
    ///
    /// Duplicates are kept as given so validation can reject them.
    pub fn set<I, T>(mut self, kind: RelationKind, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Uuid>,
    {
        self.sets.insert(kind, targets.into_iter().map(Into::into).collect());
        self
    }

    /// Every row of `kind` is deleted
    pub fn clear(mut self, kind: RelationKind) -> Self {
        self.sets.insert(kind, Vec::new());
        self
    }

    /// `kind` is left untouched
    pub fn keep(mut self, kind: RelationKind) -> Self {
        self.sets.remove(&kind);
        self
    }

    /// The desired targets for `kind`, or `None` when it is left untouched
    pub fn get(&self, kind: RelationKind) -> Option<&[Uuid]> {
        self.sets.get(&kind).map(Vec::as_slice)
    }

    /// Relation types this update touches, in a stable order
    pub fn kinds(&self) -> impl Iterator<Item = RelationKind> + '_ {
        self.sets.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Checks every touched set against the owner kind, nil ids and duplicates
    pub fn validate(&self, owner: EntityKind) -> Result<(), BankError> {
        for (kind, targets) in &self.sets {
            if kind.owner() != owner {
                return Err(BankError::validation(format!(
                    "{} relations are not owned by {}",
                    kind, owner
                )));
            }
            validate_targets(*kind, targets)?;
        }
        Ok(())
    }
}

/// Rejects nil target ids and repeated targets
pub fn validate_targets(kind: RelationKind, targets: &[Uuid]) -> Result<BTreeSet<Uuid>, BankError> {
    let mut seen = BTreeSet::new();
    for target in targets {
        if target.is_nil() {
            return Err(BankError::validation(format!(
                "{} relation has an empty {} id",
                kind,
                kind.target()
            )));
        }
        if !seen.insert(*target) {
            return Err(BankError::validation(format!(
                "duplicate {} pair for {} {}",
                kind,
                kind.target(),
                target
            )));
        }
    }
    Ok(seen)
}

/// Computes the inserts and deletes that turn `current` into `desired`
///
/// Targets present in both sets produce no operation.
pub fn reconcile(
    owner_id: Uuid,
    kind: RelationKind,
    current: &BTreeSet<Uuid>,
    desired: &[Uuid],
) -> Result<RelationDiff, BankError> {
    if owner_id.is_nil() {
        return Err(BankError::validation(format!(
            "{} relation has an empty {} id",
            kind,
            kind.owner()
        )));
    }
    let desired = validate_targets(kind, desired)?;

    Ok(RelationDiff {
        kind,
        owner_id,
        to_insert: desired.difference(current).copied().collect(),
        to_delete: current.difference(&desired).copied().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn test_reconcile_keeps_common_targets() {
        let (a, b, c) = (id(1), id(2), id(3));
        let current: BTreeSet<_> = [a, c].into_iter().collect();

        let diff = reconcile(id(100), RelationKind::DepositClient, &current, &[a, b]).unwrap();

        assert_eq!(diff.to_insert, vec![b]);
        assert_eq!(diff.to_delete, vec![c]);
        assert_eq!(diff.operation_count(), 2);
    }

    #[test]
    fn test_reconcile_empty_desired_clears() {
        let current: BTreeSet<_> = [id(1), id(2)].into_iter().collect();
        let diff = reconcile(id(100), RelationKind::DepositCurrency, &current, &[]).unwrap();

        assert!(diff.to_insert.is_empty());
        assert_eq!(diff.to_delete, vec![id(1), id(2)]);
    }

    #[test]
    fn test_reconcile_rejects_duplicates() {
        let err = reconcile(id(100), RelationKind::DepositClient, &BTreeSet::new(), &[id(1), id(1)])
            .unwrap_err();
        assert!(matches!(err, BankError::Validation(_)));
    }

    #[test]
    fn test_reconcile_rejects_nil_ids() {
        let err = reconcile(Uuid::nil(), RelationKind::DepositClient, &BTreeSet::new(), &[id(1)])
            .unwrap_err();
        assert!(matches!(err, BankError::Validation(_)));

        let err = reconcile(id(100), RelationKind::DepositClient, &BTreeSet::new(), &[Uuid::nil()])
            .unwrap_err();
        assert!(matches!(err, BankError::Validation(_)));
    }

    #[test]
    fn test_desired_keep_set_clear() {
        let desired = DesiredRelations::new()
            .set(RelationKind::DepositClient, [id(1)])
            .clear(RelationKind::ClientCreditProgram);

        assert_eq!(desired.get(RelationKind::DepositClient), Some(&[id(1)] as &[Uuid]));
        assert_eq!(desired.get(RelationKind::ClientCreditProgram), Some(&[] as &[Uuid]));

        let desired = desired.keep(RelationKind::ClientCreditProgram);
        assert_eq!(desired.get(RelationKind::ClientCreditProgram), None);
        assert_eq!(desired.kinds().count(), 1);
    }

    #[test]
    fn test_desired_validate_rejects_foreign_kind() {
        let desired = DesiredRelations::new().set(RelationKind::DepositCurrency, [id(1)]);
        assert!(desired.validate(EntityKind::Client).is_err());
        assert!(desired.validate(EntityKind::Deposit).is_ok());
    }
}
