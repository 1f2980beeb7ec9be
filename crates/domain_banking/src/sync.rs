//! Relationship synchronizer
//!
//! Keeps the relation sets of an aggregate equal to a caller-supplied desired
//! state. Every call runs in exactly one write transaction: the scalar row
//! and all touched relation sets commit together or not at all.
//!
//! Calls for the same aggregate are serialized twice: in process by a
//! per-id async lock, and at the store by
//! [`RelationTransaction::lock_aggregate`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::entities::{AggregateRecord, EntityKind};
use crate::error::BankError;
use crate::ports::{AggregateStorePort, RelationTransaction};
use crate::relations::{reconcile, DesiredRelations, RelationDiff};

/// An aggregate update: new scalar values plus the desired relation sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateUpdate {
    pub record: AggregateRecord,
    pub relations: DesiredRelations,
}

impl AggregateUpdate {
    /// Scalar-only update; every relation set is kept as stored
    pub fn scalars(record: impl Into<AggregateRecord>) -> Self {
        Self {
            record: record.into(),
            relations: DesiredRelations::new(),
        }
    }

    /// Update whose desired sets are the relation sets carried by the record
    pub fn from_record(record: impl Into<AggregateRecord>) -> Self {
        let record = record.into();
        let relations = DesiredRelations::from_record(&record);
        Self { record, relations }
    }

    pub fn with_relations(mut self, relations: DesiredRelations) -> Self {
        self.relations = relations;
        self
    }
}

/// What one synchronizer call changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub entity: EntityKind,
    pub aggregate_id: Uuid,
    /// One diff per touched relation type, including empty ones
    pub diffs: Vec<RelationDiff>,
}

impl SyncOutcome {
    pub fn inserted_count(&self) -> usize {
        self.diffs.iter().map(|d| d.to_insert.len()).sum()
    }

    pub fn deleted_count(&self) -> usize {
        self.diffs.iter().map(|d| d.to_delete.len()).sum()
    }

    /// True when no relation row was written
    pub fn is_noop(&self) -> bool {
        self.diffs.iter().all(RelationDiff::is_empty)
    }
}

/// Registry of per-aggregate locks
///
/// Entries nobody holds or waits on are pruned on each acquire.
#[derive(Debug, Default)]
struct AggregateLocks {
    inner: Mutex<HashMap<(EntityKind, Uuid), Arc<Mutex<()>>>>,
}

impl AggregateLocks {
    async fn acquire(&self, kind: EntityKind, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry((kind, id)).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Inserts and updates aggregates together with their relation sets
pub struct RelationshipSynchronizer {
    store: Arc<dyn AggregateStorePort>,
    locks: AggregateLocks,
}

impl RelationshipSynchronizer {
    pub fn new(store: Arc<dyn AggregateStorePort>) -> Self {
        Self {
            store,
            locks: AggregateLocks::default(),
        }
    }

    /// Inserts a new aggregate and its initial relation sets
    ///
    /// The relation sets carried by `record` are written in the same
    /// transaction as the aggregate row.
    ///
    /// # Errors
    ///
    /// - `Validation` for a nil id or a nil relation target
    /// - `Conflict` if the aggregate exists or a target does not
    /// - `Storage` for any other store failure
    #[instrument(skip(self, record), fields(entity = %record.kind(), aggregate_id = %record.id()))]
    pub async fn add_element(&self, record: AggregateRecord) -> Result<SyncOutcome, BankError> {
        let (kind, id) = (record.kind(), record.id());
        if id.is_nil() {
            return Err(BankError::validation(format!("{} id must not be empty", kind)));
        }
        let desired = DesiredRelations::from_record(&record);
        desired.validate(kind)?;

        let _guard = self.locks.acquire(kind, id).await;
        let mut tx = self.store.begin().await?;

        let result: Result<Vec<RelationDiff>, BankError> = async {
            if tx.lock_aggregate(kind, id).await?.is_some() {
                return Err(BankError::conflict(format!("{} {} already exists", kind, id)));
            }
            tx.insert_aggregate(&record).await?;
            apply_relations(&mut *tx, id, &desired, false).await
        }
        .await;

        let diffs = finish(tx, result).await?;
        let outcome = SyncOutcome {
            entity: kind,
            aggregate_id: id,
            diffs,
        };
        info!(inserted = outcome.inserted_count(), "Aggregate added");
        Ok(outcome)
    }

    /// Updates an aggregate's scalar fields and reconciles its relation sets
    ///
    /// Relation types absent from `update.relations` are not read or written.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed desired set, raised before the
    ///   transaction opens
    /// - `NotFound` if the aggregate does not exist; nothing is written
    /// - `Conflict` if a target does not exist or a pair changed underneath
    /// - `Storage` for any other store failure
    ///
    /// Every failure leaves the store as it was before the call.
    #[instrument(skip(self, update), fields(entity = %update.record.kind(), aggregate_id = %update.record.id()))]
    pub async fn update_element(&self, update: AggregateUpdate) -> Result<SyncOutcome, BankError> {
        let AggregateUpdate { record, relations } = update;
        let (kind, id) = (record.kind(), record.id());
        relations.validate(kind)?;

        let _guard = self.locks.acquire(kind, id).await;
        let mut tx = self.store.begin().await?;

        let result: Result<Vec<RelationDiff>, BankError> = async {
            if tx.lock_aggregate(kind, id).await?.is_none() {
                return Err(BankError::not_found(kind.as_str(), id));
            }
            tx.update_aggregate(&record).await?;
            apply_relations(&mut *tx, id, &relations, true).await
        }
        .await;

        let diffs = finish(tx, result).await?;
        let outcome = SyncOutcome {
            entity: kind,
            aggregate_id: id,
            diffs,
        };
        info!(
            inserted = outcome.inserted_count(),
            deleted = outcome.deleted_count(),
            "Aggregate updated"
        );
        Ok(outcome)
    }

    /// Reconciles relation sets of an existing aggregate, leaving its scalar
    /// fields untouched
    ///
    /// Runs under the same per-aggregate lock and owner row lock as
    /// [`update_element`](Self::update_element), so a concurrent scalar
    /// update is never overwritten.
    ///
    /// # Errors
    ///
    /// Same as `update_element`.
    #[instrument(skip(self, relations), fields(entity = %kind, aggregate_id = %id))]
    pub async fn update_relations(
        &self,
        kind: EntityKind,
        id: Uuid,
        relations: DesiredRelations,
    ) -> Result<SyncOutcome, BankError> {
        relations.validate(kind)?;

        let _guard = self.locks.acquire(kind, id).await;
        let mut tx = self.store.begin().await?;

        let result: Result<Vec<RelationDiff>, BankError> = async {
            if tx.lock_aggregate(kind, id).await?.is_none() {
                return Err(BankError::not_found(kind.as_str(), id));
            }
            apply_relations(&mut *tx, id, &relations, true).await
        }
        .await;

        let diffs = finish(tx, result).await?;
        let outcome = SyncOutcome {
            entity: kind,
            aggregate_id: id,
            diffs,
        };
        info!(
            inserted = outcome.inserted_count(),
            deleted = outcome.deleted_count(),
            "Relations updated"
        );
        Ok(outcome)
    }

    /// Reads an aggregate with its current relation sets
    pub async fn get_element(&self, kind: EntityKind, id: Uuid) -> Result<AggregateRecord, BankError> {
        Ok(self.store.get_aggregate(kind, id, None).await?)
    }
}

/// Reconciles and writes every touched relation set
///
/// Deletes go before inserts within one relation type.
async fn apply_relations(
    tx: &mut dyn RelationTransaction,
    owner_id: Uuid,
    desired: &DesiredRelations,
    load_current: bool,
) -> Result<Vec<RelationDiff>, BankError> {
    let mut diffs = Vec::new();
    for kind in desired.kinds() {
        let targets = desired.get(kind).unwrap_or_default();
        let current = if load_current {
            tx.load_relations(kind, owner_id).await?
        } else {
            BTreeSet::new()
        };
        let diff = reconcile(owner_id, kind, &current, targets)?;
        debug!(
            relation = %kind,
            to_insert = diff.to_insert.len(),
            to_delete = diff.to_delete.len(),
            "Relation diff computed"
        );
        for pair in diff.deletes() {
            tx.delete_relation(kind, pair).await?;
        }
        for pair in diff.inserts() {
            tx.insert_relation(kind, pair).await?;
        }
        diffs.push(diff);
    }
    Ok(diffs)
}

/// Commits on success, rolls back on failure
async fn finish<T>(
    tx: Box<dyn RelationTransaction>,
    result: Result<T, BankError>,
) -> Result<T, BankError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                warn!(error = %rollback_error, "Rollback failed");
            }
            debug!(error = %error, "Transaction rolled back");
            Err(error)
        }
    }
}
