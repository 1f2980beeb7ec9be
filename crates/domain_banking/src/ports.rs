//! Banking Domain Ports
//!
//! This module defines the store interfaces the domain needs, so the
//! synchronizer and the report pipeline never see a concrete database.
//!
//! # Architecture
//!
//! - [`EntityListPort`]: read-only bulk accessors used by reports
//! - [`AggregateStorePort`]: single-aggregate reads and write transactions
//! - [`RelationTransaction`]: one open write transaction; dropped without
//!   `commit` means rolled back
//!
//! Adapters:
//!
//! - **PostgreSQL**: `infra_db::adapters::PostgresBankAdapter`
//! - **Mock**: [`mock::MockBankStore`], in memory, for tests and demos
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_banking::ports::AggregateStorePort;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn AggregateStorePort> = Arc::new(PostgresBankAdapter::new(pool));
//! let synchronizer = RelationshipSynchronizer::new(store.clone());
//! let reports = ReportService::new(store);
//! ```

use std::collections::BTreeSet;

use async_trait::async_trait;
use uuid::Uuid;

use core_kernel::{DomainPort, OperationMetadata, PortError};

use crate::entities::{AggregateRecord, Client, CreditProgram, Currency, Deposit, EntityKind};
use crate::relations::{RelationKind, RelationPair};

/// Read-only bulk accessors for each aggregate collection
///
/// Every list is a point-in-time snapshot. Calls are independent and may run
/// concurrently.
#[async_trait]
pub trait EntityListPort: DomainPort {
    async fn list_clients(
        &self,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Client>, PortError>;

    async fn list_deposits(
        &self,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Deposit>, PortError>;

    async fn list_credit_programs(
        &self,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<CreditProgram>, PortError>;

    async fn list_currencies(
        &self,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Currency>, PortError>;
}

/// Aggregate access with transactional writes
#[async_trait]
pub trait AggregateStorePort: EntityListPort {
    /// Retrieves one aggregate with its relation sets
    ///
    /// # Returns
    ///
    /// The aggregate if found, or `PortError::NotFound`
    async fn get_aggregate(
        &self,
        kind: EntityKind,
        id: Uuid,
        metadata: Option<OperationMetadata>,
    ) -> Result<AggregateRecord, PortError>;

    /// Opens a write transaction
    async fn begin(&self) -> Result<Box<dyn RelationTransaction>, PortError>;
}

/// One open write transaction
///
/// Nothing written through this handle is visible to other readers until
/// [`commit`](RelationTransaction::commit) succeeds.
#[async_trait]
pub trait RelationTransaction: Send {
    /// Reads an aggregate and holds a write lock on it until the transaction ends
    ///
    /// Returns `Ok(None)` when the aggregate does not exist.
    async fn lock_aggregate(
        &mut self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Option<AggregateRecord>, PortError>;

    /// Inserts the scalar row of a new aggregate; relation sets are ignored
    async fn insert_aggregate(&mut self, record: &AggregateRecord) -> Result<(), PortError>;

    /// Overwrites the scalar fields of an existing aggregate; relation sets are ignored
    async fn update_aggregate(&mut self, record: &AggregateRecord) -> Result<(), PortError>;

    /// Current targets of one relation set
    async fn load_relations(
        &mut self,
        kind: RelationKind,
        owner_id: Uuid,
    ) -> Result<BTreeSet<Uuid>, PortError>;

    /// Inserts one relation row
    ///
    /// # Errors
    ///
    /// `PortError::Conflict` when the target does not exist or the pair is
    /// already present
    async fn insert_relation(&mut self, kind: RelationKind, pair: RelationPair) -> Result<(), PortError>;

    /// Deletes one relation row
    ///
    /// # Errors
    ///
    /// `PortError::Conflict` when the pair is no longer present
    async fn delete_relation(&mut self, kind: RelationKind, pair: RelationPair) -> Result<(), PortError>;

    async fn commit(self: Box<Self>) -> Result<(), PortError>;

    async fn rollback(self: Box<Self>) -> Result<(), PortError>;
}

/// Mock implementation of the store ports for testing
///
/// Holds every aggregate in memory. A write transaction works on a private
/// copy of the state and swaps it in on commit. The state lock is held for
/// the whole transaction, so writers are serialized.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::Utc;
    use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable};
    use tokio::sync::{Mutex, OwnedMutexGuard};

    /// Everything the mock store holds
    #[derive(Debug, Clone, Default)]
    pub struct BankState {
        pub clients: Vec<Client>,
        pub deposits: Vec<Deposit>,
        pub credit_programs: Vec<CreditProgram>,
        pub currencies: Vec<Currency>,
    }

    impl BankState {
        fn find(&self, kind: EntityKind, id: Uuid) -> Option<AggregateRecord> {
            match kind {
                EntityKind::Client => self
                    .clients
                    .iter()
                    .find(|c| *c.id.as_uuid() == id)
                    .cloned()
                    .map(AggregateRecord::Client),
                EntityKind::Deposit => self
                    .deposits
                    .iter()
                    .find(|d| *d.id.as_uuid() == id)
                    .cloned()
                    .map(AggregateRecord::Deposit),
                EntityKind::CreditProgram => self
                    .credit_programs
                    .iter()
                    .find(|p| *p.id.as_uuid() == id)
                    .cloned()
                    .map(AggregateRecord::CreditProgram),
                EntityKind::Currency => self
                    .currencies
                    .iter()
                    .find(|c| *c.id.as_uuid() == id)
                    .cloned()
                    .map(AggregateRecord::Currency),
            }
        }

        fn contains(&self, kind: EntityKind, id: Uuid) -> bool {
            self.find(kind, id).is_some()
        }

        fn insert(&mut self, record: AggregateRecord) {
            match record {
                AggregateRecord::Client(c) => self.clients.push(c),
                AggregateRecord::Deposit(d) => self.deposits.push(d),
                AggregateRecord::CreditProgram(p) => self.credit_programs.push(p),
                AggregateRecord::Currency(c) => self.currencies.push(c),
            }
        }

        /// Replaces scalar fields, keeping the stored relation sets
        fn overwrite_scalars(&mut self, record: &AggregateRecord) -> bool {
            match record {
                AggregateRecord::Client(new) => {
                    match self.clients.iter_mut().find(|c| c.id == new.id) {
                        Some(c) => {
                            c.surname = new.surname.clone();
                            c.name = new.name.clone();
                            c.balance = new.balance;
                            c.clerk_id = new.clerk_id;
                            true
                        }
                        None => false,
                    }
                }
                AggregateRecord::Deposit(new) => {
                    match self.deposits.iter_mut().find(|d| d.id == new.id) {
                        Some(d) => {
                            d.interest_rate = new.interest_rate;
                            d.cost = new.cost;
                            d.period_months = new.period_months;
                            d.clerk_id = new.clerk_id;
                            true
                        }
                        None => false,
                    }
                }
                AggregateRecord::CreditProgram(new) => {
                    match self.credit_programs.iter_mut().find(|p| p.id == new.id) {
                        Some(p) => {
                            p.name = new.name.clone();
                            p.cost = new.cost;
                            p.max_cost = new.max_cost;
                            p.period_id = new.period_id;
                            p.storekeeper_id = new.storekeeper_id;
                            true
                        }
                        None => false,
                    }
                }
                AggregateRecord::Currency(new) => {
                    match self.currencies.iter_mut().find(|c| c.id == new.id) {
                        Some(c) => {
                            c.name = new.name.clone();
                            c.abbreviation = new.abbreviation.clone();
                            c.cost = new.cost;
                            c.storekeeper_id = new.storekeeper_id;
                            true
                        }
                        None => false,
                    }
                }
            }
        }

        fn relation_set(&self, kind: RelationKind, owner_id: Uuid) -> Option<BTreeSet<Uuid>> {
            self.find(kind.owner(), owner_id)
                .and_then(|record| record.relation_targets(kind))
        }

        fn write_relation_set(&mut self, kind: RelationKind, owner_id: Uuid, targets: &BTreeSet<Uuid>) {
            if let Some(mut record) = self.find(kind.owner(), owner_id) {
                record.set_relation_targets(kind, targets);
                match record {
                    AggregateRecord::Client(c) => {
                        if let Some(slot) = self.clients.iter_mut().find(|x| x.id == c.id) {
                            *slot = c;
                        }
                    }
                    AggregateRecord::Deposit(d) => {
                        if let Some(slot) = self.deposits.iter_mut().find(|x| x.id == d.id) {
                            *slot = d;
                        }
                    }
                    AggregateRecord::CreditProgram(p) => {
                        if let Some(slot) = self.credit_programs.iter_mut().find(|x| x.id == p.id) {
                            *slot = p;
                        }
                    }
                    AggregateRecord::Currency(_) => {}
                }
            }
        }
    }

    /// A statement issued against the mock store
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum StoreOperation {
        InsertAggregate { kind: EntityKind, id: Uuid },
        UpdateAggregate { kind: EntityKind, id: Uuid },
        InsertRelation { kind: RelationKind, pair: RelationPair },
        DeleteRelation { kind: RelationKind, pair: RelationPair },
        Commit,
        Rollback,
    }

    impl StoreOperation {
        /// True for relation inserts and deletes
        pub fn is_relation_write(&self) -> bool {
            matches!(
                self,
                StoreOperation::InsertRelation { .. } | StoreOperation::DeleteRelation { .. }
            )
        }
    }

    #[derive(Debug, Default)]
    struct FetchCounters {
        clients: AtomicUsize,
        deposits: AtomicUsize,
        credit_programs: AtomicUsize,
        currencies: AtomicUsize,
    }

    /// In-memory mock implementation of the banking store ports
    #[derive(Debug, Clone, Default)]
    pub struct MockBankStore {
        state: Arc<Mutex<BankState>>,
        operations: Arc<Mutex<Vec<StoreOperation>>>,
        fetches: Arc<FetchCounters>,
        fail_commit: Arc<AtomicBool>,
    }

    impl MockBankStore {
        /// Creates an empty mock store
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates the store
        pub fn with_state(state: BankState) -> Self {
            Self {
                state: Arc::new(Mutex::new(state)),
                ..Self::default()
            }
        }

        /// Copy of the committed state
        pub async fn snapshot(&self) -> BankState {
            self.state.lock().await.clone()
        }

        /// Statements issued so far, including rolled-back ones
        pub async fn operations(&self) -> Vec<StoreOperation> {
            self.operations.lock().await.clone()
        }

        pub async fn clear_operations(&self) {
            self.operations.lock().await.clear();
        }

        /// Number of bulk list calls made for one collection
        pub fn fetch_count(&self, kind: EntityKind) -> usize {
            let counter = match kind {
                EntityKind::Client => &self.fetches.clients,
                EntityKind::Deposit => &self.fetches.deposits,
                EntityKind::CreditProgram => &self.fetches.credit_programs,
                EntityKind::Currency => &self.fetches.currencies,
            };
            counter.load(Ordering::SeqCst)
        }

        /// Number of bulk list calls across all collections
        pub fn total_fetches(&self) -> usize {
            [
                EntityKind::Client,
                EntityKind::Deposit,
                EntityKind::CreditProgram,
                EntityKind::Currency,
            ]
            .into_iter()
            .map(|kind| self.fetch_count(kind))
            .sum()
        }

        /// Makes every following commit fail with a connection error
        pub fn fail_commits(&self, fail: bool) {
            self.fail_commit.store(fail, Ordering::SeqCst);
        }
    }

    impl DomainPort for MockBankStore {}

    #[async_trait]
    impl HealthCheckable for MockBankStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-bank-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl EntityListPort for MockBankStore {
        async fn list_clients(
            &self,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Client>, PortError> {
            self.fetches.clients.fetch_add(1, Ordering::SeqCst);
            Ok(self.state.lock().await.clients.clone())
        }

        async fn list_deposits(
            &self,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Deposit>, PortError> {
            self.fetches.deposits.fetch_add(1, Ordering::SeqCst);
            Ok(self.state.lock().await.deposits.clone())
        }

        async fn list_credit_programs(
            &self,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<CreditProgram>, PortError> {
            self.fetches.credit_programs.fetch_add(1, Ordering::SeqCst);
            Ok(self.state.lock().await.credit_programs.clone())
        }

        async fn list_currencies(
            &self,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Currency>, PortError> {
            self.fetches.currencies.fetch_add(1, Ordering::SeqCst);
            Ok(self.state.lock().await.currencies.clone())
        }
    }

    #[async_trait]
    impl AggregateStorePort for MockBankStore {
        async fn get_aggregate(
            &self,
            kind: EntityKind,
            id: Uuid,
            _metadata: Option<OperationMetadata>,
        ) -> Result<AggregateRecord, PortError> {
            self.state
                .lock()
                .await
                .find(kind, id)
                .ok_or_else(|| PortError::not_found(kind.as_str(), id))
        }

        async fn begin(&self) -> Result<Box<dyn RelationTransaction>, PortError> {
            let guard = self.state.clone().lock_owned().await;
            let working = guard.clone();
            Ok(Box::new(MockTransaction {
                guard,
                working,
                operations: self.operations.clone(),
                fail_commit: self.fail_commit.clone(),
            }))
        }
    }

    /// Write transaction over a private copy of the state
    pub struct MockTransaction {
        guard: OwnedMutexGuard<BankState>,
        working: BankState,
        operations: Arc<Mutex<Vec<StoreOperation>>>,
        fail_commit: Arc<AtomicBool>,
    }

    impl MockTransaction {
        async fn record(&self, operation: StoreOperation) {
            self.operations.lock().await.push(operation);
        }
    }

    #[async_trait]
    impl RelationTransaction for MockTransaction {
        async fn lock_aggregate(
            &mut self,
            kind: EntityKind,
            id: Uuid,
        ) -> Result<Option<AggregateRecord>, PortError> {
            Ok(self.working.find(kind, id))
        }

        async fn insert_aggregate(&mut self, record: &AggregateRecord) -> Result<(), PortError> {
            let (kind, id) = (record.kind(), record.id());
            self.record(StoreOperation::InsertAggregate { kind, id }).await;
            if self.working.contains(kind, id) {
                return Err(PortError::conflict(format!("{} {} already exists", kind, id)));
            }
            let mut scalar_only = record.clone();
            for relation in kind.owned_relations() {
                scalar_only.set_relation_targets(*relation, &BTreeSet::new());
            }
            self.working.insert(scalar_only);
            Ok(())
        }

        async fn update_aggregate(&mut self, record: &AggregateRecord) -> Result<(), PortError> {
            let (kind, id) = (record.kind(), record.id());
            self.record(StoreOperation::UpdateAggregate { kind, id }).await;
            if !self.working.overwrite_scalars(record) {
                return Err(PortError::not_found(kind.as_str(), id));
            }
            Ok(())
        }

        async fn load_relations(
            &mut self,
            kind: RelationKind,
            owner_id: Uuid,
        ) -> Result<BTreeSet<Uuid>, PortError> {
            self.working
                .relation_set(kind, owner_id)
                .ok_or_else(|| PortError::not_found(kind.owner().as_str(), owner_id))
        }

        async fn insert_relation(&mut self, kind: RelationKind, pair: RelationPair) -> Result<(), PortError> {
            self.record(StoreOperation::InsertRelation { kind, pair }).await;
            if !self.working.contains(kind.target(), pair.target_id) {
                return Err(PortError::conflict(format!(
                    "{} references missing {} {}",
                    kind,
                    kind.target(),
                    pair.target_id
                )));
            }
            let mut set = self
                .working
                .relation_set(kind, pair.owner_id)
                .ok_or_else(|| {
                    PortError::conflict(format!(
                        "{} references missing {} {}",
                        kind,
                        kind.owner(),
                        pair.owner_id
                    ))
                })?;
            if !set.insert(pair.target_id) {
                return Err(PortError::conflict(format!(
                    "duplicate {} pair ({}, {})",
                    kind, pair.owner_id, pair.target_id
                )));
            }
            self.working.write_relation_set(kind, pair.owner_id, &set);
            Ok(())
        }

        async fn delete_relation(&mut self, kind: RelationKind, pair: RelationPair) -> Result<(), PortError> {
            self.record(StoreOperation::DeleteRelation { kind, pair }).await;
            let mut set = self
                .working
                .relation_set(kind, pair.owner_id)
                .unwrap_or_default();
            if !set.remove(&pair.target_id) {
                return Err(PortError::conflict(format!(
                    "{} pair ({}, {}) is already gone",
                    kind, pair.owner_id, pair.target_id
                )));
            }
            self.working.write_relation_set(kind, pair.owner_id, &set);
            Ok(())
        }

        async fn commit(self: Box<Self>) -> Result<(), PortError> {
            let MockTransaction {
                mut guard,
                working,
                operations,
                fail_commit,
            } = *self;
            if fail_commit.load(Ordering::SeqCst) {
                operations.lock().await.push(StoreOperation::Rollback);
                return Err(PortError::connection("mock commit failure"));
            }
            *guard = working;
            operations.lock().await.push(StoreOperation::Commit);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<(), PortError> {
            self.record(StoreOperation::Rollback).await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{BankState, MockBankStore, StoreOperation};
    use super::*;
    use core_kernel::{ClerkId, StorekeeperId};
    use rust_decimal::Decimal;

    fn seeded() -> (MockBankStore, Client, Deposit) {
        let deposit = Deposit::new(Decimal::new(75, 1), Decimal::new(100_000, 2), 12, ClerkId::new());
        let client = Client::new("Petrova", "Anna", Decimal::new(5_000, 0), ClerkId::new());
        let store = MockBankStore::with_state(BankState {
            clients: vec![client.clone()],
            deposits: vec![deposit.clone()],
            ..Default::default()
        });
        (store, client, deposit)
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded() {
        let (store, client, deposit) = seeded();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_relation(
                RelationKind::DepositClient,
                RelationPair::new(client.id, deposit.id),
            )
            .await
            .unwrap();
        }

        let record = store
            .get_aggregate(EntityKind::Client, *client.id.as_uuid(), None)
            .await
            .unwrap();
        assert_eq!(record.relation_targets(RelationKind::DepositClient), Some(BTreeSet::new()));
    }

    #[tokio::test]
    async fn test_insert_relation_to_missing_target_conflicts() {
        let (store, client, _) = seeded();
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .insert_relation(
                RelationKind::DepositClient,
                RelationPair::new(client.id, Uuid::from_u128(42)),
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_commit_publishes_and_logs() {
        let (store, client, deposit) = seeded();
        let mut tx = store.begin().await.unwrap();
        tx.insert_relation(
            RelationKind::DepositClient,
            RelationPair::new(client.id, deposit.id),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let state = store.snapshot().await;
        assert!(state.clients[0].deposits.contains(&deposit.id));
        assert_eq!(store.operations().await.last(), Some(&StoreOperation::Commit));
    }

    #[tokio::test]
    async fn test_list_calls_are_counted() {
        let store = MockBankStore::with_state(BankState {
            currencies: vec![Currency::new("Euro", "EUR", Decimal::new(9_812, 2), StorekeeperId::new())],
            ..Default::default()
        });
        store.list_currencies(None).await.unwrap();
        store.list_currencies(None).await.unwrap();

        assert_eq!(store.fetch_count(EntityKind::Currency), 2);
        assert_eq!(store.total_fetches(), 2);
    }
}
