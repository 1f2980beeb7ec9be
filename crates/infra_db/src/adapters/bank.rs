//! PostgreSQL Bank Adapter
//!
//! This module provides the database adapter for the banking store ports,
//! implementing `EntityListPort` and `AggregateStorePort` on top of
//! `BankRepository`.
//!
//! # Transactions
//!
//! [`AggregateStorePort::begin`] opens a `sqlx::Transaction` and hands it out
//! as a [`PgRelationTransaction`]. Dropping that handle without committing
//! rolls the transaction back, which is sqlx's own drop behaviour.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBankAdapter;
//! use domain_banking::{AggregateStorePort, RelationshipSynchronizer};
//! use std::sync::Arc;
//!
//! let store: Arc<dyn AggregateStorePort> = Arc::new(PostgresBankAdapter::new(pool));
//! let synchronizer = RelationshipSynchronizer::new(store);
//! ```

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, OperationMetadata, PortError,
};
use domain_banking::{
    AggregateRecord, AggregateStorePort, Client, CreditProgram, Currency, Deposit, EntityKind,
    EntityListPort, RelationKind, RelationPair, RelationTransaction,
};

use crate::error::DatabaseError;
use crate::repositories::BankRepository;

const ADAPTER_ID: &str = "postgres-bank-adapter";

/// PostgreSQL-backed implementation of the banking store ports
///
/// # Error Handling
///
/// Database errors are translated to `PortError` variants:
/// - `DatabaseError::NotFound` -> `PortError::NotFound`
/// - unique and foreign-key violations -> `PortError::Conflict`
/// - Other errors -> `PortError::Internal`
///
/// Inside a transaction, deleting a pair that is already gone is reported
/// as `Conflict`, matching a lost race with another writer.
#[derive(Debug, Clone)]
pub struct PostgresBankAdapter {
    repository: BankRepository,
    pool: PgPool,
}

impl PostgresBankAdapter {
    /// Creates a new PostgreSQL bank adapter
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BankRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &BankRepository {
        &self.repository
    }
}

impl DomainPort for PostgresBankAdapter {}

#[async_trait]
impl HealthCheckable for PostgresBankAdapter {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };

        HealthCheckResult {
            adapter_id: ADAPTER_ID.to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl EntityListPort for PostgresBankAdapter {
    #[instrument(skip(self, metadata))]
    async fn list_clients(
        &self,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Client>, PortError> {
        let clients = self.repository.list_clients().await?;
        debug!(count = clients.len(), correlation_id = ?correlation(&metadata), "Loaded clients");
        Ok(clients)
    }

    #[instrument(skip(self, metadata))]
    async fn list_deposits(
        &self,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Deposit>, PortError> {
        let deposits = self.repository.list_deposits().await?;
        debug!(count = deposits.len(), correlation_id = ?correlation(&metadata), "Loaded deposits");
        Ok(deposits)
    }

    #[instrument(skip(self, metadata))]
    async fn list_credit_programs(
        &self,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<CreditProgram>, PortError> {
        let programs = self.repository.list_credit_programs().await?;
        debug!(count = programs.len(), correlation_id = ?correlation(&metadata), "Loaded credit programs");
        Ok(programs)
    }

    #[instrument(skip(self, metadata))]
    async fn list_currencies(
        &self,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Currency>, PortError> {
        let currencies = self.repository.list_currencies().await?;
        debug!(count = currencies.len(), correlation_id = ?correlation(&metadata), "Loaded currencies");
        Ok(currencies)
    }
}

#[async_trait]
impl AggregateStorePort for PostgresBankAdapter {
    #[instrument(skip(self, metadata), fields(kind = %kind, aggregate_id = %id))]
    async fn get_aggregate(
        &self,
        kind: EntityKind,
        id: Uuid,
        metadata: Option<OperationMetadata>,
    ) -> Result<AggregateRecord, PortError> {
        debug!(correlation_id = ?correlation(&metadata), "Loading aggregate");
        Ok(self.repository.get_aggregate(kind, id).await?)
    }

    async fn begin(&self) -> Result<Box<dyn RelationTransaction>, PortError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        Ok(Box::new(PgRelationTransaction { tx }))
    }
}

fn correlation(metadata: &Option<OperationMetadata>) -> Option<&str> {
    metadata.as_ref().and_then(|m| m.correlation_id.as_deref())
}

/// An open PostgreSQL write transaction
pub struct PgRelationTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RelationTransaction for PgRelationTransaction {
    async fn lock_aggregate(
        &mut self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Option<AggregateRecord>, PortError> {
        Ok(BankRepository::find_aggregate(&mut self.tx, kind, id, true).await?)
    }

    async fn insert_aggregate(&mut self, record: &AggregateRecord) -> Result<(), PortError> {
        Ok(BankRepository::insert_aggregate(&mut self.tx, record).await?)
    }

    async fn update_aggregate(&mut self, record: &AggregateRecord) -> Result<(), PortError> {
        Ok(BankRepository::update_aggregate(&mut self.tx, record).await?)
    }

    async fn load_relations(
        &mut self,
        kind: RelationKind,
        owner_id: Uuid,
    ) -> Result<BTreeSet<Uuid>, PortError> {
        Ok(BankRepository::load_targets(&mut self.tx, kind, owner_id).await?)
    }

    async fn insert_relation(&mut self, kind: RelationKind, pair: RelationPair) -> Result<(), PortError> {
        Ok(BankRepository::insert_relation(&mut self.tx, kind, pair).await?)
    }

    async fn delete_relation(&mut self, kind: RelationKind, pair: RelationPair) -> Result<(), PortError> {
        BankRepository::delete_relation(&mut self.tx, kind, pair)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => PortError::conflict(e.to_string()),
                other => other.into(),
            })
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let PgRelationTransaction { tx } = *self;
        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()).into())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PortError> {
        let PgRelationTransaction { tx } = *self;
        tx.rollback()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()).into())
    }
}
