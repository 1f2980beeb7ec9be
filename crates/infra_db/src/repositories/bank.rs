//! Bank repository implementation
//!
//! This module provides database access for the four banking aggregates and
//! the association tables linking them. Reads through the pool open one
//! read-only `REPEATABLE READ` transaction, so a list and its relation sets
//! come from the same snapshot. Single-aggregate reads and all writes take a
//! `PgConnection` so they can run inside a caller's transaction.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use core_kernel::{
    ClerkId, ClientId, CreditProgramId, CurrencyId, DepositId, PeriodId, StorekeeperId,
};
use domain_banking::{
    AggregateRecord, Client, CreditProgram, Currency, Deposit, EntityKind, RelationKind,
    RelationPair,
};

use crate::error::DatabaseError;

// ============================================================================
// Row Types
// ============================================================================

/// Database row for a client
#[derive(Debug, Clone, FromRow)]
pub struct ClientRow {
    pub id: Uuid,
    pub surname: String,
    pub name: String,
    pub balance: Decimal,
    pub clerk_id: Uuid,
}

/// Database row for a deposit
#[derive(Debug, Clone, FromRow)]
pub struct DepositRow {
    pub id: Uuid,
    pub interest_rate: Decimal,
    pub cost: Decimal,
    pub period_months: i32,
    pub clerk_id: Uuid,
}

/// Database row for a credit program
#[derive(Debug, Clone, FromRow)]
pub struct CreditProgramRow {
    pub id: Uuid,
    pub name: String,
    pub cost: Decimal,
    pub max_cost: Decimal,
    pub period_id: Uuid,
    pub storekeeper_id: Uuid,
}

/// Database row for a currency
#[derive(Debug, Clone, FromRow)]
pub struct CurrencyRow {
    pub id: Uuid,
    pub name: String,
    pub abbreviation: String,
    pub cost: Decimal,
    pub storekeeper_id: Uuid,
}

/// One association row, normalized to owner and target
#[derive(Debug, Clone, Copy, FromRow)]
pub struct RelationRow {
    pub owner_id: Uuid,
    pub target_id: Uuid,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: ClientId::from_uuid(row.id),
            surname: row.surname,
            name: row.name,
            balance: row.balance,
            clerk_id: ClerkId::from_uuid(row.clerk_id),
            deposits: BTreeSet::new(),
            credit_programs: BTreeSet::new(),
        }
    }
}

impl From<DepositRow> for Deposit {
    fn from(row: DepositRow) -> Self {
        Deposit {
            id: DepositId::from_uuid(row.id),
            interest_rate: row.interest_rate,
            cost: row.cost,
            period_months: row.period_months,
            clerk_id: ClerkId::from_uuid(row.clerk_id),
            currencies: BTreeSet::new(),
        }
    }
}

impl From<CreditProgramRow> for CreditProgram {
    fn from(row: CreditProgramRow) -> Self {
        CreditProgram {
            id: CreditProgramId::from_uuid(row.id),
            name: row.name,
            cost: row.cost,
            max_cost: row.max_cost,
            period_id: PeriodId::from_uuid(row.period_id),
            storekeeper_id: StorekeeperId::from_uuid(row.storekeeper_id),
            currencies: BTreeSet::new(),
        }
    }
}

impl From<CurrencyRow> for Currency {
    fn from(row: CurrencyRow) -> Self {
        Currency {
            id: CurrencyId::from_uuid(row.id),
            name: row.name,
            abbreviation: row.abbreviation,
            cost: row.cost,
            storekeeper_id: StorekeeperId::from_uuid(row.storekeeper_id),
        }
    }
}

// ============================================================================
// Table Mapping
// ============================================================================

/// Where one relation kind is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationTable {
    pub table: &'static str,
    pub owner_column: &'static str,
    pub target_column: &'static str,
}

impl RelationTable {
    pub fn for_kind(kind: RelationKind) -> Self {
        let (table, owner_column, target_column) = match kind {
            RelationKind::DepositClient => ("deposit_clients", "client_id", "deposit_id"),
            RelationKind::ClientCreditProgram => {
                ("client_credit_programs", "client_id", "credit_program_id")
            }
            RelationKind::DepositCurrency => ("deposit_currencies", "deposit_id", "currency_id"),
            RelationKind::CreditProgramCurrency => {
                ("credit_program_currencies", "credit_program_id", "currency_id")
            }
        };
        Self {
            table,
            owner_column,
            target_column,
        }
    }

    fn select_all(&self) -> String {
        format!(
            "SELECT {} AS owner_id, {} AS target_id FROM {}",
            self.owner_column, self.target_column, self.table
        )
    }

    fn select_targets(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = $1",
            self.target_column, self.table, self.owner_column
        )
    }

    fn insert(&self) -> String {
        format!(
            "INSERT INTO {} ({}, {}) VALUES ($1, $2)",
            self.table, self.owner_column, self.target_column
        )
    }

    fn delete(&self) -> String {
        format!(
            "DELETE FROM {} WHERE {} = $1 AND {} = $2",
            self.table, self.owner_column, self.target_column
        )
    }
}

/// Table holding the scalar row of an aggregate
pub fn aggregate_table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Client => "clients",
        EntityKind::Deposit => "deposits",
        EntityKind::CreditProgram => "credit_programs",
        EntityKind::Currency => "currencies",
    }
}

fn select_by_id(kind: EntityKind, lock: bool) -> String {
    let columns = match kind {
        EntityKind::Client => "id, surname, name, balance, clerk_id",
        EntityKind::Deposit => "id, interest_rate, cost, period_months, clerk_id",
        EntityKind::CreditProgram => "id, name, cost, max_cost, period_id, storekeeper_id",
        EntityKind::Currency => "id, name, abbreviation, cost, storekeeper_id",
    };
    let suffix = if lock { " FOR UPDATE" } else { "" };
    format!(
        "SELECT {} FROM {} WHERE id = $1{}",
        columns,
        aggregate_table(kind),
        suffix
    )
}

/// First statement of every multi-query read
const SNAPSHOT_READ: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

// ============================================================================
// Repository
// ============================================================================

/// Repository for clients, deposits, credit programs and currencies
#[derive(Debug, Clone)]
pub struct BankRepository {
    pool: PgPool,
}

impl BankRepository {
    /// Creates a new BankRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All clients with their deposit and credit program sets
    pub async fn list_clients(&self) -> Result<Vec<Client>, DatabaseError> {
        let mut tx = self.snapshot().await?;
        let rows = sqlx::query_as::<_, ClientRow>(
            "SELECT id, surname, name, balance, clerk_id FROM clients ORDER BY surname, name, id",
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut deposits = relation_map(&mut tx, RelationKind::DepositClient).await?;
        let mut programs = relation_map(&mut tx, RelationKind::ClientCreditProgram).await?;
        tx.commit().await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                let mut client = Client::from(row);
                client.deposits = take_targets(&mut deposits, id, DepositId::from_uuid);
                client.credit_programs = take_targets(&mut programs, id, CreditProgramId::from_uuid);
                client
            })
            .collect())
    }

    /// All deposits with their currency sets
    pub async fn list_deposits(&self) -> Result<Vec<Deposit>, DatabaseError> {
        let mut tx = self.snapshot().await?;
        let rows = sqlx::query_as::<_, DepositRow>(
            "SELECT id, interest_rate, cost, period_months, clerk_id FROM deposits ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut currencies = relation_map(&mut tx, RelationKind::DepositCurrency).await?;
        tx.commit().await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                let mut deposit = Deposit::from(row);
                deposit.currencies = take_targets(&mut currencies, id, CurrencyId::from_uuid);
                deposit
            })
            .collect())
    }

    /// All credit programs with their currency sets
    pub async fn list_credit_programs(&self) -> Result<Vec<CreditProgram>, DatabaseError> {
        let mut tx = self.snapshot().await?;
        let rows = sqlx::query_as::<_, CreditProgramRow>(
            "SELECT id, name, cost, max_cost, period_id, storekeeper_id FROM credit_programs ORDER BY name, id",
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut currencies = relation_map(&mut tx, RelationKind::CreditProgramCurrency).await?;
        tx.commit().await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                let mut program = CreditProgram::from(row);
                program.currencies = take_targets(&mut currencies, id, CurrencyId::from_uuid);
                program
            })
            .collect())
    }

    pub async fn list_currencies(&self) -> Result<Vec<Currency>, DatabaseError> {
        let rows = sqlx::query_as::<_, CurrencyRow>(
            "SELECT id, name, abbreviation, cost, storekeeper_id FROM currencies ORDER BY abbreviation, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Currency::from).collect())
    }

    /// Retrieves one aggregate outside of any transaction
    pub async fn get_aggregate(
        &self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<AggregateRecord, DatabaseError> {
        let mut tx = self.snapshot().await?;
        let record = Self::find_aggregate(&mut tx, kind, id, false).await?;
        tx.commit().await?;
        record.ok_or_else(|| DatabaseError::not_found(kind.as_str(), id))
    }

    /// Opens a read-only transaction pinned to one snapshot
    async fn snapshot(&self) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(SNAPSHOT_READ).execute(&mut *tx).await?;
        Ok(tx)
    }

    // ------------------------------------------------------------------------
    // Connection-level operations, usable inside a transaction
    // ------------------------------------------------------------------------

    /// Reads one aggregate with every relation set it owns
    ///
    /// With `lock` set the scalar row is read `FOR UPDATE`, so a concurrent
    /// writer on the same aggregate waits until this transaction ends.
    pub async fn find_aggregate(
        conn: &mut PgConnection,
        kind: EntityKind,
        id: Uuid,
        lock: bool,
    ) -> Result<Option<AggregateRecord>, DatabaseError> {
        let sql = select_by_id(kind, lock);
        let record = match kind {
            EntityKind::Client => sqlx::query_as::<_, ClientRow>(&sql)
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .map(|row| AggregateRecord::Client(row.into())),
            EntityKind::Deposit => sqlx::query_as::<_, DepositRow>(&sql)
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .map(|row| AggregateRecord::Deposit(row.into())),
            EntityKind::CreditProgram => sqlx::query_as::<_, CreditProgramRow>(&sql)
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .map(|row| AggregateRecord::CreditProgram(row.into())),
            EntityKind::Currency => sqlx::query_as::<_, CurrencyRow>(&sql)
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .map(|row| AggregateRecord::Currency(row.into())),
        };

        let Some(mut record) = record else {
            return Ok(None);
        };

        for relation in kind.owned_relations() {
            let targets = Self::load_targets(&mut *conn, *relation, id).await?;
            record.set_relation_targets(*relation, &targets);
        }

        Ok(Some(record))
    }

    /// Inserts the scalar row of a new aggregate
    pub async fn insert_aggregate(
        conn: &mut PgConnection,
        record: &AggregateRecord,
    ) -> Result<(), DatabaseError> {
        let query = match record {
            AggregateRecord::Client(c) => sqlx::query(
                "INSERT INTO clients (id, surname, name, balance, clerk_id) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(*c.id.as_uuid())
            .bind(&c.surname)
            .bind(&c.name)
            .bind(c.balance)
            .bind(*c.clerk_id.as_uuid()),
            AggregateRecord::Deposit(d) => sqlx::query(
                "INSERT INTO deposits (id, interest_rate, cost, period_months, clerk_id) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(*d.id.as_uuid())
            .bind(d.interest_rate)
            .bind(d.cost)
            .bind(d.period_months)
            .bind(*d.clerk_id.as_uuid()),
            AggregateRecord::CreditProgram(p) => sqlx::query(
                "INSERT INTO credit_programs (id, name, cost, max_cost, period_id, storekeeper_id) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(*p.id.as_uuid())
            .bind(&p.name)
            .bind(p.cost)
            .bind(p.max_cost)
            .bind(*p.period_id.as_uuid())
            .bind(*p.storekeeper_id.as_uuid()),
            AggregateRecord::Currency(c) => sqlx::query(
                "INSERT INTO currencies (id, name, abbreviation, cost, storekeeper_id) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(*c.id.as_uuid())
            .bind(&c.name)
            .bind(&c.abbreviation)
            .bind(c.cost)
            .bind(*c.storekeeper_id.as_uuid()),
        };

        query.execute(&mut *conn).await?;
        Ok(())
    }

    /// Overwrites the scalar row of an existing aggregate
    ///
    /// # Errors
    ///
    /// `DatabaseError::NotFound` when no row has the record's id
    pub async fn update_aggregate(
        conn: &mut PgConnection,
        record: &AggregateRecord,
    ) -> Result<(), DatabaseError> {
        let query = match record {
            AggregateRecord::Client(c) => sqlx::query(
                "UPDATE clients SET surname = $2, name = $3, balance = $4, clerk_id = $5 WHERE id = $1",
            )
            .bind(*c.id.as_uuid())
            .bind(&c.surname)
            .bind(&c.name)
            .bind(c.balance)
            .bind(*c.clerk_id.as_uuid()),
            AggregateRecord::Deposit(d) => sqlx::query(
                "UPDATE deposits SET interest_rate = $2, cost = $3, period_months = $4, clerk_id = $5 WHERE id = $1",
            )
            .bind(*d.id.as_uuid())
            .bind(d.interest_rate)
            .bind(d.cost)
            .bind(d.period_months)
            .bind(*d.clerk_id.as_uuid()),
            AggregateRecord::CreditProgram(p) => sqlx::query(
                "UPDATE credit_programs SET name = $2, cost = $3, max_cost = $4, period_id = $5, storekeeper_id = $6 WHERE id = $1",
            )
            .bind(*p.id.as_uuid())
            .bind(&p.name)
            .bind(p.cost)
            .bind(p.max_cost)
            .bind(*p.period_id.as_uuid())
            .bind(*p.storekeeper_id.as_uuid()),
            AggregateRecord::Currency(c) => sqlx::query(
                "UPDATE currencies SET name = $2, abbreviation = $3, cost = $4, storekeeper_id = $5 WHERE id = $1",
            )
            .bind(*c.id.as_uuid())
            .bind(&c.name)
            .bind(&c.abbreviation)
            .bind(c.cost)
            .bind(*c.storekeeper_id.as_uuid()),
        };

        let result = query.execute(&mut *conn).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(record.kind().as_str(), record.id()));
        }
        Ok(())
    }

    /// Current targets of one relation set
    pub async fn load_targets(
        conn: &mut PgConnection,
        kind: RelationKind,
        owner_id: Uuid,
    ) -> Result<BTreeSet<Uuid>, DatabaseError> {
        let sql = RelationTable::for_kind(kind).select_targets();
        let targets = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(owner_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(targets.into_iter().collect())
    }

    /// Inserts one association row
    ///
    /// A missing target surfaces as `ForeignKeyViolation`, an existing pair
    /// as `DuplicateEntry`.
    pub async fn insert_relation(
        conn: &mut PgConnection,
        kind: RelationKind,
        pair: RelationPair,
    ) -> Result<(), DatabaseError> {
        let sql = RelationTable::for_kind(kind).insert();
        sqlx::query(&sql)
            .bind(pair.owner_id)
            .bind(pair.target_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Deletes one association row
    ///
    /// # Errors
    ///
    /// `DatabaseError::NotFound` when the pair is not present
    pub async fn delete_relation(
        conn: &mut PgConnection,
        kind: RelationKind,
        pair: RelationPair,
    ) -> Result<(), DatabaseError> {
        let sql = RelationTable::for_kind(kind).delete();
        let result = sqlx::query(&sql)
            .bind(pair.owner_id)
            .bind(pair.target_id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(
                kind.as_str(),
                format!("{} -> {}", pair.owner_id, pair.target_id),
            ));
        }
        Ok(())
    }
}

/// Every pair of one association table, grouped by owner
async fn relation_map(
    conn: &mut PgConnection,
    kind: RelationKind,
) -> Result<HashMap<Uuid, BTreeSet<Uuid>>, DatabaseError> {
    let sql = RelationTable::for_kind(kind).select_all();
    let rows = sqlx::query_as::<_, RelationRow>(&sql)
        .fetch_all(&mut *conn)
        .await?;

    let mut map: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
    for row in rows {
        map.entry(row.owner_id).or_default().insert(row.target_id);
    }
    Ok(map)
}

fn take_targets<T: Ord>(
    map: &mut HashMap<Uuid, BTreeSet<Uuid>>,
    owner_id: Uuid,
    wrap: fn(Uuid) -> T,
) -> BTreeSet<T> {
    map.remove(&owner_id)
        .map(|targets| targets.into_iter().map(wrap).collect())
        .unwrap_or_default()
}
