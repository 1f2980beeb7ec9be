//! Aggregate entities
//!
//! Each aggregate carries its relation sets as plain id collections. The
//! targets are resolved through id-keyed maps when needed, so no entity holds
//! a reference to another.

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{
    ClerkId, ClientId, CreditProgramId, CurrencyId, DepositId, PeriodId, StorekeeperId,
};

use crate::relations::RelationKind;

/// The kinds of aggregate the store knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Deposit,
    CreditProgram,
    Currency,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Client => "Client",
            EntityKind::Deposit => "Deposit",
            EntityKind::CreditProgram => "CreditProgram",
            EntityKind::Currency => "Currency",
        }
    }

    /// Relation types whose sets this aggregate owns
    pub fn owned_relations(&self) -> &'static [RelationKind] {
        match self {
            EntityKind::Client => &[RelationKind::DepositClient, RelationKind::ClientCreditProgram],
            EntityKind::Deposit => &[RelationKind::DepositCurrency],
            EntityKind::CreditProgram => &[RelationKind::CreditProgramCurrency],
            EntityKind::Currency => &[],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bank client served by a clerk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub surname: String,
    pub name: String,
    pub balance: Decimal,
    pub clerk_id: ClerkId,
    /// DepositClient relation set
    pub deposits: BTreeSet<DepositId>,
    /// ClientCreditProgram relation set
    pub credit_programs: BTreeSet<CreditProgramId>,
}

impl Client {
    pub fn new(
        surname: impl Into<String>,
        name: impl Into<String>,
        balance: Decimal,
        clerk_id: ClerkId,
    ) -> Self {
        Self {
            id: ClientId::new_v7(),
            surname: surname.into(),
            name: name.into(),
            balance,
            clerk_id,
            deposits: BTreeSet::new(),
            credit_programs: BTreeSet::new(),
        }
    }

    pub fn with_deposit(mut self, deposit_id: DepositId) -> Self {
        self.deposits.insert(deposit_id);
        self
    }

    pub fn with_credit_program(mut self, credit_program_id: CreditProgramId) -> Self {
        self.credit_programs.insert(credit_program_id);
        self
    }

    pub fn has_credit_program(&self, credit_program_id: CreditProgramId) -> bool {
        self.credit_programs.contains(&credit_program_id)
    }
}

/// A deposit product opened by a clerk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: DepositId,
    /// Annual interest rate, in percent
    pub interest_rate: Decimal,
    pub cost: Decimal,
    /// Term in months
    pub period_months: i32,
    pub clerk_id: ClerkId,
    /// DepositCurrency relation set
    pub currencies: BTreeSet<CurrencyId>,
}

impl Deposit {
    pub fn new(interest_rate: Decimal, cost: Decimal, period_months: i32, clerk_id: ClerkId) -> Self {
        Self {
            id: DepositId::new_v7(),
            interest_rate,
            cost,
            period_months,
            clerk_id,
            currencies: BTreeSet::new(),
        }
    }

    pub fn with_currency(mut self, currency_id: CurrencyId) -> Self {
        self.currencies.insert(currency_id);
        self
    }

    pub fn has_currency(&self, currency_id: CurrencyId) -> bool {
        self.currencies.contains(&currency_id)
    }
}

/// A credit program maintained by a storekeeper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditProgram {
    pub id: CreditProgramId,
    pub name: String,
    pub cost: Decimal,
    pub max_cost: Decimal,
    pub period_id: PeriodId,
    pub storekeeper_id: StorekeeperId,
    /// CreditProgramCurrency relation set
    pub currencies: BTreeSet<CurrencyId>,
}

impl CreditProgram {
    pub fn new(
        name: impl Into<String>,
        cost: Decimal,
        max_cost: Decimal,
        period_id: PeriodId,
        storekeeper_id: StorekeeperId,
    ) -> Self {
        Self {
            id: CreditProgramId::new_v7(),
            name: name.into(),
            cost,
            max_cost,
            period_id,
            storekeeper_id,
            currencies: BTreeSet::new(),
        }
    }

    pub fn with_currency(mut self, currency_id: CurrencyId) -> Self {
        self.currencies.insert(currency_id);
        self
    }

    pub fn has_currency(&self, currency_id: CurrencyId) -> bool {
        self.currencies.contains(&currency_id)
    }
}

/// A currency with its exchange cost
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub id: CurrencyId,
    pub name: String,
    pub abbreviation: String,
    pub cost: Decimal,
    pub storekeeper_id: StorekeeperId,
}

impl Currency {
    pub fn new(
        name: impl Into<String>,
        abbreviation: impl Into<String>,
        cost: Decimal,
        storekeeper_id: StorekeeperId,
    ) -> Self {
        Self {
            id: CurrencyId::new_v7(),
            name: name.into(),
            abbreviation: abbreviation.into(),
            cost,
            storekeeper_id,
        }
    }
}

/// Any aggregate, as handed to and returned from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateRecord {
    Client(Client),
    Deposit(Deposit),
    CreditProgram(CreditProgram),
    Currency(Currency),
}

impl AggregateRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            AggregateRecord::Client(_) => EntityKind::Client,
            AggregateRecord::Deposit(_) => EntityKind::Deposit,
            AggregateRecord::CreditProgram(_) => EntityKind::CreditProgram,
            AggregateRecord::Currency(_) => EntityKind::Currency,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            AggregateRecord::Client(c) => *c.id.as_uuid(),
            AggregateRecord::Deposit(d) => *d.id.as_uuid(),
            AggregateRecord::CreditProgram(p) => *p.id.as_uuid(),
            AggregateRecord::Currency(c) => *c.id.as_uuid(),
        }
    }

    /// Target ids currently held in one of this aggregate's relation sets
    ///
    /// Returns `None` when the relation type is not owned by this aggregate.
    pub fn relation_targets(&self, kind: RelationKind) -> Option<BTreeSet<Uuid>> {
        match (self, kind) {
            (AggregateRecord::Client(c), RelationKind::DepositClient) => {
                Some(c.deposits.iter().map(|id| *id.as_uuid()).collect())
            }
            (AggregateRecord::Client(c), RelationKind::ClientCreditProgram) => {
                Some(c.credit_programs.iter().map(|id| *id.as_uuid()).collect())
            }
            (AggregateRecord::Deposit(d), RelationKind::DepositCurrency) => {
                Some(d.currencies.iter().map(|id| *id.as_uuid()).collect())
            }
            (AggregateRecord::CreditProgram(p), RelationKind::CreditProgramCurrency) => {
                Some(p.currencies.iter().map(|id| *id.as_uuid()).collect())
            }
            _ => None,
        }
    }

    /// Replaces one relation set with the given targets
    ///
    /// Does nothing for a relation type this aggregate does not own.
    pub fn set_relation_targets(&mut self, kind: RelationKind, targets: &BTreeSet<Uuid>) {
        match (self, kind) {
            (AggregateRecord::Client(c), RelationKind::DepositClient) => {
                c.deposits = targets.iter().copied().map(DepositId::from_uuid).collect();
            }
            (AggregateRecord::Client(c), RelationKind::ClientCreditProgram) => {
                c.credit_programs = targets.iter().copied().map(CreditProgramId::from_uuid).collect();
            }
            (AggregateRecord::Deposit(d), RelationKind::DepositCurrency) => {
                d.currencies = targets.iter().copied().map(CurrencyId::from_uuid).collect();
            }
            (AggregateRecord::CreditProgram(p), RelationKind::CreditProgramCurrency) => {
                p.currencies = targets.iter().copied().map(CurrencyId::from_uuid).collect();
            }
            _ => {}
        }
    }
}

impl From<Client> for AggregateRecord {
    fn from(client: Client) -> Self {
        AggregateRecord::Client(client)
    }
}

impl From<Deposit> for AggregateRecord {
    fn from(deposit: Deposit) -> Self {
        AggregateRecord::Deposit(deposit)
    }
}

impl From<CreditProgram> for AggregateRecord {
    fn from(program: CreditProgram) -> Self {
        AggregateRecord::CreditProgram(program)
    }
}

impl From<Currency> for AggregateRecord {
    fn from(currency: Currency) -> Self {
        AggregateRecord::Currency(currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new("Ivanov", "Ivan", Decimal::new(150_000, 2), ClerkId::new())
    }

    #[test]
    fn test_owned_relations_match_relation_owner() {
        for kind in [
            EntityKind::Client,
            EntityKind::Deposit,
            EntityKind::CreditProgram,
            EntityKind::Currency,
        ] {
            for relation in kind.owned_relations() {
                assert_eq!(relation.owner(), kind);
            }
        }
    }

    #[test]
    fn test_relation_targets_for_owned_kind() {
        let deposit = DepositId::new();
        let record = AggregateRecord::from(client().with_deposit(deposit));

        let targets = record.relation_targets(RelationKind::DepositClient).unwrap();
        assert_eq!(targets.len(), 1);
        assert!(targets.contains(deposit.as_uuid()));
        assert!(record.relation_targets(RelationKind::DepositCurrency).is_none());
    }

    #[test]
    fn test_set_relation_targets_replaces_set() {
        let mut record = AggregateRecord::from(client().with_credit_program(CreditProgramId::new()));
        let replacement: BTreeSet<Uuid> = [Uuid::from_u128(7)].into_iter().collect();

        record.set_relation_targets(RelationKind::ClientCreditProgram, &replacement);

        assert_eq!(
            record.relation_targets(RelationKind::ClientCreditProgram),
            Some(replacement)
        );
    }
}
