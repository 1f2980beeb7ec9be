//! Pre-built Test Fixtures
//!
//! Provides fixed ids, dates and a small seeded bank so tests across crates
//! share the same predictable data.

use chrono::NaiveDate;
use core_kernel::{ClerkId, DateRange, StorekeeperId};
use domain_banking::{BankState, Client, CreditProgram, Currency, Deposit, MockBankStore};
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::builders::{ClientBuilder, CreditProgramBuilder, CurrencyBuilder, DepositBuilder};

/// Fixture for staff ids
pub struct IdFixtures;

impl IdFixtures {
    /// The clerk every test client and deposit belongs to
    pub fn clerk_id() -> ClerkId {
        ClerkId::from_uuid(Uuid::from_u128(0x00c1_e4c0))
    }

    /// The storekeeper every test program and currency belongs to
    pub fn storekeeper_id() -> StorekeeperId {
        StorekeeperId::from_uuid(Uuid::from_u128(0x0057_04e0))
    }
}

/// Fixture for reporting dates
pub struct DateFixtures;

impl DateFixtures {
    /// Jan 1, 2024
    pub fn quarter_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Mar 31, 2024
    pub fn quarter_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    pub fn first_quarter() -> DateRange {
        DateRange::new(Self::quarter_start(), Self::quarter_end()).unwrap()
    }
}

/// A small bank with every relation type populated
///
/// - currencies: `rub`, `usd`
/// - deposits: `savings` (RUB), `accumulative` (RUB, USD), `demand` (none)
/// - credit programs: `mortgage` (RUB), `auto` (USD)
/// - clients: `ivanov` (savings, mortgage), `petrova` (accumulative,
///   demand, mortgage), `sidorov` (auto)
pub struct BankFixture {
    pub rub: Currency,
    pub usd: Currency,
    pub savings: Deposit,
    pub accumulative: Deposit,
    pub demand: Deposit,
    pub mortgage: CreditProgram,
    pub auto: CreditProgram,
    pub ivanov: Client,
    pub petrova: Client,
    pub sidorov: Client,
}

impl Default for BankFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl BankFixture {
    pub fn new() -> Self {
        let rub = CurrencyBuilder::new().named("Ruble", "RUB").build();
        let usd = CurrencyBuilder::new().named("US Dollar", "USD").build();

        let savings = DepositBuilder::new()
            .with_interest_rate(dec!(8.5))
            .with_cost(dec!(50000))
            .with_period(12)
            .with_currency(rub.id)
            .build();
        let accumulative = DepositBuilder::new()
            .with_interest_rate(dec!(6.25))
            .with_cost(dec!(120000))
            .with_period(24)
            .with_currency(rub.id)
            .with_currency(usd.id)
            .build();
        let demand = DepositBuilder::new()
            .with_interest_rate(dec!(0.1))
            .with_cost(dec!(0))
            .with_period(1)
            .build();

        let mortgage = CreditProgramBuilder::new()
            .with_name("Mortgage")
            .with_max_cost(dec!(5000000))
            .with_currency(rub.id)
            .build();
        let auto = CreditProgramBuilder::new()
            .with_name("Auto loan")
            .with_max_cost(dec!(40000))
            .with_currency(usd.id)
            .build();

        let ivanov = ClientBuilder::new()
            .with_name("Ivanov", "Ivan")
            .with_balance(dec!(1500.50))
            .with_deposit(savings.id)
            .with_credit_program(mortgage.id)
            .build();
        let petrova = ClientBuilder::new()
            .with_name("Petrova", "Anna")
            .with_balance(dec!(98000))
            .with_deposit(accumulative.id)
            .with_deposit(demand.id)
            .with_credit_program(mortgage.id)
            .build();
        let sidorov = ClientBuilder::new()
            .with_name("Sidorov", "Petr")
            .with_balance(dec!(12.345))
            .with_credit_program(auto.id)
            .build();

        Self {
            rub,
            usd,
            savings,
            accumulative,
            demand,
            mortgage,
            auto,
            ivanov,
            petrova,
            sidorov,
        }
    }

    pub fn state(&self) -> BankState {
        BankState {
            clients: vec![self.ivanov.clone(), self.petrova.clone(), self.sidorov.clone()],
            deposits: vec![self.savings.clone(), self.accumulative.clone(), self.demand.clone()],
            credit_programs: vec![self.mortgage.clone(), self.auto.clone()],
            currencies: vec![self.rub.clone(), self.usd.clone()],
        }
    }

    /// A mock store seeded with this fixture
    pub fn store(&self) -> MockBankStore {
        MockBankStore::with_state(self.state())
    }
}
