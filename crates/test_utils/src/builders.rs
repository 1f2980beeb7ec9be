//! Test Data Builders
//!
//! Provides builder patterns for constructing aggregates with sensible
//! defaults. Tests set only the fields and relations they care about.

use core_kernel::{
    ClientId, CreditProgramId, CurrencyId, DepositId, PeriodId, StorekeeperId,
};
use domain_banking::{Client, CreditProgram, Currency, Deposit};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::IdFixtures;

/// Builder for test clients
pub struct ClientBuilder {
    client: Client,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            client: Client::new("Ivanov", "Ivan", dec!(1500.00), IdFixtures::clerk_id()),
        }
    }

    pub fn with_id(mut self, id: ClientId) -> Self {
        self.client.id = id;
        self
    }

    /// Sets surname and name
    pub fn with_name(mut self, surname: impl Into<String>, name: impl Into<String>) -> Self {
        self.client.surname = surname.into();
        self.client.name = name.into();
        self
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.client.balance = balance;
        self
    }

    pub fn with_deposit(mut self, deposit_id: DepositId) -> Self {
        self.client.deposits.insert(deposit_id);
        self
    }

    pub fn with_credit_program(mut self, credit_program_id: CreditProgramId) -> Self {
        self.client.credit_programs.insert(credit_program_id);
        self
    }

    pub fn build(self) -> Client {
        self.client
    }
}

/// Builder for test deposits
pub struct DepositBuilder {
    deposit: Deposit,
}

impl Default for DepositBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DepositBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            deposit: Deposit::new(dec!(7.5), dec!(100000.00), 12, IdFixtures::clerk_id()),
        }
    }

    pub fn with_id(mut self, id: DepositId) -> Self {
        self.deposit.id = id;
        self
    }

    pub fn with_interest_rate(mut self, rate: Decimal) -> Self {
        self.deposit.interest_rate = rate;
        self
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.deposit.cost = cost;
        self
    }

    pub fn with_period(mut self, months: i32) -> Self {
        self.deposit.period_months = months;
        self
    }

    pub fn with_currency(mut self, currency_id: CurrencyId) -> Self {
        self.deposit.currencies.insert(currency_id);
        self
    }

    pub fn build(self) -> Deposit {
        self.deposit
    }
}

/// Builder for test credit programs
pub struct CreditProgramBuilder {
    program: CreditProgram,
}

impl Default for CreditProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CreditProgramBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            program: CreditProgram::new(
                "Mortgage",
                dec!(5000.00),
                dec!(3000000.00),
                PeriodId::new(),
                IdFixtures::storekeeper_id(),
            ),
        }
    }

    pub fn with_id(mut self, id: CreditProgramId) -> Self {
        self.program.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.program.name = name.into();
        self
    }

    pub fn with_max_cost(mut self, max_cost: Decimal) -> Self {
        self.program.max_cost = max_cost;
        self
    }

    pub fn with_currency(mut self, currency_id: CurrencyId) -> Self {
        self.program.currencies.insert(currency_id);
        self
    }

    pub fn build(self) -> CreditProgram {
        self.program
    }
}

/// Builder for test currencies
pub struct CurrencyBuilder {
    currency: Currency,
}

impl Default for CurrencyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrencyBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            currency: Currency::new("US Dollar", "USD", dec!(92.50), IdFixtures::storekeeper_id()),
        }
    }

    pub fn with_id(mut self, id: CurrencyId) -> Self {
        self.currency.id = id;
        self
    }

    /// Sets name and abbreviation
    pub fn named(mut self, name: impl Into<String>, abbreviation: impl Into<String>) -> Self {
        self.currency.name = name.into();
        self.currency.abbreviation = abbreviation.into();
        self
    }

    pub fn with_storekeeper(mut self, storekeeper_id: StorekeeperId) -> Self {
        self.currency.storekeeper_id = storekeeper_id;
        self
    }

    pub fn build(self) -> Currency {
        self.currency
    }
}

