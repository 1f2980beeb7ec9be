//! Report row types
//!
//! Each aggregated row is one structure per grouping key. Tables flatten
//! them into one or more text rows at render time.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClientId, CreditProgramId, CurrencyId, DepositId};

/// One client matched to a credit program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEntry {
    pub client_id: ClientId,
    pub surname: String,
    pub name: String,
    pub balance: Decimal,
}

/// Clients holding one credit program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditProgramClientsRow {
    pub credit_program_id: CreditProgramId,
    pub credit_program_name: String,
    pub clients: Vec<ClientEntry>,
}

/// One (client, held deposit) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDepositRow {
    pub client_id: ClientId,
    pub deposit_id: DepositId,
    pub surname: String,
    pub name: String,
    pub balance: Decimal,
    pub interest_rate: Decimal,
    pub period_months: i32,
    /// Echo of the requested range; not a filter
    pub date_start: NaiveDate,
    pub date_finish: NaiveDate,
}

/// A credit program side of a currency row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyProgramEntry {
    pub credit_program_id: CreditProgramId,
    pub name: String,
    pub max_cost: Decimal,
}

/// A deposit side of a currency row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyDepositEntry {
    pub deposit_id: DepositId,
    pub interest_rate: Decimal,
    pub period_months: i32,
}

/// Credit programs and deposits denominated in one currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRow {
    pub currency_id: CurrencyId,
    pub currency_name: String,
    pub abbreviation: String,
    pub credit_programs: Vec<CurrencyProgramEntry>,
    pub deposits: Vec<CurrencyDepositEntry>,
}

/// One aligned table line of a [`CurrencyRow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyLine<'a> {
    pub credit_program: Option<&'a CurrencyProgramEntry>,
    pub deposit: Option<&'a CurrencyDepositEntry>,
    /// Index into `deposits` the deposit columns came from
    pub deposit_index: Option<usize>,
}

impl CurrencyRow {
    /// Aligned lines for rendering
    ///
    /// Credit program `i` is paired with `deposits[i % deposits.len()]`.
    /// Without credit programs, every deposit gets a line of its own. A
    /// currency with neither yields no lines.
    pub fn lines(&self) -> Vec<CurrencyLine<'_>> {
        if self.credit_programs.is_empty() {
            return self
                .deposits
                .iter()
                .enumerate()
                .map(|(index, deposit)| CurrencyLine {
                    credit_program: None,
                    deposit: Some(deposit),
                    deposit_index: Some(index),
                })
                .collect();
        }

        self.credit_programs
            .iter()
            .enumerate()
            .map(|(i, program)| {
                let deposit_index = (!self.deposits.is_empty()).then(|| i % self.deposits.len());
                CurrencyLine {
                    credit_program: Some(program),
                    deposit: deposit_index.map(|index| &self.deposits[index]),
                    deposit_index,
                }
            })
            .collect()
    }
}

/// One deposit repeated under a credit program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEntry {
    pub deposit_id: DepositId,
    pub interest_rate: Decimal,
    pub cost: Decimal,
    pub period_months: i32,
}

/// A credit program with the deposit list attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditProgramDepositsRow {
    pub credit_program_id: CreditProgramId,
    pub credit_program_name: String,
    pub deposits: Vec<DepositEntry>,
}
