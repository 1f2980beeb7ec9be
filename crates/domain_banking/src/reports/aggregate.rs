//! Report aggregation
//!
//! Pure joins over already-fetched entity lists. Relation sets hold ids
//! only; targets are resolved through id-keyed maps built per call.

use std::collections::{HashMap, HashSet};

use core_kernel::{CreditProgramId, DateRange, DepositId};

use crate::entities::{Client, CreditProgram, Currency, Deposit};
use crate::error::BankError;

use super::types::{
    ClientDepositRow, ClientEntry, CreditProgramClientsRow, CreditProgramDepositsRow,
    CurrencyDepositEntry, CurrencyProgramEntry, CurrencyRow, DepositEntry,
};

/// Stateless report aggregator
pub struct ReportAggregator;

impl ReportAggregator {
    /// Clients holding each selected credit program
    ///
    /// Rows follow filter order. Unknown and repeated ids are skipped, and an
    /// empty filter yields no rows.
    #[must_use]
    pub fn clients_by_credit_program(
        credit_programs: &[CreditProgram],
        clients: &[Client],
        filter: &[CreditProgramId],
    ) -> Vec<CreditProgramClientsRow> {
        let programs: HashMap<CreditProgramId, &CreditProgram> =
            credit_programs.iter().map(|p| (p.id, p)).collect();
        let mut seen = HashSet::new();

        filter
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| programs.get(id))
            .map(|program| CreditProgramClientsRow {
                credit_program_id: program.id,
                credit_program_name: program.name.clone(),
                clients: clients
                    .iter()
                    .filter(|client| client.has_credit_program(program.id))
                    .map(|client| ClientEntry {
                        client_id: client.id,
                        surname: client.surname.clone(),
                        name: client.name.clone(),
                        balance: client.balance,
                    })
                    .collect(),
            })
            .collect()
    }

    /// One row per (client, held deposit) pair
    ///
    /// The range is copied into every row and filters nothing. Deposit ids
    /// that no longer resolve are skipped.
    #[must_use]
    pub fn clients_by_deposit(
        clients: &[Client],
        deposits: &[Deposit],
        range: DateRange,
    ) -> Vec<ClientDepositRow> {
        let index: HashMap<DepositId, &Deposit> = deposits.iter().map(|d| (d.id, d)).collect();
        let index = &index;

        clients
            .iter()
            .flat_map(move |client| {
                client
                    .deposits
                    .iter()
                    .filter_map(move |id| index.get(id))
                    .map(move |deposit| ClientDepositRow {
                        client_id: client.id,
                        deposit_id: deposit.id,
                        surname: client.surname.clone(),
                        name: client.name.clone(),
                        balance: client.balance,
                        interest_rate: deposit.interest_rate,
                        period_months: deposit.period_months,
                        date_start: range.start(),
                        date_finish: range.end(),
                    })
            })
            .collect()
    }

    /// Credit programs and deposits grouped by currency
    ///
    /// Every currency gets a row, in input order; see
    /// [`CurrencyRow::lines`] for how the two sides are aligned.
    #[must_use]
    pub fn by_currency(
        currencies: &[Currency],
        credit_programs: &[CreditProgram],
        deposits: &[Deposit],
    ) -> Vec<CurrencyRow> {
        currencies
            .iter()
            .map(|currency| CurrencyRow {
                currency_id: currency.id,
                currency_name: currency.name.clone(),
                abbreviation: currency.abbreviation.clone(),
                credit_programs: credit_programs
                    .iter()
                    .filter(|program| program.has_currency(currency.id))
                    .map(|program| CurrencyProgramEntry {
                        credit_program_id: program.id,
                        name: program.name.clone(),
                        max_cost: program.max_cost,
                    })
                    .collect(),
                deposits: deposits
                    .iter()
                    .filter(|deposit| deposit.has_currency(currency.id))
                    .map(|deposit| CurrencyDepositEntry {
                        deposit_id: deposit.id,
                        interest_rate: deposit.interest_rate,
                        period_months: deposit.period_months,
                    })
                    .collect(),
            })
            .collect()
    }

    /// Every selected credit program paired with the whole deposit list
    ///
    /// This is a cross-join: deposits are not matched to programs by any
    /// key. `None` selects all programs; `Some(&[])` selects none.
    ///
    /// # Errors
    ///
    /// `EmptyResult` when no deposit has a currency, checked before any row
    /// is built.
    // TODO: confirm with product whether deposits should be joined to
    // programs through a shared currency instead of repeated in full.
    pub fn deposits_by_credit_program(
        credit_programs: &[CreditProgram],
        deposits: &[Deposit],
        filter: Option<&[CreditProgramId]>,
    ) -> Result<Vec<CreditProgramDepositsRow>, BankError> {
        if !deposits.iter().any(|deposit| !deposit.currencies.is_empty()) {
            return Err(BankError::empty_result("no deposits with currencies found"));
        }

        let entries: Vec<DepositEntry> = deposits
            .iter()
            .map(|deposit| DepositEntry {
                deposit_id: deposit.id,
                interest_rate: deposit.interest_rate,
                cost: deposit.cost,
                period_months: deposit.period_months,
            })
            .collect();

        let selected: Vec<&CreditProgram> = match filter {
            None => credit_programs.iter().collect(),
            Some(ids) => {
                let programs: HashMap<CreditProgramId, &CreditProgram> =
                    credit_programs.iter().map(|p| (p.id, p)).collect();
                let mut seen = HashSet::new();
                ids.iter()
                    .filter(|id| seen.insert(**id))
                    .filter_map(|id| programs.get(id).copied())
                    .collect()
            }
        };

        Ok(selected
            .into_iter()
            .map(|program| CreditProgramDepositsRow {
                credit_program_id: program.id,
                credit_program_name: program.name.clone(),
                deposits: entries.clone(),
            })
            .collect())
    }
}
