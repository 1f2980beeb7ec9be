//! Flattening aggregated rows into builder tables
//!
//! Header labels are ordinary rows at the top of `rows`; `header_rows`
//! records how many there are.

use super::format::{date, decimal, months, placeholder};
use super::types::{
    ClientDepositRow, CreditProgramClientsRow, CreditProgramDepositsRow, CurrencyRow,
};

/// Table handed to a document builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub column_widths: Vec<u32>,
    pub header_rows: usize,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    fn with_header(column_widths: &[u32], header: Vec<Vec<&str>>) -> Self {
        let header_rows = header.len();
        Self {
            column_widths: column_widths.to_vec(),
            header_rows,
            rows: header
                .into_iter()
                .map(|row| row.into_iter().map(str::to_string).collect())
                .collect(),
        }
    }

    /// Rows below the header
    pub fn data_rows(&self) -> &[Vec<String>] {
        &self.rows[self.header_rows..]
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len() - self.header_rows
    }
}

/// One line per client entry; a program without clients gets one line of
/// placeholders so it still shows up
pub fn clients_by_credit_program(rows: &[CreditProgramClientsRow]) -> ReportTable {
    let mut table = ReportTable::with_header(
        &[3000, 3000, 3000, 1500],
        vec![vec!["Credit program", "Surname", "Name", "Balance"]],
    );
    for row in rows {
        if row.clients.is_empty() {
            table.rows.push(vec![
                row.credit_program_name.clone(),
                placeholder(),
                placeholder(),
                placeholder(),
            ]);
        }
        for client in &row.clients {
            table.rows.push(vec![
                row.credit_program_name.clone(),
                client.surname.clone(),
                client.name.clone(),
                decimal(client.balance),
            ]);
        }
    }
    table
}

pub fn clients_by_deposit(rows: &[ClientDepositRow]) -> ReportTable {
    let mut table = ReportTable::with_header(
        &[2500, 2500, 1500, 1500, 1500, 1500, 1500],
        vec![vec![
            "Surname",
            "Name",
            "Balance",
            "Interest rate",
            "Period",
            "Date from",
            "Date to",
        ]],
    );
    table.rows.extend(rows.iter().map(|row| {
        vec![
            row.surname.clone(),
            row.name.clone(),
            decimal(row.balance),
            decimal(row.interest_rate),
            months(row.period_months),
            date(row.date_start),
            date(row.date_finish),
        ]
    }));
    table
}

/// Two-level header: group labels, then column labels
pub fn by_currency(rows: &[CurrencyRow]) -> ReportTable {
    let mut table = ReportTable::with_header(
        &[2000, 3000, 1500, 1500, 1500],
        vec![
            vec!["Currency", "Credit program", "", "Deposit", ""],
            vec!["", "Name", "Max cost", "Interest rate", "Period"],
        ],
    );
    for row in rows {
        let label = format!("{} ({})", row.currency_name, row.abbreviation);
        for line in row.lines() {
            let (program_name, max_cost) = match line.credit_program {
                Some(program) => (program.name.clone(), decimal(program.max_cost)),
                None => (placeholder(), placeholder()),
            };
            let (rate, period) = match line.deposit {
                Some(deposit) => (decimal(deposit.interest_rate), months(deposit.period_months)),
                None => (placeholder(), placeholder()),
            };
            table
                .rows
                .push(vec![label.clone(), program_name, max_cost, rate, period]);
        }
    }
    table
}

pub fn deposits_by_credit_program(rows: &[CreditProgramDepositsRow]) -> ReportTable {
    let mut table = ReportTable::with_header(
        &[3000, 1500, 1500, 1500],
        vec![vec!["Credit program", "Interest rate", "Cost", "Period"]],
    );
    for row in rows {
        for deposit in &row.deposits {
            table.rows.push(vec![
                row.credit_program_name.clone(),
                decimal(deposit.interest_rate),
                decimal(deposit.cost),
                months(deposit.period_months),
            ]);
        }
    }
    table
}
