//! Report pipeline
//!
//! Each report runs the same sequence: validate parameters, fetch the
//! needed lists concurrently, aggregate, flatten to a table, render. A
//! cancellation token is checked before the fetch, raced against it, and
//! checked again before rendering. Rendering itself always runs to the end.

use std::fmt;
use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use core_kernel::{CreditProgramId, DateRange, OperationMetadata, PortError};

use crate::error::BankError;
use crate::ports::EntityListPort;

use super::aggregate::ReportAggregator;
use super::document::{DocumentBuilder, DocumentError, DocumentFormat};
use super::tables::{self, ReportTable};

/// The four report shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    ClientsByCreditProgram,
    ClientsByDeposit,
    DepositsAndCreditProgramsByCurrency,
    DepositsByCreditProgram,
}

impl ReportKind {
    /// File-name stem
    pub fn slug(&self) -> &'static str {
        match self {
            ReportKind::ClientsByCreditProgram => "clients_by_credit_program",
            ReportKind::ClientsByDeposit => "clients_by_deposit",
            ReportKind::DepositsAndCreditProgramsByCurrency => "deposits_and_credit_programs_by_currency",
            ReportKind::DepositsByCreditProgram => "deposits_by_credit_program",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::ClientsByCreditProgram => "Clients by credit program",
            ReportKind::ClientsByDeposit => "Clients by deposit",
            ReportKind::DepositsAndCreditProgramsByCurrency => {
                "Deposits and credit programs by currency"
            }
            ReportKind::DepositsByCreditProgram => "Deposits by credit program",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ReportKind::ClientsByCreditProgram => "Clients holding each selected credit program",
            ReportKind::ClientsByDeposit => "Clients and the deposits they hold",
            ReportKind::DepositsAndCreditProgramsByCurrency => {
                "Credit programs and deposits denominated in each currency"
            }
            ReportKind::DepositsByCreditProgram => "Deposits offered alongside each credit program",
        }
    }

    /// File name for a rendered report
    ///
    /// `<slug>_<YYYYMMDD>-<YYYYMMDD>.<ext>` for ranged reports, `<slug>.<ext>`
    /// otherwise.
    pub fn file_name(&self, range: Option<&DateRange>, format: DocumentFormat) -> String {
        match range {
            Some(range) => format!("{}_{}.{}", self.slug(), range.compact(), format.extension()),
            None => format!("{}.{}", self.slug(), format.extension()),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A rendered report
#[derive(Debug, Clone)]
pub struct ReportDocument {
    /// Rendered bytes, positioned at offset 0
    pub content: Cursor<Vec<u8>>,
    pub file_name: String,
    pub mime_type: &'static str,
    pub format: DocumentFormat,
    /// Table rows below the header
    pub row_count: usize,
}

impl ReportDocument {
    pub fn len(&self) -> usize {
        self.content.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.get_ref().is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.content.into_inner()
    }
}

/// Generates reports from a read-only entity source
///
/// Holds no state between calls; every invocation works on the snapshot
/// it fetched.
pub struct ReportService {
    source: Arc<dyn EntityListPort>,
}

impl ReportService {
    pub fn new(source: Arc<dyn EntityListPort>) -> Self {
        Self { source }
    }

    /// Clients holding each of the given credit programs
    ///
    /// An empty id list renders a table with no data rows.
    #[instrument(skip(self, credit_program_ids, builder, cancel), fields(filter = credit_program_ids.len()))]
    pub async fn clients_by_credit_program<B: DocumentBuilder>(
        &self,
        credit_program_ids: &[CreditProgramId],
        builder: B,
        cancel: &CancellationToken,
    ) -> Result<ReportDocument, BankError> {
        let kind = ReportKind::ClientsByCreditProgram;
        checkpoint(cancel)?;

        let metadata = metadata(kind);
        let (credit_programs, clients) = race(cancel, async {
            tokio::try_join!(
                self.source.list_credit_programs(Some(metadata.clone())),
                self.source.list_clients(Some(metadata.clone())),
            )
        })
        .await?;
        debug!(credit_programs = credit_programs.len(), clients = clients.len(), "Entities fetched");

        let rows = ReportAggregator::clients_by_credit_program(&credit_programs, &clients, credit_program_ids);
        let table = tables::clients_by_credit_program(&rows);

        checkpoint(cancel)?;
        render(kind, None, table, builder)
    }

    /// Every (client, deposit) pair, labelled with the requested range
    ///
    /// # Errors
    ///
    /// `InvalidDateRange` when `date_start > date_finish`, before anything is
    /// fetched
    #[instrument(skip(self, builder, cancel))]
    pub async fn clients_by_deposit<B: DocumentBuilder>(
        &self,
        date_start: NaiveDate,
        date_finish: NaiveDate,
        builder: B,
        cancel: &CancellationToken,
    ) -> Result<ReportDocument, BankError> {
        let kind = ReportKind::ClientsByDeposit;
        let range = DateRange::new(date_start, date_finish)?;
        checkpoint(cancel)?;

        let metadata = metadata(kind);
        let (clients, deposits) = race(cancel, async {
            tokio::try_join!(
                self.source.list_clients(Some(metadata.clone())),
                self.source.list_deposits(Some(metadata.clone())),
            )
        })
        .await?;
        debug!(clients = clients.len(), deposits = deposits.len(), "Entities fetched");

        let rows = ReportAggregator::clients_by_deposit(&clients, &deposits, range);
        let table = tables::clients_by_deposit(&rows);

        checkpoint(cancel)?;
        render(kind, Some(range), table, builder)
    }

    /// Credit programs and deposits grouped by currency
    ///
    /// # Errors
    ///
    /// `InvalidDateRange` when `date_start > date_finish`, before anything is
    /// fetched
    #[instrument(skip(self, builder, cancel))]
    pub async fn deposits_and_credit_programs_by_currency<B: DocumentBuilder>(
        &self,
        date_start: NaiveDate,
        date_finish: NaiveDate,
        builder: B,
        cancel: &CancellationToken,
    ) -> Result<ReportDocument, BankError> {
        let kind = ReportKind::DepositsAndCreditProgramsByCurrency;
        let range = DateRange::new(date_start, date_finish)?;
        checkpoint(cancel)?;

        let metadata = metadata(kind);
        let (currencies, credit_programs, deposits) = race(cancel, async {
            tokio::try_join!(
                self.source.list_currencies(Some(metadata.clone())),
                self.source.list_credit_programs(Some(metadata.clone())),
                self.source.list_deposits(Some(metadata.clone())),
            )
        })
        .await?;
        debug!(
            currencies = currencies.len(),
            credit_programs = credit_programs.len(),
            deposits = deposits.len(),
            "Entities fetched"
        );

        let rows = ReportAggregator::by_currency(&currencies, &credit_programs, &deposits);
        let table = tables::by_currency(&rows);

        checkpoint(cancel)?;
        render(kind, Some(range), table, builder)
    }

    /// Every selected credit program with the whole deposit list
    ///
    /// `None` selects every program.
    ///
    /// # Errors
    ///
    /// `EmptyResult` when no deposit has a currency
    #[instrument(skip(self, credit_program_ids, builder, cancel))]
    pub async fn deposits_by_credit_program<B: DocumentBuilder>(
        &self,
        credit_program_ids: Option<&[CreditProgramId]>,
        builder: B,
        cancel: &CancellationToken,
    ) -> Result<ReportDocument, BankError> {
        let kind = ReportKind::DepositsByCreditProgram;
        checkpoint(cancel)?;

        let metadata = metadata(kind);
        let (credit_programs, deposits) = race(cancel, async {
            tokio::try_join!(
                self.source.list_credit_programs(Some(metadata.clone())),
                self.source.list_deposits(Some(metadata.clone())),
            )
        })
        .await?;
        debug!(credit_programs = credit_programs.len(), deposits = deposits.len(), "Entities fetched");

        let rows = ReportAggregator::deposits_by_credit_program(&credit_programs, &deposits, credit_program_ids)?;
        let table = tables::deposits_by_credit_program(&rows);

        checkpoint(cancel)?;
        render(kind, None, table, builder)
    }
}

fn metadata(kind: ReportKind) -> OperationMetadata {
    OperationMetadata::with_correlation_id(Uuid::new_v4().to_string()).with_context("report", kind.slug())
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), BankError> {
    if cancel.is_cancelled() {
        return Err(BankError::Cancelled);
    }
    Ok(())
}

/// Awaits the fetch barrier unless the token fires first
async fn race<T, F>(cancel: &CancellationToken, fetch: F) -> Result<T, BankError>
where
    F: Future<Output = Result<T, PortError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BankError::Cancelled),
        result = fetch => Ok(result?),
    }
}

fn render<B: DocumentBuilder>(
    kind: ReportKind,
    range: Option<DateRange>,
    table: ReportTable,
    builder: B,
) -> Result<ReportDocument, BankError> {
    let format = builder.format();
    let paragraph = match &range {
        Some(range) => format!("{}. Period: {}", kind.description(), range),
        None => kind.description().to_string(),
    };

    let bytes = builder
        .add_header(kind.title())
        .add_paragraph(&paragraph)
        .add_table(&table.column_widths, &table.rows)
        .build()?;
    if bytes.is_empty() {
        return Err(DocumentError::Empty.into());
    }

    let document = ReportDocument {
        file_name: kind.file_name(range.as_ref(), format),
        mime_type: format.mime_type(),
        format,
        row_count: table.data_row_count(),
        content: Cursor::new(bytes),
    };
    info!(
        report = %kind,
        file_name = %document.file_name,
        rows = document.row_count,
        bytes = document.len(),
        "Report rendered"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_ranged_file_name() {
        let name = ReportKind::ClientsByDeposit.file_name(Some(&range()), DocumentFormat::Pdf);
        assert_eq!(name, "clients_by_deposit_20240101-20240630.pdf");
    }

    #[test]
    fn test_unranged_file_name() {
        let name = ReportKind::DepositsByCreditProgram.file_name(None, DocumentFormat::Excel);
        assert_eq!(name, "deposits_by_credit_program.xlsx");
    }

    #[tokio::test]
    async fn test_race_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = race(&cancel, async { Ok::<_, PortError>(1) }).await;
        assert!(matches!(result, Err(BankError::Cancelled)));
    }
}
