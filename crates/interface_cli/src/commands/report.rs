//! Report command
//!
//! Usage: bank-reports report [--delimiter <CHAR>] [--output-dir <DIR>] <REPORT> ...

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use tokio_util::sync::CancellationToken;

use core_kernel::CreditProgramId;
use domain_banking::{CsvDocumentBuilder, ReportDocument, ReportService};

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommand,

    /// Field delimiter for the CSV output
    #[arg(short, long, default_value_t = ',')]
    pub delimiter: char,

    /// Directory to write the report into (default: BANK_OUTPUT_DIR)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Clients holding each of the given credit programs
    ClientsByCreditProgram {
        /// Credit program id; repeat for several
        #[arg(short, long = "program", required = true)]
        programs: Vec<CreditProgramId>,
    },
    /// Clients and the deposits they hold, labelled with a period
    ClientsByDeposit(PeriodArgs),
    /// Credit programs and deposits grouped by currency
    ByCurrency(PeriodArgs),
    /// Credit programs with the deposit list (all programs when none given)
    DepositsByCreditProgram {
        /// Credit program id; repeat for several
        #[arg(short, long = "program")]
        programs: Vec<CreditProgramId>,
    },
}

#[derive(Debug, Args)]
pub struct PeriodArgs {
    /// First day of the period (YYYY-MM-DD)
    #[arg(long)]
    pub from: NaiveDate,

    /// Last day of the period (YYYY-MM-DD)
    #[arg(long)]
    pub to: NaiveDate,
}

/// Generates one report and writes it under `output_dir`
///
/// Returns the path of the written file.
pub async fn execute(
    args: ReportArgs,
    service: &ReportService,
    default_output_dir: &Path,
    cancel: &CancellationToken,
) -> anyhow::Result<PathBuf> {
    let builder = CsvDocumentBuilder::with_delimiter(delimiter_byte(args.delimiter)?);

    let document = match args.command {
        ReportCommand::ClientsByCreditProgram { programs } => {
            service
                .clients_by_credit_program(&programs, builder, cancel)
                .await?
        }
        ReportCommand::ClientsByDeposit(period) => {
            service
                .clients_by_deposit(period.from, period.to, builder, cancel)
                .await?
        }
        ReportCommand::ByCurrency(period) => {
            service
                .deposits_and_credit_programs_by_currency(period.from, period.to, builder, cancel)
                .await?
        }
        ReportCommand::DepositsByCreditProgram { programs } => {
            let filter = (!programs.is_empty()).then_some(programs.as_slice());
            service
                .deposits_by_credit_program(filter, builder, cancel)
                .await?
        }
    };

    let output_dir = args.output_dir.as_deref().unwrap_or(default_output_dir);
    write_document(document, output_dir).await
}

fn delimiter_byte(delimiter: char) -> anyhow::Result<u8> {
    if !delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character, got {delimiter:?}");
    }
    Ok(delimiter as u8)
}

async fn write_document(document: ReportDocument, output_dir: &Path) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let path = output_dir.join(&document.file_name);
    let rows = document.row_count;
    tokio::fs::write(&path, document.into_bytes())
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    tracing::info!(path = %path.display(), rows, "Report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_must_be_ascii() {
        assert_eq!(delimiter_byte(';').unwrap(), b';');
        assert_eq!(delimiter_byte('\t').unwrap(), b'\t');
        assert!(delimiter_byte('§').is_err());
    }
}
