//! Tests for the report pipeline end to end over the in-memory store

use std::sync::Arc;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use domain_banking::{
    BankError, CsvDocumentBuilder, DocumentBuilder, DocumentError, DocumentFormat, EntityKind,
    MockBankStore, ReportService,
};
use test_utils::{assert_document_ready, document_lines, BankFixture, DateFixtures};

fn service(store: &MockBankStore) -> ReportService {
    ReportService::new(Arc::new(store.clone()))
}

/// Builder that renders nothing at all
struct SilentBuilder;

impl DocumentBuilder for SilentBuilder {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn add_header(self, _title: &str) -> Self {
        self
    }

    fn add_paragraph(self, _text: &str) -> Self {
        self
    }

    fn add_table(self, _column_widths: &[u32], _rows: &[Vec<String>]) -> Self {
        self
    }

    fn build(self) -> Result<Vec<u8>, DocumentError> {
        Ok(Vec::new())
    }
}

// ============================================================================
// Parameter Guards
// ============================================================================

mod guards {
    use super::*;

    #[tokio::test]
    async fn test_reversed_range_fails_before_any_fetch() {
        let store = BankFixture::new().store();
        let start = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let finish = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let err = service(&store)
            .clients_by_deposit(start, finish, CsvDocumentBuilder::new(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BankError::InvalidDateRange { .. }));
        assert_eq!(store.total_fetches(), 0);
    }

    #[tokio::test]
    async fn test_currency_report_checks_range_too() {
        let store = BankFixture::new().store();

        let err = service(&store)
            .deposits_and_credit_programs_by_currency(
                DateFixtures::quarter_end(),
                DateFixtures::quarter_start(),
                CsvDocumentBuilder::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BankError::InvalidDateRange { .. }));
        assert_eq!(store.total_fetches(), 0);
    }

    #[tokio::test]
    async fn test_empty_result_guard_returns_no_stream() {
        let mut state = BankFixture::new().state();
        for deposit in &mut state.deposits {
            deposit.currencies.clear();
        }
        let store = MockBankStore::with_state(state);

        let err = service(&store)
            .deposits_by_credit_program(None, CsvDocumentBuilder::new(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BankError::EmptyResult(_)));
    }
}

// ============================================================================
// Rendered Output
// ============================================================================

mod rendering {
    use super::*;

    #[tokio::test]
    async fn test_clients_by_deposit_document() {
        let store = BankFixture::new().store();

        let document = service(&store)
            .clients_by_deposit(
                DateFixtures::quarter_start(),
                DateFixtures::quarter_end(),
                CsvDocumentBuilder::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_document_ready(&document);
        assert_eq!(document.file_name, "clients_by_deposit_20240101-20240331.csv");
        assert_eq!(document.mime_type, "text/csv");
        assert_eq!(document.row_count, 3);

        let lines = document_lines(&document);
        assert_eq!(lines[0], "Clients by deposit");
        assert_eq!(lines[1], "Clients and the deposits they hold. Period: 01.01.2024 - 31.03.2024");
        assert_eq!(lines[2], "Surname,Name,Balance,Interest rate,Period,Date from,Date to");
        assert_eq!(lines.len(), 6);
    }

    #[tokio::test]
    async fn test_fetches_only_needed_lists_once() {
        let store = BankFixture::new().store();

        service(&store)
            .clients_by_deposit(
                DateFixtures::quarter_start(),
                DateFixtures::quarter_end(),
                CsvDocumentBuilder::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(store.fetch_count(EntityKind::Client), 1);
        assert_eq!(store.fetch_count(EntityKind::Deposit), 1);
        assert_eq!(store.fetch_count(EntityKind::CreditProgram), 0);
        assert_eq!(store.fetch_count(EntityKind::Currency), 0);
    }

    #[tokio::test]
    async fn test_currency_report_has_two_header_rows() {
        let store = BankFixture::new().store();

        let document = service(&store)
            .deposits_and_credit_programs_by_currency(
                DateFixtures::quarter_start(),
                DateFixtures::quarter_end(),
                CsvDocumentBuilder::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let lines = document_lines(&document);
        assert_eq!(lines[2], "Currency,Credit program,,Deposit,");
        assert_eq!(lines[3], ",Name,Max cost,Interest rate,Period");
        // RUB: mortgage paired with savings; USD: auto paired with accumulative
        assert_eq!(document.row_count, 2);
        assert_eq!(lines[4], "Ruble (RUB),Mortgage,5000000.00,8.50,12 months");
        assert_eq!(store.total_fetches(), 3);
    }

    #[tokio::test]
    async fn test_cross_join_row_count() {
        let fixture = BankFixture::new();
        let store = fixture.store();

        let document = service(&store)
            .deposits_by_credit_program(None, CsvDocumentBuilder::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(document.file_name, "deposits_by_credit_program.csv");
        assert_eq!(document.row_count, 6);
    }

    #[tokio::test]
    async fn test_empty_filter_still_renders_header() {
        let store = BankFixture::new().store();

        let document = service(&store)
            .clients_by_credit_program(&[], CsvDocumentBuilder::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_document_ready(&document);
        assert_eq!(document.row_count, 0);
        assert_eq!(document.file_name, "clients_by_credit_program.csv");
    }

    #[tokio::test]
    async fn test_empty_render_is_an_error() {
        let store = BankFixture::new().store();

        let err = service(&store)
            .clients_by_credit_program(&[], SilentBuilder, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BankError::Document(DocumentError::Empty)));
    }
}

// ============================================================================
// Cancellation
// ============================================================================

mod cancellation {
    use super::*;

    #[tokio::test]
    async fn test_cancelled_token_stops_before_fetch() {
        let fixture = BankFixture::new();
        let store = fixture.store();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service(&store)
            .clients_by_credit_program(&[fixture.mortgage.id], CsvDocumentBuilder::new(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, BankError::Cancelled));
        assert_eq!(store.total_fetches(), 0);
    }

    #[tokio::test]
    async fn test_range_is_validated_before_cancellation() {
        let store = BankFixture::new().store();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service(&store)
            .clients_by_deposit(
                DateFixtures::quarter_end(),
                DateFixtures::quarter_start(),
                CsvDocumentBuilder::new(),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BankError::InvalidDateRange { .. }));
    }
}
