//! Report generation.
//!
//! This module turns entity snapshots into rendered documents:
//! - Clients by credit program
//! - Clients by deposit
//! - Deposits and credit programs by currency
//! - Deposits by credit program
//!
//! [`ReportAggregator`] holds the pure joins, [`tables`] flattens their rows,
//! and [`ReportService`] runs fetch, aggregate and render with cancellation.

pub mod aggregate;
pub mod document;
pub mod format;
pub mod pipeline;
pub mod tables;
pub mod types;

pub use aggregate::ReportAggregator;
pub use document::{DocumentBuilder, DocumentError, DocumentFormat};
pub use format::PLACEHOLDER;
pub use pipeline::{ReportDocument, ReportKind, ReportService};
pub use tables::ReportTable;
pub use types::*;
