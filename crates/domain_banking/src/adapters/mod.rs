//! Document builder adapters
//!
//! Word, Excel and PDF builders live outside this crate and plug in through
//! [`DocumentBuilder`](crate::reports::DocumentBuilder). The CSV builder is
//! kept here so reports can be produced without them.

pub mod csv_document;

pub use csv_document::CsvDocumentBuilder;
