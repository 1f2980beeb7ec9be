//! Document builder contract
//!
//! A report is assembled as one fluent chain on a fresh builder:
//! header, descriptive paragraph, table, then [`DocumentBuilder::build`].
//! The builder has no header-row type; header labels are ordinary rows
//! placed first in the table.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output formats a builder can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Word,
    Excel,
    Pdf,
    Csv,
}

impl DocumentFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Word => "docx",
            DocumentFormat::Excel => "xlsx",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Csv => "csv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Word => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Csv => "text/csv",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Errors raised while rendering a document
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Table rows do not fit the declared column widths
    #[error("Table row {row} has {actual} cells, expected at most {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// The underlying writer failed
    #[error("Write failed: {0}")]
    Write(String),

    /// Rendering produced no bytes
    #[error("Rendered document is empty")]
    Empty,
}

/// Renders header, paragraph and table instructions into bytes
///
/// Every method consumes and returns the builder so a report reads as one
/// expression. Errors raised along the chain are held and surfaced by
/// [`build`](DocumentBuilder::build).
pub trait DocumentBuilder: Send + Sized {
    fn format(&self) -> DocumentFormat;

    fn add_header(self, title: &str) -> Self;

    fn add_paragraph(self, text: &str) -> Self;

    /// Appends a table; `column_widths` also fixes the column count
    fn add_table(self, column_widths: &[u32], rows: &[Vec<String>]) -> Self;

    fn build(self) -> Result<Vec<u8>, DocumentError>;
}
