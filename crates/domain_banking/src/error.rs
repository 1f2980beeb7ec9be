//! Banking domain errors
//!
//! One error type covers both the relationship synchronizer and the report
//! pipeline. Every expected failure (missing aggregate, bad date range, empty
//! guard result) is a variant here; nothing in this crate panics on them.

use chrono::NaiveDate;
use thiserror::Error;

use core_kernel::{PortError, TemporalError};

use crate::reports::document::DocumentError;

/// Errors that can occur in the banking domain
#[derive(Debug, Error)]
pub enum BankError {
    /// The aggregate being updated does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Malformed relation pair or duplicate pair in one desired set
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unique or foreign-key violation reported by the store
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Ranged report requested with start after end
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// A report guard found no qualifying records
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// Opaque failure of the backing store
    #[error("Storage failure: {message}")]
    Storage {
        message: String,
        #[source]
        source: PortError,
    },

    /// Report generation was cancelled before rendering started
    #[error("Report generation cancelled")]
    Cancelled,

    /// The document builder failed to produce output
    #[error("Document rendering failed: {0}")]
    Document(#[from] DocumentError),
}

impl BankError {
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        BankError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        BankError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        BankError::Conflict(message.into())
    }

    pub fn empty_result(message: impl Into<String>) -> Self {
        BankError::EmptyResult(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BankError::NotFound { .. })
    }
}

impl From<PortError> for BankError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => BankError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => BankError::Conflict(message),
            PortError::Validation { message, field } => match field {
                Some(field) => BankError::Validation(format!("{}: {}", field, message)),
                None => BankError::Validation(message),
            },
            other => BankError::Storage {
                message: other.to_string(),
                source: other,
            },
        }
    }
}

impl From<TemporalError> for BankError {
    fn from(error: TemporalError) -> Self {
        match error {
            TemporalError::InvalidRange { start, end } => BankError::InvalidDateRange { start, end },
        }
    }
}
