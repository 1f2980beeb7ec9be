//! Repository implementations for the banking aggregates
//!
//! Repositories encapsulate SQL queries and map between database rows and
//! domain types.

pub mod bank;

pub use bank::{BankRepository, RelationTable};
