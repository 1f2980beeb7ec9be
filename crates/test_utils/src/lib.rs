//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! banking back-office test suite.
//!
//! # Modules
//!
//! - `fixtures`: Fixed dates, amounts and a seeded bank scenario
//! - `builders`: Builder patterns for aggregate construction
//! - `assertions`: Assertion helpers for relation sets and documents
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
