//! Core Kernel - Foundational types shared by the banking back-office crates
//!
//! This crate provides the building blocks used across the domain and
//! infrastructure layers:
//! - Strongly-typed identifiers for every aggregate
//! - Inclusive date ranges for reporting periods
//! - Port error type and marker traits for the ports and adapters layout

pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use temporal::{DateRange, TemporalError};
pub use identifiers::{
    ClientId, DepositId, CreditProgramId, CurrencyId,
    ClerkId, StorekeeperId, PeriodId,
};
pub use ports::{
    PortError, DomainPort, OperationMetadata,
    AdapterHealth, HealthCheckResult, HealthCheckable,
};
