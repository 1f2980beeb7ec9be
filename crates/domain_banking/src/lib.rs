//! Banking Back-Office Domain
//!
//! This crate covers the two parts of the back office that do real work on
//! top of the store:
//!
//! - **Relationship synchronization**: keeping the many-to-many relation
//!   sets of Clients, Deposits and CreditPrograms equal to a caller-supplied
//!   desired state, in one transaction per aggregate
//! - **Report aggregation**: joining entity snapshots into tables and
//!   rendering them through a pluggable document builder
//!
//! # Relation ownership
//!
//! | Relation                | Owner         | Target        |
//! |-------------------------|---------------|---------------|
//! | `DepositClient`         | Client        | Deposit       |
//! | `ClientCreditProgram`   | Client        | CreditProgram |
//! | `DepositCurrency`       | Deposit       | Currency      |
//! | `CreditProgramCurrency` | CreditProgram | Currency      |
//!
//! # Examples
//!
//! ```rust
//! use domain_banking::{DesiredRelations, RelationKind};
//! use core_kernel::DepositId;
//!
//! let deposit = DepositId::new();
//!
//! // Replace the client's deposits and leave its credit programs alone
//! let desired = DesiredRelations::new()
//!     .set(RelationKind::DepositClient, [deposit])
//!     .keep(RelationKind::ClientCreditProgram);
//!
//! assert_eq!(desired.kinds().count(), 1);
//! ```

pub mod entities;
pub mod relations;
pub mod error;
pub mod ports;
pub mod sync;
pub mod reports;
pub mod adapters;

pub use entities::{AggregateRecord, Client, CreditProgram, Currency, Deposit, EntityKind};
pub use relations::{reconcile, DesiredRelations, RelationDiff, RelationKind, RelationPair};
pub use error::BankError;
pub use ports::{AggregateStorePort, EntityListPort, RelationTransaction};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{BankState, MockBankStore, StoreOperation};
pub use sync::{AggregateUpdate, RelationshipSynchronizer, SyncOutcome};
pub use reports::{
    DocumentBuilder, DocumentError, DocumentFormat, ReportAggregator, ReportDocument,
    ReportKind, ReportService,
};
pub use adapters::CsvDocumentBuilder;
