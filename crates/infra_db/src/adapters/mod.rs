//! Domain Adapters
//!
//! Implementations of the banking store ports over PostgreSQL.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBankAdapter;
//! use domain_banking::EntityListPort;
//!
//! let adapter = PostgresBankAdapter::new(pool);
//! let clients = adapter.list_clients(None).await?;
//! ```

pub mod bank;

pub use bank::{PgRelationTransaction, PostgresBankAdapter};
