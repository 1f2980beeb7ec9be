//! Infrastructure Database Layer
//!
//! This crate provides the PostgreSQL storage for the banking back office,
//! built on SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: [`repositories::BankRepository`]
//! owns the SQL, and [`adapters::PostgresBankAdapter`] implements the domain
//! store ports on top of it, translating errors into `PortError`.
//!
//! # Schema
//!
//! Aggregates live in `clients`, `deposits`, `credit_programs` and
//! `currencies`. Each relation set is an association table with a composite
//! primary key and foreign keys to both sides, so a duplicate pair or a
//! missing target is rejected by the database itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresBankAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/bank")).await?;
//! run_migrations(&pool).await?;
//! let adapter = PostgresBankAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use repositories::BankRepository;
pub use adapters::PostgresBankAdapter;
