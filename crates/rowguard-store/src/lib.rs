//! rowguard store library entry.
//!
//! An in-memory storage engine that enforces tenant row security on every
//! statement. This crate wires config, the table catalog and its policy
//! runtimes, connection slots, units of work, and the tenant-aware model
//! layer. It is consumed by the `rowguard` binary and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod catalog;
pub mod config;
pub mod context;
pub mod model;
pub mod obs;
pub mod policy;
pub mod pool;
pub mod session;
pub mod store;
pub mod uow;

pub use catalog::{Filter, Row, RowId, TableDef, Values};
pub use session::SessionManager;
pub use store::Store;
pub use uow::UnitOfWork;
