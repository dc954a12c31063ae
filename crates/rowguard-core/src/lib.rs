//! rowguard core: storage-agnostic tenant isolation primitives.
//!
//! This crate defines tenant identifiers, execution principals and access
//! scopes, the per-row tenant predicate, the SQL policy generator, and the
//! error surface shared by the storage engine and tooling. It carries no async
//! runtime or storage dependencies so the predicate can back any engine.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `RowGuardError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod ident;
pub mod policy;
pub mod tenant;

/// Shared result type.
pub use error::{Result, RowGuardError};
pub use policy::{PolicyDecision, StatementKind};
pub use tenant::{AccessScope, Principal, TenantId};
