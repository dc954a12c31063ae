//! Policy layer (tenant row filter per table).
//!
//! Compiles table definitions into policy runtimes that statements consult
//! for every row they read or write.

pub mod engine;

pub use engine::{StatementPolicy, TablePolicyRuntime};
