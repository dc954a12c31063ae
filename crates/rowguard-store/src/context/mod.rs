//! Principal/session context types shared across layers.
//!
//! The current tenant lives on the unit of work that owns it. Nothing here is
//! global or connection-local, so a reused connection slot starts clean.

pub mod session;

pub use session::{RoleRegistry, SessionContext};
