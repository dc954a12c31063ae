//! Top-level facade crate for rowguard.
//!
//! Re-exports the core primitives and the storage engine so users can depend on a single crate.

pub mod core {
    pub use rowguard_core::*;
}

pub mod store {
    pub use rowguard_store::*;
}
