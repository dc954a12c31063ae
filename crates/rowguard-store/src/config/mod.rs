//! Store config loader (strict parsing).

pub mod schema;

use std::fs;

use rowguard_core::error::{Result, RowGuardError};

pub use schema::{PoolSection, RlsSection, RoleConfig, StoreConfig, TableConfig};

pub fn load_from_file(path: &str) -> Result<StoreConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RowGuardError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<StoreConfig> {
    let cfg: StoreConfig = serde_yaml::from_str(s)
        .map_err(|e| RowGuardError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
