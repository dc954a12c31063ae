//! SQL identifier checks for table, column and setting names.
//!
//! Names are spliced into generated SQL, so only plain unquoted identifiers
//! are accepted: `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes.

use crate::error::{Result, RowGuardError};

/// Longest identifier Postgres keeps without truncation.
pub const MAX_IDENT_LEN: usize = 63;

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else { return false };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    s.len() <= MAX_IDENT_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate_identifier(kind: &str, s: &str) -> Result<()> {
    if is_identifier(s) {
        Ok(())
    } else {
        Err(RowGuardError::BadRequest(format!(
            "invalid {kind}: {s:?} (expected [A-Za-z_][A-Za-z0-9_]*, max {MAX_IDENT_LEN} bytes)"
        )))
    }
}

/// Custom session settings must be namespaced: `prefix.name`.
pub fn validate_setting_name(s: &str) -> Result<()> {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() < 2 || !parts.iter().all(|p| is_identifier(p)) {
        return Err(RowGuardError::BadRequest(format!(
            "invalid session setting name: {s:?} (expected namespace.name)"
        )));
    }
    Ok(())
}

/// Quote a value as a SQL string literal.
pub fn quote_literal(v: &str) -> String {
    format!("'{}'", v.replace('\'', "''"))
}
