//! Table catalog: declared record types and their committed rows.

pub mod filter;
pub mod row;
pub mod table;

use std::sync::Arc;

use dashmap::DashMap;
use rowguard_core::error::{Result, RowGuardError};

pub use filter::Filter;
pub use row::{Row, RowId, Values};
pub use table::{Table, TableDef, CREATED_AT, UPDATED_AT};

#[derive(Default)]
pub struct Catalog {
    tables: DashMap<String, Arc<Table>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    pub fn insert(&self, table: Table) -> Result<()> {
        let name = table.name().to_string();
        match self.tables.entry(name) {
            dashmap::mapref::entry::Entry::Occupied(e) => Err(RowGuardError::Conflict(format!(
                "table {} already defined",
                e.key()
            ))),
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(Arc::new(table));
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<Table>> {
        self.tables
            .get(name)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| RowGuardError::UnknownTable(name.to_string()))
    }

    /// Table names in sorted order (the commit lock order).
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
