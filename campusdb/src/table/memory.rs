use super::{Table, TableBackend};
use crate::error::Result;
use crate::schema::EntityKind;
use std::cell::RefCell;
use std::collections::HashMap;

/// Tables held in memory. Used by tests and for embedding without a data directory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RefCell<HashMap<EntityKind, Table>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table.
    pub fn with_table(self, table: Table) -> Self {
        self.tables.borrow_mut().insert(table.kind(), table);
        self
    }

    /// Snapshot of a stored table.
    pub fn table(&self, kind: EntityKind) -> Option<Table> {
        self.tables.borrow().get(&kind).cloned()
    }
}

impl TableBackend for MemoryBackend {
    fn load(&self, kind: EntityKind) -> Result<Option<Table>> {
        Ok(self.table(kind))
    }

    fn save(&self, table: &Table) -> Result<()> {
        self.tables
            .borrow_mut()
            .insert(table.kind(), table.clone());
        Ok(())
    }

    fn location(&self, kind: EntityKind) -> String {
        format!("memory:{kind}")
    }
}
