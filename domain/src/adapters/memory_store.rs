use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::validate::validate_table_name;
use crate::{CoreError, StoredUser, TableSchema, UserStore, USERS_TABLE};

/// In-memory `UserStore` for tests and demos. Each table keeps its rows in
/// insertion order; an upsert of a known id replaces the row where it stands.
pub struct MemoryUserStore {
    inner: Mutex<Option<BTreeMap<String, Vec<StoredUser>>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Some(BTreeMap::new())),
        }
    }

    fn with_tables<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, Vec<StoredUser>>) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))?;
        match guard.as_mut() {
            Some(tables) => f(tables),
            None => Err(CoreError::Storage("connection closed".into())),
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore for MemoryUserStore {
    fn create_table(&self, schema: &TableSchema) -> Result<(), CoreError> {
        validate_table_name(&schema.name)?;
        self.with_tables(|tables| {
            tables.entry(schema.name.clone()).or_default();
            Ok(())
        })
    }

    fn upsert(&self, table: &str, row: &StoredUser) -> Result<(), CoreError> {
        validate_table_name(table)?;
        self.with_tables(|tables| {
            let rows = tables
                .get_mut(table)
                .ok_or_else(|| CoreError::Storage(format!("no such table: {}", table)))?;
            match rows.iter_mut().find(|r| r.id == row.id) {
                Some(existing) => *existing = row.clone(),
                None => rows.push(row.clone()),
            }
            Ok(())
        })
    }

    fn select_all(&self, limit: Option<usize>) -> Result<Vec<StoredUser>, CoreError> {
        self.with_tables(|tables| {
            let rows = tables
                .get(USERS_TABLE)
                .ok_or_else(|| CoreError::Storage(format!("no such table: {}", USERS_TABLE)))?;
            Ok(rows
                .iter()
                .take(limit.unwrap_or(usize::MAX))
                .cloned()
                .collect())
        })
    }

    fn close(&self) -> Result<(), CoreError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))?;
        guard.take();
        Ok(())
    }
}
