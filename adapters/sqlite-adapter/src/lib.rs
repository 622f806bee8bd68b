//! sqlite-adapter — SQLite implementation of the UserStore port.
//!
//! Purpose
//! - Provide a file-based data-access object for stored user rows.
//! - Implements the `UserStore` trait from the `domain` crate.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Every value is bound as a positional parameter. Table names cannot be
//!   bound, so they are checked against a plain identifier pattern first.
//! - Upserts use `ON CONFLICT(id) DO UPDATE`, which keeps the rowid of the
//!   existing row; reads order by rowid, i.e. first insertion order.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use domain::validate::validate_table_name;
use domain::{CoreError, StoredUser, TableSchema, UserId, UserStore, USERS_TABLE};
use rusqlite::{params, Connection};
use tracing::{debug, warn};

/// Default database file, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "api.sqlite3";

/// SQLite-backed user store. The connection is released on `close()` or when
/// the store is dropped, whichever comes first.
pub struct SqliteUserStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteUserStore {
    /// Open (or create) a SQLite database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| CoreError::Storage(format!("create {}: {e}", dir.display())))?;
        }
        let conn = Connection::open(path).map_err(map_sqerr)?;
        debug!(path = %path.display(), "sqlite store opened");
        Ok(Self::from_connection(conn))
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        Ok(Self::from_connection(
            Connection::open_in_memory().map_err(map_sqerr)?,
        ))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))
    }
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Storage(format!("sqlite error: {e}"))
}

fn open_conn(guard: &Option<Connection>) -> Result<&Connection, CoreError> {
    guard
        .as_ref()
        .ok_or_else(|| CoreError::Storage("connection closed".into()))
}

fn row_to_user(row: &rusqlite::Row) -> Result<StoredUser, CoreError> {
    let id: String = row.get(0).map_err(map_sqerr)?;
    let name: String = row.get(1).map_err(map_sqerr)?;
    let age: i64 = row.get(2).map_err(map_sqerr)?;
    let gender: Option<String> = row.get(3).map_err(map_sqerr)?;
    let address: Option<String> = row.get(4).map_err(map_sqerr)?;
    let email: Option<String> = row.get(5).map_err(map_sqerr)?;
    let phone_number: Option<String> = row.get(6).map_err(map_sqerr)?;

    let id = UserId::new(id).map_err(|e| CoreError::Storage(format!("bad id in db: {e}")))?;
    let age = u32::try_from(age).map_err(|_| CoreError::Storage(format!("bad age in db: {age}")))?;
    Ok(StoredUser {
        id,
        name,
        age,
        gender,
        address: address.unwrap_or_default(),
        email,
        phone_number,
    })
}

impl UserStore for SqliteUserStore {
    fn create_table(&self, schema: &TableSchema) -> Result<(), CoreError> {
        validate_table_name(&schema.name)?;
        let guard = self.lock()?;
        let conn = open_conn(&guard)?;
        conn.execute_batch(&schema.create_sql()).map_err(map_sqerr)?;
        debug!(table = %schema.name, "table ready");
        Ok(())
    }

    fn upsert(&self, table: &str, row: &StoredUser) -> Result<(), CoreError> {
        validate_table_name(table)?;
        let guard = self.lock()?;
        let conn = open_conn(&guard)?;
        let sql = format!(
            "INSERT INTO {table} (id, name, age, gender, address, email, phone_number)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                age = excluded.age,
                gender = excluded.gender,
                address = excluded.address,
                email = excluded.email,
                phone_number = excluded.phone_number"
        );
        conn.execute(
            &sql,
            params![
                row.id.as_str(),
                row.name,
                i64::from(row.age),
                row.gender,
                row.address,
                row.email,
                row.phone_number,
            ],
        )
        .map_err(map_sqerr)?;
        Ok(())
    }

    fn select_all(&self, limit: Option<usize>) -> Result<Vec<StoredUser>, CoreError> {
        let guard = self.lock()?;
        let conn = open_conn(&guard)?;
        // LIMIT -1 means no limit in SQLite.
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, name, age, gender, address, email, phone_number
                 FROM {USERS_TABLE} ORDER BY rowid LIMIT ?1"
            ))
            .map_err(map_sqerr)?;
        let mut rows = stmt.query(params![limit]).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(row_to_user(row)?);
        }
        Ok(out)
    }

    fn close(&self) -> Result<(), CoreError> {
        let mut guard = self.lock()?;
        match guard.take() {
            Some(conn) => conn.close().map_err(|(_, e)| {
                warn!(err = %e, "sqlite close failed");
                map_sqerr(e)
            }),
            None => Ok(()),
        }
    }
}
