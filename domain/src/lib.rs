//! Domain library for the user sync workspace.
//!
//! This crate holds the domain types, ports (traits), and error definitions.
//! Its only dependencies are serde and serde_json for the user payload shape.
//! Keep adapters and IO concerns out of this crate.

use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Table the data-access layer reads back from.
pub const USERS_TABLE: &str = "users";

/// Address of a user. Sources disagree on the shape: the mock source produces
/// plain text, the HTTP source hands back a nested object we keep opaque.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Text(String),
    Structured(serde_json::Value),
}

impl Address {
    /// Text form used at the persistence boundary. Structured values are
    /// stored as compact JSON.
    pub fn to_storage_text(&self) -> String {
        match self {
            Address::Text(s) => s.clone(),
            Address::Structured(v) => v.to_string(),
        }
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address::Text(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address::Text(s)
    }
}

impl From<serde_json::Value> for Address {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::String(s) => Address::Text(s),
            serde_json::Value::Null => Address::Text(String::new()),
            other => Address::Structured(other),
        }
    }
}

/// A user as returned by any `UserPort`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub age: u32,
    pub address: Address,
}

/// Primary key of a stored row.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.trim().is_empty() {
            return Err(CoreError::InvalidArgument("user id must not be empty".into()));
        }
        Ok(Self(val))
    }

    /// Id assigned to the `index`-th user fetched from `source`.
    pub fn for_source(source: SourceKind, index: usize) -> Self {
        Self(format!("{}-{}", source.as_str(), index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted user row. Superset of `User`; gender, email and phone number are
/// never supplied by the fetch sources and stay `None` unless set explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: UserId,
    pub name: String,
    pub age: u32,
    pub gender: Option<String>,
    pub address: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl StoredUser {
    /// Map a fetched user onto the stored shape.
    pub fn from_fetched(id: UserId, user: &User) -> Self {
        Self {
            id,
            name: user.name.clone(),
            age: user.age,
            gender: None,
            address: user.address.to_storage_text(),
            email: None,
            phone_number: None,
        }
    }
}

impl Display for StoredUser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
        write!(
            f,
            "{} | {} | {} | {} | {} | {} | {}",
            self.id,
            self.name,
            self.age,
            opt(&self.gender),
            self.address,
            opt(&self.email),
            opt(&self.phone_number)
        )
    }
}

/// Column of the users table. The set is closed; DDL is generated from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Id,
    Name,
    Age,
    Gender,
    Address,
    Email,
    PhoneNumber,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Id,
        Column::Name,
        Column::Age,
        Column::Gender,
        Column::Address,
        Column::Email,
        Column::PhoneNumber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Name => "name",
            Column::Age => "age",
            Column::Gender => "gender",
            Column::Address => "address",
            Column::Email => "email",
            Column::PhoneNumber => "phone_number",
        }
    }

    /// SQL type and constraints for the column definition.
    pub fn sql_decl(&self) -> &'static str {
        match self {
            Column::Id => "TEXT PRIMARY KEY",
            Column::Name => "TEXT NOT NULL",
            Column::Age => "INTEGER NOT NULL",
            Column::Gender | Column::Address | Column::Email | Column::PhoneNumber => "TEXT",
        }
    }
}

/// Table definition handed to `UserStore::create_table`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
}

impl TableSchema {
    pub fn new<S: Into<String>>(name: S) -> Result<Self, CoreError> {
        let name = name.into();
        validate::validate_table_name(&name)?;
        Ok(Self { name })
    }

    /// The default `users` table.
    pub fn users() -> Self {
        Self {
            name: USERS_TABLE.to_string(),
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        &Column::ALL
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table.
    pub fn create_sql(&self) -> String {
        let cols: Vec<String> = self
            .columns()
            .iter()
            .map(|c| format!("{} {}", c.as_str(), c.sql_decl()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name,
            cols.join(", ")
        )
    }
}

/// Which `UserPort` implementation to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// Deterministic mock users.
    Internal,
    /// Third-party HTTP user listing.
    External,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Internal => "internal",
            SourceKind::External => "external",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.trim().to_lowercase().as_str() {
            "internal" => Ok(SourceKind::Internal),
            "external" => Ok(SourceKind::External),
            _ => Err(CoreError::InvalidArgument(format!(
                "unknown user source '{}' (expected 'internal' or 'external')",
                s
            ))),
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port for retrieving a batch of users from some source.
pub trait UserPort: Send + Sync {
    fn fetch(&self, count: i64) -> Result<Vec<User>, CoreError>;
}

impl<P: UserPort + ?Sized> UserPort for Box<P> {
    fn fetch(&self, count: i64) -> Result<Vec<User>, CoreError> {
        (**self).fetch(count)
    }
}

/// Repository port for persisting and loading stored user rows.
pub trait UserStore: Send + Sync {
    /// Create the table if it does not exist yet.
    fn create_table(&self, schema: &TableSchema) -> Result<(), CoreError>;
    /// Insert a row, or update the row with the same id in place.
    fn upsert(&self, table: &str, row: &StoredUser) -> Result<(), CoreError>;
    /// Rows of the `users` table in insertion order, at most `limit` when given.
    fn select_all(&self, limit: Option<usize>) -> Result<Vec<StoredUser>, CoreError>;
    /// Release the underlying resources. Calling it again is a no-op.
    fn close(&self) -> Result<(), CoreError>;
}

/// Core domain errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    InvalidArgument(String),
    RequestFailed {
        status: Option<u16>,
        message: String,
    },
    Storage(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            CoreError::RequestFailed {
                status: Some(code),
                message,
            } => write!(f, "request failed with status {}: {}", code, message),
            CoreError::RequestFailed {
                status: None,
                message,
            } => write!(f, "request failed: {}", message),
            CoreError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl Error for CoreError {}

pub mod adapters;
pub mod service;
pub mod validate;
