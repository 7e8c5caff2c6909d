//! SQLite store access for the registry.
//!
//! # Responsibility
//! - Open the registry store file, configured for cascading deletes.
//! - Create and evolve the `holders`/`dependents` schema via migrations.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - Only the migrating openers may create the store file or its schema.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_connection, open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or preparing the store.
#[derive(Debug)]
pub enum DbError {
    /// SQLite refused to open, configure or migrate the store.
    Sqlite(rusqlite::Error),
    /// The store was written by a newer build.
    ///
    /// `initialize_schema` reports this instead of touching the file, so an
    /// older binary never downgrades or partially rewrites person tables it
    /// does not understand.
    UnsupportedSchemaVersion { store_version: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::UnsupportedSchemaVersion {
                store_version,
                supported,
            } => write!(
                f,
                "registry store uses schema version {store_version}; this build supports up to {supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
