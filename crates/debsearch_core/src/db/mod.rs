//! SQLite storage bootstrap.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the ingest pipelines.
//! - Verify the FTS5 module is available before any table is touched.
//!
//! # Invariants
//! - Connections are owned by the caller and released on drop; core keeps no
//!   process-wide connection.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The linked SQLite library was built without FTS5.
    FtsUnavailable,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::FtsUnavailable => write!(f, "sqlite was built without the fts5 module"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::FtsUnavailable => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
