use std::path::Path;

use rusqlite::Connection;

mod error;
mod helpers;
mod load_status;
mod migrations;
mod rate_card;
mod raw_rows;
mod reference;
mod stats;

pub use error::{DbError, Result};
pub use migrations::TENANT_TABLE;
pub use raw_rows::FileLoad;

/// Warehouse connection. Single owner, used sequentially for one run.
pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.pragma_update(None, "cache_size", -20_000)?;
        Ok(Self { conn })
    }
}
