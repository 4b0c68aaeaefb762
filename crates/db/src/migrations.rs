use billing_core::RecordShape;
use rusqlite::{Connection, params};

use crate::Db;
use crate::error::{DbError, Result};

const MIGRATION_0001: &str = include_str!("../migrations/0001_cost.sql");
const MIGRATION_0002: &str = include_str!("../migrations/0002_focus.sql");

const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_cost", MIGRATION_0001),
    ("0002_focus", MIGRATION_0002),
];

/// Registry of tenant ids seen in the detailed cost lineage.
pub const TENANT_TABLE: &str = "oci_tenant";

impl Db {
    pub fn migrate(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (name, sql) in MIGRATIONS {
            log::debug!("applying migration {}", name);
            tx.execute_batch(sql)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Tables the shape needs that do not exist yet.
    pub fn missing_tables(&self, shape: &RecordShape) -> Result<Vec<String>> {
        let mut required: Vec<&str> = shape.tables.all().to_vec();
        if shape.tenant_id_ref_type.is_some() {
            required.push(TENANT_TABLE);
        }
        let mut missing = Vec::new();
        for table in required {
            if !table_exists(&self.conn, table)? {
                missing.push(table.to_string());
            }
        }
        Ok(missing)
    }

    /// Fails with [`DbError::MissingSchema`] before any data is touched.
    pub fn check_schema(&self, shape: &RecordShape) -> Result<()> {
        let missing = self.missing_tables(shape)?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DbError::MissingSchema(missing))
        }
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
