use std::time::Instant;

use billing_core::{NormalizedRow, RecordShape, SqlKind};
use rusqlite::{Transaction, params, params_from_iter};

use crate::Db;
use crate::error::{DbError, Result};
use crate::helpers::raw_insert_sql;

/// One file's worth of raw-row inserts inside a single transaction.
///
/// Rows are buffered and flushed every `batch_size` rows through a cached
/// prepared statement. Nothing is visible until [`FileLoad::finish`] commits;
/// dropping an unfinished load rolls the whole file back.
pub struct FileLoad<'a> {
    tx: Transaction<'a>,
    insert_sql: String,
    tag_sql: String,
    tenant: String,
    numeric: Vec<(usize, &'static str)>,
    batch: Vec<NormalizedRow>,
    batch_size: usize,
    rows: usize,
}

impl Db {
    pub fn begin_file_load(
        &mut self,
        shape: &RecordShape,
        tenant: &str,
        batch_size: usize,
    ) -> Result<FileLoad<'_>> {
        let batch_size = batch_size.max(1);
        let tx = self.conn.transaction()?;
        Ok(FileLoad {
            tx,
            insert_sql: raw_insert_sql(shape),
            tag_sql: format!(
                "INSERT OR IGNORE INTO {} (tenant_name, tag_key) VALUES (?1, ?2)",
                shape.tables.tag_keys
            ),
            tenant: tenant.to_string(),
            numeric: shape
                .columns
                .iter()
                .enumerate()
                .filter(|(_, column)| column.kind == SqlKind::Number)
                .map(|(index, column)| (index, column.name))
                .collect(),
            batch: Vec::with_capacity(batch_size),
            batch_size,
            rows: 0,
        })
    }

    pub fn count_raw_rows(&self, shape: &RecordShape, tenant: &str) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1",
            shape.tables.raw, shape.roles.tenant
        );
        Ok(self.conn.query_row(&sql, params![tenant], |row| row.get(0))?)
    }

    pub fn list_tag_keys(&self, shape: &RecordShape, tenant: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT tag_key FROM {} WHERE tenant_name = ?1 ORDER BY tag_key",
            shape.tables.tag_keys
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![tenant], |row| row.get(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

impl<'a> FileLoad<'a> {
    /// Buffers one row. A numeric column holding anything but a decimal
    /// number fails the load.
    pub fn push(&mut self, row: NormalizedRow) -> Result<()> {
        for &(index, column) in &self.numeric {
            let value = row.values.get(index).map(String::as_str).unwrap_or_default();
            if !value.is_empty() && value.trim().parse::<f64>().is_err() {
                return Err(DbError::InvalidNumber {
                    column,
                    value: value.to_string(),
                });
            }
        }
        self.batch.push(row);
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Rows handed to the database so far, flushed or buffered.
    pub fn rows(&self) -> usize {
        self.rows + self.batch.len()
    }

    fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let started = Instant::now();
        let count = self.batch.len();
        let mut stmt = self.tx.prepare_cached(&self.insert_sql)?;
        for row in self.batch.drain(..) {
            stmt.execute(params_from_iter(row.values.iter()))?;
        }
        self.rows += count;
        log::debug!(
            "flushed {} rows ({} total) in {}ms",
            count,
            self.rows,
            started.elapsed().as_millis()
        );
        Ok(())
    }

    /// Flushes the tail batch, registers tag keys and commits. Returns the row count.
    pub fn finish<'k>(mut self, tag_keys: impl IntoIterator<Item = &'k str>) -> Result<usize> {
        self.flush()?;
        {
            let mut stmt = self.tx.prepare_cached(&self.tag_sql)?;
            for key in tag_keys {
                stmt.execute(params![self.tenant, key])?;
            }
        }
        let rows = self.rows;
        self.tx.commit()?;
        Ok(rows)
    }
}
