use billing_core::{LoadStatus, RecordShape};
use rusqlite::params;

use crate::Db;
use crate::error::Result;
use crate::helpers::row_to_load_status;

impl Db {
    /// Resume watermark: highest file name recorded for the tenant, empty if none.
    pub fn max_loaded_file_name(&self, shape: &RecordShape, tenant: &str) -> Result<String> {
        let sql = format!(
            "SELECT COALESCE(MAX(file_name), '') FROM {} WHERE tenant_name = ?1",
            shape.tables.load_status
        );
        let name: String = self.conn.query_row(&sql, params![tenant], |row| row.get(0))?;
        Ok(name)
    }

    pub fn insert_load_status(&mut self, shape: &RecordShape, status: &LoadStatus) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO {} (
              tenant_name, file_type, file_id, file_name, file_size, file_date, num_rows,
              load_start_time, load_end_time, agent_version, batch_id, batch_total
            ) VALUES (
              ?1, ?2, ?3, ?4, ?5, NULLIF(?6, ''), ?7, ?8, ?9, ?10, ?11, ?12
            )
            "#,
            shape.tables.load_status
        );
        self.conn.execute(
            &sql,
            params![
                status.tenant_name,
                status.file_type.as_str(),
                status.file_id,
                status.file_name,
                status.file_size_mb,
                status.file_date,
                status.num_rows,
                status.load_start,
                status.load_end,
                status.agent_version,
                status.batch_id,
                status.batch_total,
            ],
        )?;
        Ok(())
    }

    /// Load history for a tenant, most recent file first.
    pub fn list_load_status(
        &self,
        shape: &RecordShape,
        tenant: &str,
        limit: usize,
    ) -> Result<Vec<LoadStatus>> {
        let sql = format!(
            r#"
            SELECT tenant_name, file_type, file_id, file_name, file_size, file_date, num_rows,
                   load_start_time, load_end_time, agent_version, batch_id, batch_total
            FROM {}
            WHERE tenant_name = ?1
            ORDER BY file_name DESC, id DESC
            LIMIT ?2
            "#,
            shape.tables.load_status
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![tenant, limit as i64], |row| {
            row_to_load_status(row, shape.file_type)
        })?;
        let mut statuses = Vec::new();
        for row in rows {
            statuses.push(row?);
        }
        Ok(statuses)
    }

    pub fn count_load_status(&self, shape: &RecordShape, tenant: &str) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE tenant_name = ?1",
            shape.tables.load_status
        );
        Ok(self.conn.query_row(&sql, params![tenant], |row| row.get(0))?)
    }
}
