use std::time::Instant;

use billing_core::{CostStat, RecordShape};
use rusqlite::params;

use crate::Db;
use crate::error::Result;
use crate::helpers::{now_timestamp, row_to_cost_stat};

impl Db {
    /// Recomputes per (tenant, file, period) aggregates from all raw rows of
    /// the tenant. A stored aggregate is rewritten only when its row count
    /// differs. Returns the number of inserted or rewritten rows.
    pub fn refresh_stats(
        &mut self,
        shape: &RecordShape,
        tenant: &str,
        agent_version: &str,
    ) -> Result<usize> {
        let roles = &shape.roles;
        let overage = roles
            .stats_cost_overage
            .map(|column| format!("SUM({})", column))
            .unwrap_or_else(|| "NULL".to_string());
        let sql = format!(
            r#"
            INSERT INTO {stats} (
              tenant_name, file_id, period_start, cost, cost_overage, currency, num_rows,
              update_date, agent_version
            )
            SELECT {tenant}, {file_id}, COALESCE({period}, ''), SUM({cost}), {overage},
                   MIN({currency}), COUNT(*), ?2, ?3
            FROM {raw}
            WHERE {tenant} = ?1
            GROUP BY {tenant}, {file_id}, COALESCE({period}, '')
            ON CONFLICT (tenant_name, file_id, period_start) DO UPDATE SET
              cost = excluded.cost,
              cost_overage = excluded.cost_overage,
              currency = excluded.currency,
              num_rows = excluded.num_rows,
              update_date = excluded.update_date,
              agent_version = excluded.agent_version
            WHERE {stats}.num_rows <> excluded.num_rows
            "#,
            stats = shape.tables.stats,
            raw = shape.tables.raw,
            tenant = roles.tenant,
            file_id = roles.file_id,
            period = roles.period_start,
            cost = roles.stats_cost,
            overage = overage,
            currency = roles.currency,
        );
        let started = Instant::now();
        let tx = self.conn.transaction()?;
        let changed = tx.execute(&sql, params![tenant, now_timestamp(), agent_version])?;
        tx.commit()?;
        log::debug!(
            "{} refreshed {} rows in {}ms",
            shape.tables.stats,
            changed,
            started.elapsed().as_millis()
        );
        Ok(changed)
    }

    pub fn list_stats(&self, shape: &RecordShape, tenant: &str) -> Result<Vec<CostStat>> {
        let sql = format!(
            r#"
            SELECT tenant_name, file_id, period_start, cost, cost_overage, currency, num_rows,
                   update_date, agent_version
            FROM {}
            WHERE tenant_name = ?1
            ORDER BY file_id, period_start
            "#,
            shape.tables.stats
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![tenant], row_to_cost_stat)?;
        let mut stats = Vec::new();
        for row in rows {
            stats.push(row?);
        }
        Ok(stats)
    }
}
