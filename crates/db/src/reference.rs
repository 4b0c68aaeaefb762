use std::time::Instant;

use billing_core::{Dimension, RecordShape, ReferenceValue, SpecialTagKeys};
use rusqlite::params;

use crate::Db;
use crate::error::Result;
use crate::helpers::{now_timestamp, row_to_reference};
use crate::migrations::TENANT_TABLE;

fn dimension_branch(shape: &RecordShape, dimension: &Dimension) -> String {
    let raw = shape.tables.raw;
    let tenant = shape.roles.tenant;
    match dimension {
        Dimension::Column { ref_type, column } => format!(
            "SELECT DISTINCT '{ref_type}' AS ref_type, {column} AS ref_name \
             FROM {raw} WHERE {tenant} = ?1"
        ),
        Dimension::TopLevelPath { ref_type, column } => format!(
            "SELECT DISTINCT '{ref_type}' AS ref_type, \
             CASE WHEN instr({column}, ' /') > 0 \
               THEN substr({column}, 1, instr({column}, ' /') - 1) \
               ELSE {column} END AS ref_name \
             FROM {raw} WHERE {tenant} = ?1"
        ),
        Dimension::SkuWithDescription { ref_type } => {
            let sku = shape.roles.sku;
            let description = shape.roles.description;
            format!(
                "SELECT '{ref_type}' AS ref_type, \
                 TRIM({sku} || ' ' || COALESCE(MIN({description}), '')) AS ref_name \
                 FROM {raw} WHERE {tenant} = ?1 AND {sku} IS NOT NULL GROUP BY {sku}"
            )
        }
    }
}

impl Db {
    /// Inserts every newly observed dimension value for the tenant.
    pub fn refresh_reference(&mut self, shape: &RecordShape, tenant: &str) -> Result<usize> {
        if shape.dimensions.is_empty() {
            return Ok(0);
        }
        let branches: Vec<String> = shape
            .dimensions
            .iter()
            .map(|dimension| dimension_branch(shape, dimension))
            .collect();
        let sql = format!(
            r#"
            INSERT OR IGNORE INTO {} (tenant_name, ref_type, ref_name)
            SELECT ?1, ref_type, ref_name
            FROM ({})
            WHERE ref_name IS NOT NULL AND ref_name <> ''
            "#,
            shape.tables.reference,
            branches.join("\nUNION ALL\n")
        );
        let started = Instant::now();
        let tx = self.conn.transaction()?;
        let inserted = tx.execute(&sql, params![tenant])?;
        tx.commit()?;
        log::debug!(
            "{} inserted {} values in {}ms",
            shape.tables.reference,
            inserted,
            started.elapsed().as_millis()
        );
        Ok(inserted)
    }

    /// Stores the configured special tag key names, one row per slot,
    /// overwriting whatever name the slot held before.
    pub fn upsert_special_tag_keys(
        &mut self,
        shape: &RecordShape,
        tenant: &str,
        keys: &SpecialTagKeys,
    ) -> Result<usize> {
        let update = format!(
            "UPDATE {} SET ref_name = ?3 WHERE tenant_name = ?1 AND ref_type = ?2",
            shape.tables.reference
        );
        let insert = format!(
            "INSERT INTO {} (tenant_name, ref_type, ref_name) VALUES (?1, ?2, ?3)",
            shape.tables.reference
        );
        let tx = self.conn.transaction()?;
        let mut written = 0usize;
        for (slot, key) in keys.iter() {
            let ref_type = shape.special_key_types[slot];
            let updated = tx.execute(&update, params![tenant, ref_type, key])?;
            if updated == 0 {
                tx.execute(&insert, params![tenant, ref_type, key])?;
            }
            written += 1;
        }
        tx.commit()?;
        Ok(written)
    }

    /// Adds tenant ids found in the reference table to the tenant registry.
    pub fn register_tenant_ids(&mut self, shape: &RecordShape, tenant: &str) -> Result<usize> {
        let Some(ref_type) = shape.tenant_id_ref_type else {
            return Ok(0);
        };
        let sql = format!(
            r#"
            INSERT OR IGNORE INTO {} (tenant_id, tenant_name, first_seen)
            SELECT ref_name, tenant_name, ?3
            FROM {}
            WHERE tenant_name = ?1 AND ref_type = ?2
            "#,
            TENANT_TABLE, shape.tables.reference
        );
        let inserted = self
            .conn
            .execute(&sql, params![tenant, ref_type, now_timestamp()])?;
        Ok(inserted)
    }

    pub fn list_reference(&self, shape: &RecordShape, tenant: &str) -> Result<Vec<ReferenceValue>> {
        let sql = format!(
            r#"
            SELECT tenant_name, ref_type, ref_name
            FROM {}
            WHERE tenant_name = ?1
            ORDER BY ref_type, ref_name
            "#,
            shape.tables.reference
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![tenant], row_to_reference)?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }
}
