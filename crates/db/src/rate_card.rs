use std::time::Instant;

use billing_core::{PublicRate, RateCard, RecordShape};
use rusqlite::params;

use crate::Db;
use crate::error::Result;
use crate::helpers::{now_timestamp, row_to_rate_card};

impl Db {
    /// Latest observed unit cost per (tenant, SKU).
    ///
    /// Candidates are rows with positive quantity and positive cost; the most
    /// recent period wins and ties go to the highest cost. The discount is
    /// `100 - billed / list * 100` and stays NULL without a positive list
    /// price. Rows with no source list price at all fall back to a stored
    /// public pay-as-you-go price. Rows with no currency afterwards take the
    /// tenant's most recent currency.
    pub fn refresh_rate_card(&mut self, shape: &RecordShape, tenant: &str) -> Result<usize> {
        let roles = &shape.roles;
        let list_price = roles.list_unit_price.unwrap_or("NULL");
        let upsert = format!(
            r#"
            INSERT INTO {rate} (
              tenant_name, sku, description, currency, list_unit_price, billed_unit_cost,
              discount_calculated, last_update
            )
            SELECT tenant_name, sku, description, currency, list_unit_price, billed_unit_cost,
                   CASE
                     WHEN list_unit_price > 0
                       THEN ROUND(100 - billed_unit_cost / list_unit_price * 100, 1)
                   END,
                   ?2
            FROM (
              SELECT {tenant} AS tenant_name,
                     {sku} AS sku,
                     {description} AS description,
                     {currency} AS currency,
                     {list_price} AS list_unit_price,
                     ROUND({cost} / {quantity}, 5) AS billed_unit_cost,
                     ROW_NUMBER() OVER (
                       PARTITION BY {tenant}, {sku}
                       ORDER BY {period} DESC, {cost} DESC
                     ) AS rn
              FROM {raw}
              WHERE {tenant} = ?1
                AND {sku} IS NOT NULL
                AND {quantity} > 0
                AND {cost} > 0
            )
            WHERE rn = 1
            ON CONFLICT (tenant_name, sku) DO UPDATE SET
              description = excluded.description,
              currency = excluded.currency,
              list_unit_price = excluded.list_unit_price,
              billed_unit_cost = excluded.billed_unit_cost,
              discount_calculated = COALESCE(
                excluded.discount_calculated,
                CASE
                  WHEN excluded.list_unit_price IS NULL AND {rate}.rate_paygo_price > 0
                    THEN ROUND(100 - excluded.billed_unit_cost / {rate}.rate_paygo_price * 100, 1)
                END
              ),
              last_update = excluded.last_update
            "#,
            rate = shape.tables.rate_card,
            raw = shape.tables.raw,
            tenant = roles.tenant,
            sku = roles.sku,
            description = roles.description,
            currency = roles.currency,
            list_price = list_price,
            cost = roles.rate_cost,
            quantity = roles.rate_quantity,
            period = roles.period_start,
        );
        let backfill = format!(
            r#"
            UPDATE {rate}
            SET currency = (
              SELECT {currency}
              FROM {raw}
              WHERE {tenant} = ?1 AND {currency} IS NOT NULL
              ORDER BY {period} DESC
              LIMIT 1
            )
            WHERE tenant_name = ?1 AND currency IS NULL
            "#,
            rate = shape.tables.rate_card,
            raw = shape.tables.raw,
            tenant = roles.tenant,
            currency = roles.currency,
            period = roles.period_start,
        );

        let started = Instant::now();
        let tx = self.conn.transaction()?;
        let changed = tx.execute(&upsert, params![tenant, now_timestamp()])?;
        let backfilled = tx.execute(&backfill, params![tenant])?;
        tx.commit()?;
        log::debug!(
            "{} refreshed {} rows ({} currency backfills) in {}ms",
            shape.tables.rate_card,
            changed,
            backfilled,
            started.elapsed().as_millis()
        );
        Ok(changed)
    }

    pub fn list_rate_cards(&self, shape: &RecordShape, tenant: &str) -> Result<Vec<RateCard>> {
        let sql = format!(
            r#"
            SELECT tenant_name, sku, description, currency, list_unit_price, billed_unit_cost,
                   discount_calculated, last_update, rate_description, rate_paygo_price,
                   rate_update_date
            FROM {}
            WHERE tenant_name = ?1
            ORDER BY sku
            "#,
            shape.tables.rate_card
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![tenant], row_to_rate_card)?;
        let mut cards = Vec::new();
        for row in rows {
            cards.push(row?);
        }
        Ok(cards)
    }

    /// Distinct `(sku, currency)` pairs eligible for public price lookup.
    pub fn rate_card_skus(
        &self,
        shape: &RecordShape,
        tenant: &str,
    ) -> Result<Vec<(String, String)>> {
        let sql = format!(
            r#"
            SELECT DISTINCT sku, currency
            FROM {}
            WHERE tenant_name = ?1 AND currency IS NOT NULL
            ORDER BY sku, currency
            "#,
            shape.tables.rate_card
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![tenant], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row?);
        }
        Ok(pairs)
    }

    /// Stores a public pay-as-you-go price on an existing rate-card row. Never
    /// inserts. Rows without a source list price get their discount from the
    /// public price.
    pub fn apply_public_rate(
        &mut self,
        shape: &RecordShape,
        tenant: &str,
        sku: &str,
        currency: &str,
        rate: &PublicRate,
    ) -> Result<usize> {
        let sql = format!(
            r#"
            UPDATE {}
            SET rate_description = ?4,
                rate_paygo_price = ?5,
                rate_update_date = ?6,
                discount_calculated = CASE
                  WHEN list_unit_price IS NULL AND ?5 > 0
                    THEN ROUND(100 - billed_unit_cost / ?5 * 100, 1)
                  ELSE discount_calculated
                END
            WHERE tenant_name = ?1 AND sku = ?2 AND currency = ?3
            "#,
            shape.tables.rate_card
        );
        let updated = self.conn.execute(
            &sql,
            params![
                tenant,
                sku,
                currency,
                rate.description,
                rate.paygo_price,
                now_timestamp()
            ],
        )?;
        Ok(updated)
    }
}
