use billing_core::{
    CostStat, FileType, LoadStatus, RateCard, RecordShape, ReferenceValue, SqlKind,
};
use chrono::{SecondsFormat, Utc};
use rusqlite::Row;

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parameterized insert for every target column of the shape. Empty strings
/// bind as NULL and numeric columns are cast at the statement.
pub(crate) fn raw_insert_sql(shape: &RecordShape) -> String {
    let names: Vec<&str> = shape.columns.iter().map(|column| column.name).collect();
    let values: Vec<String> = shape
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| match column.kind {
            SqlKind::Text => format!("NULLIF(?{}, '')", index + 1),
            SqlKind::Number => format!("CAST(NULLIF(?{}, '') AS REAL)", index + 1),
        })
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        shape.tables.raw,
        names.join(", "),
        values.join(", ")
    )
}

pub(crate) fn row_to_load_status(
    row: &Row<'_>,
    fallback: FileType,
) -> std::result::Result<LoadStatus, rusqlite::Error> {
    let file_type: String = row.get(1)?;
    Ok(LoadStatus {
        tenant_name: row.get(0)?,
        file_type: FileType::parse(&file_type).unwrap_or(fallback),
        file_id: row.get(2)?,
        file_name: row.get(3)?,
        file_size_mb: row.get(4)?,
        file_date: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        num_rows: row.get(6)?,
        load_start: row.get(7)?,
        load_end: row.get(8)?,
        agent_version: row.get(9)?,
        batch_id: row.get(10)?,
        batch_total: row.get(11)?,
    })
}

pub(crate) fn row_to_cost_stat(row: &Row<'_>) -> std::result::Result<CostStat, rusqlite::Error> {
    Ok(CostStat {
        tenant_name: row.get(0)?,
        file_id: row.get(1)?,
        period_start: row.get(2)?,
        cost: row.get(3)?,
        cost_overage: row.get(4)?,
        currency: row.get(5)?,
        num_rows: row.get(6)?,
        update_date: row.get(7)?,
        agent_version: row.get(8)?,
    })
}

pub(crate) fn row_to_rate_card(row: &Row<'_>) -> std::result::Result<RateCard, rusqlite::Error> {
    Ok(RateCard {
        tenant_name: row.get(0)?,
        sku: row.get(1)?,
        description: row.get(2)?,
        currency: row.get(3)?,
        list_unit_price: row.get(4)?,
        billed_unit_cost: row.get(5)?,
        discount_calculated: row.get(6)?,
        last_update: row.get(7)?,
        rate_description: row.get(8)?,
        rate_paygo_price: row.get(9)?,
        rate_update_date: row.get(10)?,
    })
}

pub(crate) fn row_to_reference(
    row: &Row<'_>,
) -> std::result::Result<ReferenceValue, rusqlite::Error> {
    Ok(ReferenceValue {
        tenant_name: row.get(0)?,
        ref_type: row.get(1)?,
        ref_name: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use billing_core::COST_SHAPE;

    #[test]
    fn insert_sql_casts_numeric_columns() {
        let sql = raw_insert_sql(&COST_SHAPE);
        assert!(sql.starts_with("INSERT INTO oci_cost (tenant_name, file_id,"));
        assert!(sql.contains("NULLIF(?1, '')"));
        assert!(sql.contains("CAST(NULLIF(?12, '') AS REAL)"));
        assert!(sql.ends_with("NULLIF(?32, ''))"));
    }
}
