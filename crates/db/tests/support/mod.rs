#![allow(dead_code)]

use std::path::PathBuf;

use billing_core::{COST_SHAPE, FileType, LoadStatus, NormalizedRow, RecordShape};
use billing_db::Db;
use tempfile::TempDir;

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.migrate().expect("migrate db");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

pub fn make_row(shape: &RecordShape, values: &[(&str, &str)]) -> NormalizedRow {
    let mut row = NormalizedRow {
        values: vec![String::new(); shape.columns.len()],
    };
    for (name, value) in values {
        let index = shape.column_index(name).expect("known column");
        row.values[index] = value.to_string();
    }
    row
}

pub fn cost_row(
    tenant: &str,
    file_id: &str,
    period: &str,
    sku: &str,
    quantity: &str,
    cost: &str,
) -> NormalizedRow {
    make_row(
        &COST_SHAPE,
        &[
            ("tenant_name", tenant),
            ("file_id", file_id),
            ("usage_interval_start", period),
            ("cost_product_sku", sku),
            ("prd_description", "Compute"),
            ("usg_billed_quantity", quantity),
            ("cost_my_cost", cost),
            ("cost_currency_code", "USD"),
        ],
    )
}

pub fn load_rows(db: &mut Db, shape: &RecordShape, tenant: &str, rows: Vec<NormalizedRow>) {
    let mut load = db
        .begin_file_load(shape, tenant, 2)
        .expect("begin file load");
    for row in rows {
        load.push(row).expect("push row");
    }
    load.finish(std::iter::empty::<&str>()).expect("finish load");
}

pub fn make_status(tenant: &str, file_name: &str, num_rows: i64) -> LoadStatus {
    LoadStatus {
        tenant_name: tenant.to_string(),
        file_type: FileType::Cost,
        file_id: file_name.trim_end_matches(".csv.gz").to_string(),
        file_name: file_name.to_string(),
        file_size_mb: 1,
        file_date: "2024-01-01 00:00".to_string(),
        num_rows,
        load_start: "2024-01-01T00:00:00Z".to_string(),
        load_end: "2024-01-01T00:00:05Z".to_string(),
        agent_version: "test".to_string(),
        batch_id: 1,
        batch_total: 1,
    }
}
