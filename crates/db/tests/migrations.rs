use billing_core::{COST_SHAPE, FOCUS_SHAPE};
use billing_db::{Db, DbError};

mod support;

#[test]
fn migrate_is_idempotent_and_provisions_both_shapes() {
    let mut test_db = support::setup_db();
    test_db.db.migrate().expect("migrate again");
    test_db.db.check_schema(&COST_SHAPE).expect("cost schema");
    test_db.db.check_schema(&FOCUS_SHAPE).expect("focus schema");
}

#[test]
fn check_schema_lists_missing_tables() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db = Db::open(dir.path().join("empty.sqlite")).expect("open db");
    let err = db.check_schema(&COST_SHAPE).expect_err("schema missing");
    match err {
        DbError::MissingSchema(tables) => {
            assert!(tables.contains(&"oci_cost".to_string()));
            assert!(tables.contains(&"oci_tenant".to_string()));
            assert_eq!(tables.len(), 7);
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = db
        .check_schema(&FOCUS_SHAPE)
        .expect_err("schema missing")
        .to_string();
    assert!(message.contains("oci_focus_rate_card"));
    assert!(message.contains("init-db"));
}

#[test]
fn focus_raw_table_accepts_every_shape_column() {
    let mut test_db = support::setup_db();
    let row = support::make_row(
        &FOCUS_SHAPE,
        &[
            ("source_tenant_name", "acme"),
            ("source_file_id", "0001"),
            ("billed_cost", "1.5"),
        ],
    );
    support::load_rows(&mut test_db.db, &FOCUS_SHAPE, "acme", vec![row]);
    assert_eq!(
        test_db.db.count_raw_rows(&FOCUS_SHAPE, "acme").expect("count"),
        1
    );
}
