use billing_core::{COST_SHAPE, FOCUS_SHAPE};

mod support;

#[test]
fn watermark_is_empty_without_history() {
    let test_db = support::setup_db();
    assert_eq!(
        test_db
            .db
            .max_loaded_file_name(&COST_SHAPE, "acme")
            .expect("watermark"),
        ""
    );
}

#[test]
fn watermark_tracks_highest_file_name_per_tenant() {
    let mut test_db = support::setup_db();
    let db = &mut test_db.db;
    for name in [
        "reports/cost-csv/0002.csv.gz",
        "reports/cost-csv/0010.csv.gz",
        "reports/cost-csv/0003.csv.gz",
    ] {
        db.insert_load_status(&COST_SHAPE, &support::make_status("acme", name, 3))
            .expect("insert status");
    }
    db.insert_load_status(
        &COST_SHAPE,
        &support::make_status("other", "reports/cost-csv/0099.csv.gz", 1),
    )
    .expect("insert other tenant");

    assert_eq!(
        db.max_loaded_file_name(&COST_SHAPE, "acme").expect("watermark"),
        "reports/cost-csv/0010.csv.gz"
    );
    assert_eq!(db.count_load_status(&COST_SHAPE, "acme").expect("count"), 3);
    assert_eq!(
        db.max_loaded_file_name(&FOCUS_SHAPE, "acme").expect("focus watermark"),
        ""
    );

    let history = db
        .list_load_status(&COST_SHAPE, "acme", 2)
        .expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].file_name, "reports/cost-csv/0010.csv.gz");
    assert_eq!(history[0].num_rows, 3);
}
