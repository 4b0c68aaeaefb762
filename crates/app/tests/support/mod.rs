#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use billing_app::{AppState, load_config};
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

pub const COST_OBJECT: &str = "reports/cost-csv/2024-01-01-0001.csv.gz";

pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
}

impl TestApp {
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn put_object(&self, name: &str, csv: &str) {
        let path = self.path("bucket").join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create bucket dirs");
        }
        fs::write(path, gzip(csv.as_bytes())).expect("write object");
    }
}

/// Writes a config file pointing at a local bucket inside a temp dir and
/// loads it back.
pub fn setup_app() -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::create_dir_all(dir.path().join("bucket")).expect("create bucket");
    fs::write(
        dir.path().join("compartments.json"),
        r#"[
            {"id": "c1", "compartment-id": "ocid1.tenancy.root", "name": "Finance", "lifecycle-state": "ACTIVE"},
            {"id": "c2", "compartment-id": "c1", "name": "Payroll", "lifecycle-state": "ACTIVE"}
        ]"#,
    )
    .expect("write compartments");

    let config_path = dir.path().join("loader.toml");
    fs::write(&config_path, config_text(dir.path())).expect("write config");
    let config = load_config(&config_path).expect("load config");
    TestApp {
        dir,
        state: AppState::new(config),
    }
}

fn config_text(root: &Path) -> String {
    format!(
        r#"
database = {database:?}
tenant_name = "acme"
tenant_id = "ocid1.tenancy.root"
work_dir = {work:?}
batch_size = 2
compartments_file = {compartments:?}
special_tag_keys = ["Owner"]

[bucket]
kind = "local"
path = {bucket:?}

[public_rates]
enabled = false
"#,
        database = root.join("billing.sqlite").display().to_string(),
        work = root.join("work").display().to_string(),
        compartments = root.join("compartments.json").display().to_string(),
        bucket = root.join("bucket").display().to_string(),
    )
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

pub fn cost_csv() -> String {
    [
        "lineItem/intervalUsageStart,lineItem/tenantId,product/compartmentId,cost/productSku,product/Description,usage/billedQuantity,cost/myCost,cost/currencyCode,tags/Owner",
        "2024-01-01T00:00:00Z,ocid1.tenancy.oc1..xyz789,c2,B1,Compute,10,100,USD,oracleidentitycloudservice/jane",
        "2024-01-01T01:00:00Z,ocid1.tenancy.oc1..xyz789,c2,B1,Compute,5,40,USD,oracleidentitycloudservice/jane",
        "2024-01-01T00:00:00Z,ocid1.tenancy.oc1..xyz789,c1,B2,Storage,0,0,USD,",
    ]
    .join("\n")
}
