#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;

use billing_core::{PublicRate, RecordShape, SourceFile};
use billing_db::Db;
use flate2::Compression;
use flate2::write::GzEncoder;
use ingest::{LookupError, ObjectStore, PriceLookup, RunContext, SourceError};
use tempfile::TempDir;

pub struct TestEnv {
    pub dir: TempDir,
    pub db: Db,
    pub db_path: PathBuf,
    pub work_dir: PathBuf,
}

pub fn setup_env() -> TestEnv {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("billing.sqlite");
    let mut db = Db::open(&db_path).expect("open db");
    db.migrate().expect("migrate db");
    let work_dir = dir.path().join("work");
    TestEnv {
        dir,
        db,
        db_path,
        work_dir,
    }
}

pub fn context(env: &TestEnv, tenant: &str, shape: &'static RecordShape) -> RunContext {
    let mut ctx = RunContext::new(tenant, shape, env.work_dir.clone());
    ctx.batch_size = 2;
    ctx.agent_version = "test".to_string();
    ctx
}

pub fn scratch_files(env: &TestEnv) -> usize {
    match std::fs::read_dir(&env.work_dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

/// Bucket held in memory; records every `start_after` it was listed with.
#[derive(Default)]
pub struct MemoryBucket {
    objects: BTreeMap<String, (Vec<u8>, String)>,
    pub listed_after: RefCell<Vec<String>>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, name: &str, bytes: Vec<u8>, created: &str) {
        self.objects
            .insert(name.to_string(), (bytes, created.to_string()));
    }
}

impl ObjectStore for MemoryBucket {
    fn list_objects(
        &self,
        prefix: &str,
        start_after: &str,
    ) -> Result<Vec<SourceFile>, SourceError> {
        self.listed_after.borrow_mut().push(start_after.to_string());
        Ok(self
            .objects
            .iter()
            .filter(|(name, _)| name.starts_with(prefix) && name.as_str() > start_after)
            .map(|(name, (bytes, created))| SourceFile {
                name: name.clone(),
                size: bytes.len() as u64,
                time_created: created.clone(),
            })
            .collect())
    }

    fn fetch(&self, name: &str) -> Result<Box<dyn Read + '_>, SourceError> {
        let (bytes, _) = self
            .objects
            .get(name)
            .ok_or_else(|| format!("no such object: {}", name))?;
        Ok(Box::new(Cursor::new(bytes.clone())))
    }
}

pub enum PriceAnswer {
    Price(f64),
    Missing,
    Fail,
    Down,
}

/// Price list keyed by SKU; counts lookups.
#[derive(Default)]
pub struct FakePrices {
    answers: HashMap<String, PriceAnswer>,
    pub calls: RefCell<Vec<String>>,
}

impl FakePrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, sku: &str, answer: PriceAnswer) -> Self {
        self.answers.insert(sku.to_string(), answer);
        self
    }
}

impl PriceLookup for FakePrices {
    fn lookup(&self, sku: &str, _currency: &str) -> Result<Option<PublicRate>, LookupError> {
        self.calls.borrow_mut().push(sku.to_string());
        match self.answers.get(sku) {
            Some(PriceAnswer::Price(price)) => Ok(Some(PublicRate {
                description: Some(format!("{} public", sku)),
                paygo_price: *price,
            })),
            Some(PriceAnswer::Missing) | None => Ok(None),
            Some(PriceAnswer::Fail) => Err(LookupError::Failed("bad response".to_string())),
            Some(PriceAnswer::Down) => {
                Err(LookupError::Unreachable("connection refused".to_string()))
            }
        }
    }
}

pub fn csv_bytes(header: &[&str], rows: &[Vec<&str>]) -> Vec<u8> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header).expect("write header");
    for row in rows {
        writer.write_record(row).expect("write row");
    }
    writer.into_inner().expect("csv bytes")
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

pub const COST_HEADER: &[&str] = &[
    "lineItem/intervalUsageStart",
    "lineItem/tenantId",
    "product/service",
    "product/compartmentId",
    "cost/productSku",
    "product/Description",
    "usage/billedQuantity",
    "cost/myCost",
    "cost/currencyCode",
    "tags/Owner",
];

/// `(period, sku, quantity, cost)` rows in the detailed cost layout.
pub fn cost_file(rows: &[(&str, &str, &str, &str)]) -> Vec<u8> {
    let rows: Vec<Vec<&str>> = rows
        .iter()
        .map(|(period, sku, quantity, cost)| {
            vec![
                *period,
                "ocid1.tenancy.oc1..aaaaabc123",
                "COMPUTE",
                "ocid1.compartment.a",
                *sku,
                "Compute",
                *quantity,
                *cost,
                "USD",
                "oracleidentitycloudservice/jane",
            ]
        })
        .collect();
    gzip(&csv_bytes(COST_HEADER, &rows))
}
