use std::path::Path;
use std::time::Duration;

use billing_core::{CompartmentPaths, FileDateRule, LoadStatus, RecordShape};
use billing_db::Db;
use chrono::NaiveDate;
use ingest::{
    CompartmentSource, FileFilters, IngestError, ObjectStore, PriceLookup, RunContext, RunReport,
    SecretSource,
};
use serde::Serialize;

use crate::bucket::{LocalBucket, ParBucket};
use crate::compartments::JsonCompartments;
use crate::config::{BucketKind, LoaderConfig, RunOverrides};
use crate::error::{AppError, Result};
use crate::public_rates::PublicRateClient;
use crate::secrets::LocalSecrets;

const BUCKET_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const CHECK_SKU: &str = "B90000";
const CHECK_CURRENCY: &str = "USD";

/// One line of the connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckItem {
    pub name: String,
    pub ok: bool,
    /// A failure here is reported but does not fail the check.
    pub warning_only: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub items: Vec<CheckItem>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.items.iter().all(|item| item.ok || item.warning_only)
    }

    fn push(&mut self, name: &str, warning_only: bool, outcome: Result<String>) {
        let (ok, detail) = match outcome {
            Ok(detail) => (true, detail),
            Err(err) => (false, err.to_string()),
        };
        self.items.push(CheckItem {
            name: name.to_string(),
            ok,
            warning_only,
            detail,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub tenant: String,
    pub file_type: String,
    pub watermark: String,
    pub files_loaded: i64,
    pub raw_rows: i64,
    pub rate_cards: usize,
    pub recent: Vec<LoadStatus>,
}

/// Loader settings plus the operations the command line exposes.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: LoaderConfig,
}

impl AppState {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn open_db(&self) -> Result<Db> {
        Ok(Db::open(&self.config.database)?)
    }

    /// Creates every table for both report types.
    pub fn setup_db(&self) -> Result<()> {
        setup_db(&self.config.database)
    }

    /// Builds the per-run context from settings and flags.
    pub fn run_context(&self, overrides: &RunOverrides) -> Result<RunContext> {
        let config = self.effective_config(overrides);
        let shape = config.shape()?;
        let tenant = config.require_tenant()?.to_string();
        let min_date = overrides
            .min_date
            .as_deref()
            .map(|value| min_date_bound(value, shape))
            .transpose()?;

        let mut ctx = RunContext::new(tenant, shape, config.work_dir.clone());
        ctx.filters = FileFilters {
            file: overrides.file.clone(),
            min_date,
        };
        ctx.special_tags = config.special_tags();
        ctx.compartments = compartment_paths(&config)?;
        ctx.batch_size = config.batch_size;
        ctx.force_refresh = overrides.force;
        ctx.skip_rates = !config.public_rates.enabled;
        Ok(ctx)
    }

    /// Full load for one tenant and report type.
    pub fn run_load(&self, overrides: &RunOverrides) -> Result<RunReport> {
        let config = self.effective_config(overrides);
        let ctx = self.run_context(overrides)?;
        let mut db = Db::open(&config.database)?;
        let store = open_bucket(&config)?;
        let prices = if ctx.skip_rates {
            None
        } else {
            Some(PublicRateClient::new(&config.public_rates)?)
        };
        let prices = prices.as_ref().map(|client| client as &dyn PriceLookup);

        log::info!(
            "loading {} files for {} into {}",
            ctx.shape.file_type.as_str(),
            ctx.tenant,
            config.database.display()
        );
        Ok(ingest::run(&mut db, store.as_ref(), prices, &ctx)?)
    }

    /// Checks the database schema, the bucket, the compartment export and
    /// the public price list.
    pub fn check(&self, overrides: &RunOverrides) -> Result<CheckReport> {
        let config = self.effective_config(overrides);
        let shape = config.shape()?;
        let mut report = CheckReport::default();

        report.push("database", false, check_database(&config.database, shape));
        report.push(
            "bucket",
            false,
            open_bucket(&config).and_then(|store| {
                let files = store
                    .list_objects(shape.prefix, "")
                    .map_err(|err| IngestError::external(format!("list {}", shape.prefix), err))?;
                Ok(format!("{} objects under {}", files.len(), shape.prefix))
            }),
        );
        if config.compartments_file.is_some() {
            report.push(
                "compartments",
                false,
                compartment_paths(&config)
                    .map(|paths| format!("{} compartment paths", paths.len())),
            );
        }
        if config.public_rates.enabled {
            report.push(
                "public rates",
                true,
                PublicRateClient::new(&config.public_rates).and_then(|client| {
                    client
                        .lookup(CHECK_SKU, CHECK_CURRENCY)
                        .map(|rate| match rate {
                            Some(rate) => format!("{} = {}", CHECK_SKU, rate.paygo_price),
                            None => format!("no price for {}", CHECK_SKU),
                        })
                        .map_err(|err| {
                            IngestError::external(config.public_rates.url.clone(), err).into()
                        })
                }),
            );
        }
        for item in &report.items {
            if item.ok {
                log::info!("{}: {}", item.name, item.detail);
            } else if item.warning_only {
                log::warn!("{}: {}", item.name, item.detail);
            } else {
                log::error!("{}: {}", item.name, item.detail);
            }
        }
        Ok(report)
    }

    /// Load history and row counts for one tenant.
    pub fn status(&self, overrides: &RunOverrides, limit: usize) -> Result<StatusReport> {
        let config = self.effective_config(overrides);
        let shape = config.shape()?;
        let tenant = config.require_tenant()?.to_string();
        let db = Db::open(&config.database)?;
        db.check_schema(shape)?;
        Ok(StatusReport {
            watermark: db.max_loaded_file_name(shape, &tenant)?,
            files_loaded: db.count_load_status(shape, &tenant)?,
            raw_rows: db.count_raw_rows(shape, &tenant)?,
            rate_cards: db.list_rate_cards(shape, &tenant)?.len(),
            recent: db.list_load_status(shape, &tenant, limit)?,
            file_type: shape.file_type.as_str().to_string(),
            tenant,
        })
    }

    fn effective_config(&self, overrides: &RunOverrides) -> LoaderConfig {
        let mut config = self.config.clone();
        config.apply(overrides);
        config
    }
}

pub fn setup_db(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut db = Db::open(path)?;
    db.migrate()?;
    Ok(())
}

fn check_database(path: &Path, shape: &RecordShape) -> Result<String> {
    let db = Db::open(path)?;
    db.check_schema(shape)?;
    Ok(format!("{} tables present", shape.file_type.as_str()))
}

pub fn open_bucket(config: &LoaderConfig) -> Result<Box<dyn ObjectStore>> {
    open_bucket_with(config, &LocalSecrets)
}

/// Opens the configured bucket, resolving a PAR url secret through `secrets`.
pub fn open_bucket_with(
    config: &LoaderConfig,
    secrets: &dyn SecretSource,
) -> Result<Box<dyn ObjectStore>> {
    match config.bucket.kind {
        BucketKind::Local => {
            let path = config.bucket.path.as_ref().ok_or_else(|| {
                AppError::Config("bucket.path is required for a local bucket".to_string())
            })?;
            let bucket = LocalBucket::new(path);
            log::debug!("reading objects from {}", bucket.root().display());
            Ok(Box::new(bucket))
        }
        BucketKind::Par => {
            let url = match (&config.bucket.par_url, &config.bucket.par_url_secret) {
                (Some(url), _) if !url.trim().is_empty() => url.clone(),
                (_, Some(reference)) => secrets
                    .secret(reference)
                    .map_err(|err| AppError::Secret(err.to_string()))?,
                _ => {
                    return Err(AppError::Config(
                        "bucket.par_url or bucket.par_url_secret is required for a PAR bucket"
                            .to_string(),
                    ));
                }
            };
            Ok(Box::new(ParBucket::new(&url, BUCKET_CONNECT_TIMEOUT)?))
        }
    }
}

/// Compartment paths for the run; empty when no export is configured.
pub fn compartment_paths(config: &LoaderConfig) -> Result<CompartmentPaths> {
    let Some(file) = config.compartments_file.as_ref() else {
        return Ok(CompartmentPaths::default());
    };
    let root_id = config.tenant_id.as_deref().ok_or_else(|| {
        AppError::Config("tenant_id is required to resolve compartment paths".to_string())
    })?;
    let compartments = JsonCompartments::new(file)
        .compartments(root_id)
        .map_err(|err| IngestError::external(format!("compartments {}", file.display()), err))?;
    let paths = CompartmentPaths::build(root_id, &config.tenant_name, &compartments);
    log::info!("{} compartment paths resolved", paths.len());
    Ok(paths)
}

/// Upper bound compared against each file's date. A bare day covers every
/// minute of that day for shapes dated by creation minute.
fn min_date_bound(value: &str, shape: &RecordShape) -> Result<String> {
    let day = value.get(0..10).unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidInput(format!("invalid minimum date: {}", value)))?;
    if value.len() == day.len() && shape.file_date == FileDateRule::CreatedMinute {
        return Ok(format!("{} 23:59", day));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use billing_core::{COST_SHAPE, FOCUS_SHAPE};

    use super::*;

    #[test]
    fn min_date_must_start_with_a_day() {
        assert!(min_date_bound("2024-01-31 10:00", &COST_SHAPE).is_ok());
        assert!(min_date_bound("31/01/2024", &COST_SHAPE).is_err());
        assert!(min_date_bound("", &FOCUS_SHAPE).is_err());
    }

    #[test]
    fn bare_min_date_covers_the_whole_day_for_cost_files() {
        assert_eq!(
            min_date_bound("2024-01-31", &COST_SHAPE).expect("cost bound"),
            "2024-01-31 23:59"
        );
        assert_eq!(
            min_date_bound("2024-01-31 10:00", &COST_SHAPE).expect("explicit minute"),
            "2024-01-31 10:00"
        );
        assert_eq!(
            min_date_bound("2024-01-31", &FOCUS_SHAPE).expect("focus bound"),
            "2024-01-31"
        );
    }

    #[test]
    fn par_bucket_needs_a_url() {
        let mut config = LoaderConfig::default();
        config.bucket.kind = BucketKind::Par;
        assert!(matches!(open_bucket(&config), Err(AppError::Config(_))));
        config.bucket.par_url =
            Some("https://objectstorage.example.com/p/x/n/ns/b/b/o/".to_string());
        assert!(open_bucket(&config).is_ok());
    }

    struct FixedSecret(&'static str);

    impl SecretSource for FixedSecret {
        fn secret(&self, reference: &str) -> std::result::Result<String, ingest::SourceError> {
            if reference == "par-url" {
                Ok(self.0.to_string())
            } else {
                Err(format!("unknown secret {}", reference).into())
            }
        }
    }

    #[test]
    fn par_url_secret_is_resolved_through_the_secret_source() {
        let mut config = LoaderConfig::default();
        config.bucket.kind = BucketKind::Par;
        config.bucket.par_url_secret = Some("par-url".to_string());
        let secrets = FixedSecret("https://objectstorage.example.com/p/x/n/ns/b/b/o/");
        assert!(open_bucket_with(&config, &secrets).is_ok());

        config.bucket.par_url_secret = Some("other".to_string());
        assert!(matches!(
            open_bucket_with(&config, &secrets),
            Err(AppError::Secret(_))
        ));
    }

    #[test]
    fn compartments_require_tenant_id() {
        let config = LoaderConfig {
            compartments_file: Some("compartments.json".into()),
            ..LoaderConfig::default()
        };
        assert!(matches!(
            compartment_paths(&config),
            Err(AppError::Config(_))
        ));
        assert!(compartment_paths(&LoaderConfig::default())
            .expect("no export")
            .is_empty());
    }
}
