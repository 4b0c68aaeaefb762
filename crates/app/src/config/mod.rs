use std::fs;
use std::path::{Path, PathBuf};

use billing_core::{FileType, RecordShape, SpecialTagKeys};
use ingest::DEFAULT_BATCH_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const DEFAULT_PRICE_URL: &str = "https://apexapps.oracle.com/pls/apex/cetools/api/v1/products/";
const DEFAULT_DATABASE: &str = "billing.sqlite";
const DEFAULT_WORK_DIR: &str = "work_report_dir";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketKind {
    #[default]
    Local,
    Par,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    pub kind: BucketKind,
    pub path: Option<PathBuf>,
    pub par_url: Option<String>,
    /// Secret reference whose base64 content is the PAR URL.
    pub par_url_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicRatesConfig {
    pub enabled: bool,
    pub url: String,
    pub throttle_ms: u64,
    pub timeout_secs: u64,
}

impl Default for PublicRatesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_PRICE_URL.to_string(),
            throttle_ms: 200,
            timeout_secs: 30,
        }
    }
}

/// Loader settings read from TOML; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub database: PathBuf,
    pub tenant_name: String,
    pub tenant_id: Option<String>,
    pub file_type: String,
    pub work_dir: PathBuf,
    pub batch_size: usize,
    pub compartments_file: Option<PathBuf>,
    pub special_tag_keys: Vec<String>,
    pub bucket: BucketConfig,
    pub public_rates: PublicRatesConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            tenant_name: String::new(),
            tenant_id: None,
            file_type: FileType::Cost.as_str().to_ascii_lowercase(),
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            batch_size: DEFAULT_BATCH_SIZE,
            compartments_file: None,
            special_tag_keys: Vec::new(),
            bucket: BucketConfig::default(),
            public_rates: PublicRatesConfig::default(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOverrides {
    pub file_type: Option<String>,
    pub tenant: Option<String>,
    pub file: Option<String>,
    pub min_date: Option<String>,
    pub special_tags: [Option<String>; 4],
    pub skip_rates: bool,
    pub force: bool,
    pub bucket: Option<PathBuf>,
    pub database: Option<PathBuf>,
}

impl LoaderConfig {
    pub fn file_type(&self) -> Result<FileType> {
        FileType::parse(&self.file_type).ok_or_else(|| {
            AppError::InvalidInput(format!("unknown file type: {}", self.file_type))
        })
    }

    pub fn shape(&self) -> Result<&'static RecordShape> {
        Ok(RecordShape::for_type(self.file_type()?))
    }

    pub fn special_tags(&self) -> SpecialTagKeys {
        SpecialTagKeys::from_slice(&self.special_tag_keys)
    }

    pub fn require_tenant(&self) -> Result<&str> {
        let tenant = self.tenant_name.trim();
        if tenant.is_empty() {
            return Err(AppError::InvalidInput(
                "tenant name is required (config `tenant_name` or --tenant)".to_string(),
            ));
        }
        Ok(tenant)
    }

    /// Folds flag values into the file settings. Special tag flags replace
    /// their slot only.
    pub fn apply(&mut self, overrides: &RunOverrides) {
        if let Some(file_type) = &overrides.file_type {
            self.file_type = file_type.clone();
        }
        if let Some(tenant) = &overrides.tenant {
            self.tenant_name = tenant.clone();
        }
        if let Some(database) = &overrides.database {
            self.database = database.clone();
        }
        if let Some(path) = &overrides.bucket {
            self.bucket.kind = BucketKind::Local;
            self.bucket.path = Some(path.clone());
        }
        for (slot, key) in overrides.special_tags.iter().enumerate() {
            let Some(key) = key else {
                continue;
            };
            if self.special_tag_keys.len() <= slot {
                self.special_tag_keys.resize(slot + 1, String::new());
            }
            self.special_tag_keys[slot] = key.clone();
        }
        if overrides.skip_rates {
            self.public_rates.enabled = false;
        }
    }
}

pub fn load_config(path: &Path) -> Result<LoaderConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|err| AppError::Config(format!("read {}: {}", path.display(), err)))?;
    parse_config(&contents)
        .map_err(|err| AppError::Config(format!("parse {}: {}", path.display(), err)))
}

pub fn parse_config(contents: &str) -> std::result::Result<LoaderConfig, toml::de::Error> {
    toml::from_str(contents)
}

/// Reads the file when one is given, otherwise starts from defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<LoaderConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(LoaderConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = parse_config(
            r#"
            database = "warehouse.sqlite"
            tenant_name = "acme"
            tenant_id = "ocid1.tenancy.oc1..abc"
            file_type = "focus"
            batch_size = 100
            compartments_file = "compartments.json"
            special_tag_keys = ["Owner", "CostCenter"]

            [bucket]
            kind = "par"
            par_url_secret = "env:PAR_URL"

            [public_rates]
            enabled = false
            throttle_ms = 50
            "#,
        )
        .expect("parse config");
        assert_eq!(config.database, PathBuf::from("warehouse.sqlite"));
        assert_eq!(config.file_type().expect("file type"), FileType::Focus);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.bucket.kind, BucketKind::Par);
        assert_eq!(config.bucket.par_url_secret.as_deref(), Some("env:PAR_URL"));
        assert!(!config.public_rates.enabled);
        assert_eq!(config.public_rates.throttle_ms, 50);
        assert_eq!(config.public_rates.url, DEFAULT_PRICE_URL);
        assert_eq!(config.special_tags().get(1), Some("CostCenter"));
        assert_eq!(config.work_dir, PathBuf::from(DEFAULT_WORK_DIR));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").expect("parse config");
        assert_eq!(config, LoaderConfig::default());
        assert_eq!(config.file_type().expect("file type"), FileType::Cost);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.require_tenant().is_err());
    }

    #[test]
    fn rejects_unknown_file_type() {
        let config = LoaderConfig {
            file_type: "usage-v9".to_string(),
            ..LoaderConfig::default()
        };
        assert!(matches!(config.shape(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = LoaderConfig {
            tenant_name: "acme".to_string(),
            special_tag_keys: vec!["Owner".to_string()],
            ..LoaderConfig::default()
        };
        let overrides = RunOverrides {
            file_type: Some("focus".to_string()),
            tenant: Some("globex".to_string()),
            special_tags: [None, None, Some("Project".to_string()), None],
            skip_rates: true,
            bucket: Some(PathBuf::from("/data/bucket")),
            ..RunOverrides::default()
        };
        config.apply(&overrides);
        assert_eq!(config.tenant_name, "globex");
        assert_eq!(config.file_type().expect("file type"), FileType::Focus);
        assert_eq!(config.special_tags().get(0), Some("Owner"));
        assert_eq!(config.special_tags().get(1), None);
        assert_eq!(config.special_tags().get(2), Some("Project"));
        assert!(!config.public_rates.enabled);
        assert_eq!(config.bucket.path, Some(PathBuf::from("/data/bucket")));
    }
}
