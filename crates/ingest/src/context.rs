use std::path::PathBuf;

use billing_core::{CompartmentPaths, RecordShape, SpecialTagKeys};

pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Optional per-run restrictions on which listed files are ingested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilters {
    /// Matches either the file id or the full object name.
    pub file: Option<String>,
    /// Files dated at or before this value are skipped.
    pub min_date: Option<String>,
}

/// Everything one invocation needs, built once and passed down explicitly.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub tenant: String,
    pub shape: &'static RecordShape,
    pub filters: FileFilters,
    pub special_tags: SpecialTagKeys,
    pub compartments: CompartmentPaths,
    pub work_dir: PathBuf,
    pub batch_size: usize,
    pub agent_version: String,
    pub force_refresh: bool,
    pub skip_rates: bool,
}

impl RunContext {
    pub fn new(tenant: impl Into<String>, shape: &'static RecordShape, work_dir: PathBuf) -> Self {
        Self {
            tenant: tenant.into(),
            shape,
            filters: FileFilters::default(),
            special_tags: SpecialTagKeys::default(),
            compartments: CompartmentPaths::default(),
            work_dir,
            batch_size: DEFAULT_BATCH_SIZE,
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            force_refresh: false,
            skip_rates: false,
        }
    }
}
