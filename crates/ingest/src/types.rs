use serde::Serialize;
use std::fmt;
use std::io;

/// Totals for one incremental load pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    pub watermark: String,
    pub files_listed: usize,
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub rows_loaded: usize,
    pub issues: Vec<IngestIssue>,
}

/// Non-fatal issues encountered during ingest.
#[derive(Debug, Clone, Serialize)]
pub struct IngestIssue {
    pub file_name: String,
    pub message: String,
}

/// Row counts written by the post-load refresh jobs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshSummary {
    pub stats_rows: usize,
    pub rate_card_rows: usize,
    pub reference_rows: usize,
    pub special_tag_keys: usize,
    pub tenant_ids: usize,
    pub public_rates: Option<EnrichSummary>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichSummary {
    pub skus_checked: usize,
    pub rows_updated: usize,
    pub failures: usize,
    /// Set when the price list could not be reached at all.
    pub aborted: bool,
}

/// Result of a full run: load pass plus the refresh, when it ran.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub load: LoadSummary,
    pub refresh: Option<RefreshSummary>,
}

/// Why a listed file was not ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    AlreadyLoaded,
    FileFilter,
    BeforeMinDate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyLoaded => write!(f, "file already loaded"),
            Self::FileFilter => write!(f, "does not match the file filter"),
            Self::BeforeMinDate => write!(f, "not newer than the minimum date"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Loaded { rows: usize, malformed_tags: usize },
    Skipped(SkipReason),
}

/// Errors emitted by the ingest pipeline.
#[derive(Debug)]
pub enum IngestError {
    Io(io::Error),
    Db(billing_db::DbError),
    Csv(csv::Error),
    Source { context: String, message: String },
}

impl IngestError {
    pub fn external(context: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::Source {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Db(err) => write!(f, "db error: {}", err),
            Self::Csv(err) => write!(f, "csv error: {}", err),
            Self::Source { context, message } => write!(f, "{}: {}", context, message),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<io::Error> for IngestError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<billing_db::DbError> for IngestError {
    fn from(err: billing_db::DbError) -> Self {
        Self::Db(err)
    }
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
