mod context;
mod file;
mod normalize;
mod pipeline;
mod rates;
mod record;
mod refresh;
mod sources;
mod types;

pub use context::{DEFAULT_BATCH_SIZE, FileFilters, RunContext};
pub use file::{BatchPosition, eligibility, file_date, ingest_file};
pub use normalize::{TagAccumulator, normalize};
pub use pipeline::{run, run_incremental_load};
pub use rates::enrich_public_rates;
pub use record::{CsvRecord, HeaderIndex, MapRecord, RawRecord};
pub use refresh::refresh_derived;
pub use sources::{
    CompartmentSource, LookupError, ObjectStore, PriceLookup, SecretSource, SourceError,
};
pub use types::{
    EnrichSummary, FileOutcome, IngestError, IngestIssue, LoadSummary, RefreshSummary, Result,
    RunReport, SkipReason,
};
