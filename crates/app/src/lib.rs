pub mod app;
pub mod bucket;
pub mod compartments;
pub mod config;
pub mod error;
pub mod public_rates;
pub mod secrets;

pub use app::{
    AppState, CheckItem, CheckReport, StatusReport, compartment_paths, open_bucket,
    open_bucket_with, setup_db,
};
pub use bucket::{LocalBucket, ParBucket};
pub use compartments::{JsonCompartments, parse_compartments};
pub use config::{
    BucketConfig, BucketKind, DEFAULT_PRICE_URL, LoaderConfig, PublicRatesConfig, RunOverrides,
    load_config, load_or_default, parse_config,
};
pub use error::{AppError, Result};
pub use public_rates::{PublicRateClient, parse_price};
pub use secrets::{LocalSecrets, decode_secret};
