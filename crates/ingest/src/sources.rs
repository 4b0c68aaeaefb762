//! Interfaces to the systems a run reads from.

use std::fmt;
use std::io::Read;

use billing_core::{Compartment, PublicRate, SourceFile};

pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Bucket holding the export files.
pub trait ObjectStore {
    /// Every object under `prefix` whose name sorts strictly after
    /// `start_after`, in name order. Paging is the store's concern.
    fn list_objects(
        &self,
        prefix: &str,
        start_after: &str,
    ) -> std::result::Result<Vec<SourceFile>, SourceError>;

    fn fetch(&self, name: &str) -> std::result::Result<Box<dyn Read + '_>, SourceError>;
}

/// Flat list of compartments under a tenancy root.
pub trait CompartmentSource {
    fn compartments(&self, root_id: &str)
    -> std::result::Result<Vec<Compartment>, SourceError>;
}

/// Resolves an opaque secret reference to its plaintext value.
pub trait SecretSource {
    fn secret(&self, reference: &str) -> std::result::Result<String, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The price service cannot be reached at all.
    Unreachable(String),
    /// This lookup failed; others may still succeed.
    Failed(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(message) => write!(f, "price list unreachable: {}", message),
            Self::Failed(message) => write!(f, "price lookup failed: {}", message),
        }
    }
}

impl std::error::Error for LookupError {}

/// Public list price by SKU and currency. `Ok(None)` means no
/// pay-as-you-go price is published.
pub trait PriceLookup {
    fn lookup(
        &self,
        sku: &str,
        currency: &str,
    ) -> std::result::Result<Option<PublicRate>, LookupError>;
}
