use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

pub mod compartments;
pub mod shape;

pub use compartments::{ACTIVE_STATE, Compartment, CompartmentPaths};
pub use shape::{
    COST_SHAPE, Column, ColumnSource, Dimension, FOCUS_SHAPE, FileDateRule, RecordShape, Roles,
    SqlKind, TagLayout, Tables, Transform,
};

/// Byte ceiling for flattened tag strings and special tag values.
pub const TAG_LIMIT: usize = 4000;

/// Identity-provider prefix stripped from special tag values.
pub const IDENTITY_PREFIX: &str = "oracleidentitycloudservice/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Cost,
    Focus,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cost => "COST",
            Self::Focus => "FOCUS",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cost" | "usage" => Some(Self::Cost),
            "focus" => Some(Self::Focus),
            _ => None,
        }
    }
}

/// An export object discovered in the bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub size: u64,
    /// RFC 3339 creation timestamp as reported by the store.
    pub time_created: String,
}

impl SourceFile {
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn file_id(&self) -> &str {
        let name = self.file_name();
        for suffix in [".csv.gz", ".gz", ".csv"] {
            if let Some(stem) = name.strip_suffix(suffix) {
                return stem;
            }
        }
        name
    }

    /// Creation time as `YYYY-MM-DD HH:MM`.
    pub fn created_minute(&self) -> String {
        match DateTime::parse_from_rfc3339(&self.time_created) {
            Ok(ts) => ts.naive_utc().format("%Y-%m-%d %H:%M").to_string(),
            Err(_) => minute_of(&self.time_created),
        }
    }

    pub fn size_mb(&self) -> i64 {
        (self.size as f64 / 1024.0 / 1024.0).round() as i64
    }

    /// `yyyy-mm-dd` from the first three numeric path segments after the prefix.
    pub fn path_date(&self) -> Option<String> {
        let segments: Vec<&str> = self.name.split('/').collect();
        segments.windows(3).find_map(|window| {
            let joined = format!("{}-{}-{}", window[0], window[1], window[2]);
            NaiveDate::parse_from_str(&joined, "%Y-%m-%d")
                .ok()
                .map(|date| date.format("%Y-%m-%d").to_string())
        })
    }
}

/// `YYYY-MM-DD HH:MM` slice of an ISO-8601 timestamp; empty input stays empty.
pub fn minute_of(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let day = raw.get(0..10).unwrap_or(raw);
    match raw.get(11..16) {
        Some(time) => format!("{} {}", day, time),
        None => day.to_string(),
    }
}

/// `YYYY-MM-DD` slice of an ISO-8601 timestamp.
pub fn day_of(raw: &str) -> String {
    raw.get(0..10).unwrap_or(raw).to_string()
}

/// Target-column values aligned with a shape's column list; empty means NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRow {
    pub values: Vec<String>,
}

impl NormalizedRow {
    pub fn get<'a>(&'a self, shape: &RecordShape, column: &str) -> Option<&'a str> {
        shape
            .column_index(column)
            .and_then(|index| self.values.get(index))
            .map(String::as_str)
    }
}

/// One row per ingested file; the highest `file_name` per tenant is the watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadStatus {
    pub tenant_name: String,
    pub file_type: FileType,
    pub file_id: String,
    pub file_name: String,
    pub file_size_mb: i64,
    pub file_date: String,
    pub num_rows: i64,
    pub load_start: String,
    pub load_end: String,
    pub agent_version: String,
    pub batch_id: i64,
    pub batch_total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostStat {
    pub tenant_name: String,
    pub file_id: String,
    pub period_start: String,
    pub cost: Option<f64>,
    pub cost_overage: Option<f64>,
    pub currency: Option<String>,
    pub num_rows: i64,
    pub update_date: String,
    pub agent_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCard {
    pub tenant_name: String,
    pub sku: String,
    pub description: Option<String>,
    pub currency: Option<String>,
    pub list_unit_price: Option<f64>,
    pub billed_unit_cost: Option<f64>,
    pub discount_calculated: Option<f64>,
    pub last_update: String,
    pub rate_description: Option<String>,
    pub rate_paygo_price: Option<f64>,
    pub rate_update_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceValue {
    pub tenant_name: String,
    pub ref_type: String,
    pub ref_name: String,
}

/// Public list price for one SKU in one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicRate {
    pub description: Option<String>,
    pub paygo_price: f64,
}

/// Operator-configured tag keys promoted to their own columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTagKeys {
    keys: [Option<String>; 4],
}

impl SpecialTagKeys {
    pub fn new(keys: [Option<String>; 4]) -> Self {
        let keys = keys.map(|key| key.filter(|value| !value.trim().is_empty()));
        Self { keys }
    }

    pub fn from_slice(keys: &[String]) -> Self {
        let mut slots: [Option<String>; 4] = Default::default();
        for (slot, key) in slots.iter_mut().zip(keys) {
            *slot = Some(key.clone());
        }
        Self::new(slots)
    }

    pub fn get(&self, slot: usize) -> Option<&str> {
        self.keys.get(slot).and_then(|key| key.as_deref())
    }

    /// Configured `(slot, key)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.keys
            .iter()
            .enumerate()
            .filter_map(|(slot, key)| key.as_deref().map(|key| (slot, key)))
    }
}

/// Corrected description and unit for a legacy SKU exported without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkuPatch {
    pub sku: &'static str,
    pub description: &'static str,
    pub billing_unit: &'static str,
}

pub const SKU_PATCHES: &[SkuPatch] = &[
    SkuPatch {
        sku: "B88166",
        description: "Oracle Identity Cloud - Standard",
        billing_unit: "Active User per Hour",
    },
    SkuPatch {
        sku: "B88167",
        description: "Oracle Identity Cloud - Basic",
        billing_unit: "Active User per Hour",
    },
    SkuPatch {
        sku: "B88168",
        description: "Oracle Identity Cloud - Basic - Consumer User",
        billing_unit: "Active User per Hour",
    },
];

pub fn sku_patch(sku: &str) -> Option<&'static SkuPatch> {
    SKU_PATCHES.iter().find(|patch| patch.sku == sku)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, time_created: &str) -> SourceFile {
        SourceFile {
            name: name.to_string(),
            size: 3 * 1024 * 1024 + 600 * 1024,
            time_created: time_created.to_string(),
        }
    }

    #[test]
    fn file_id_strips_compression_suffix() {
        let file = source("reports/cost-csv/0001000000123456.csv.gz", "");
        assert_eq!(file.file_name(), "0001000000123456.csv.gz");
        assert_eq!(file.file_id(), "0001000000123456");
    }

    #[test]
    fn created_minute_reads_rfc3339() {
        let file = source("a.csv.gz", "2024-03-05T07:08:09.123Z");
        assert_eq!(file.created_minute(), "2024-03-05 07:08");
        let fallback = source("a.csv.gz", "2024-03-05 07:08:09");
        assert_eq!(fallback.created_minute(), "2024-03-05 07:08");
    }

    #[test]
    fn size_mb_rounds() {
        assert_eq!(source("a", "").size_mb(), 4);
    }

    #[test]
    fn path_date_reads_date_segments() {
        let file = source("FOCUS Reports/2024/02/29/0001.csv.gz", "");
        assert_eq!(file.path_date().as_deref(), Some("2024-02-29"));
        assert_eq!(source("reports/cost-csv/0001.csv.gz", "").path_date(), None);
    }

    #[test]
    fn minute_and_day_slices() {
        assert_eq!(minute_of("2024-01-01T10:15:00Z"), "2024-01-01 10:15");
        assert_eq!(minute_of(""), "");
        assert_eq!(minute_of("2024-01-01"), "2024-01-01");
        assert_eq!(day_of("2024-01-01T10:15:00Z"), "2024-01-01");
    }

    #[test]
    fn special_tag_keys_skip_blank_slots() {
        let keys = SpecialTagKeys::from_slice(&["Owner".to_string(), " ".to_string()]);
        assert_eq!(keys.get(0), Some("Owner"));
        assert_eq!(keys.get(1), None);
        assert_eq!(keys.iter().collect::<Vec<_>>(), vec![(0, "Owner")]);
    }

    #[test]
    fn file_type_parses_aliases() {
        assert_eq!(FileType::parse("COST"), Some(FileType::Cost));
        assert_eq!(FileType::parse("focus"), Some(FileType::Focus));
        assert_eq!(FileType::parse("other"), None);
        assert_eq!(FileType::Focus.as_str(), "FOCUS");
    }

    #[test]
    fn sku_patch_lookup() {
        assert_eq!(
            sku_patch("B88167").map(|patch| patch.description),
            Some("Oracle Identity Cloud - Basic")
        );
        assert!(sku_patch("B1").is_none());
    }
}
