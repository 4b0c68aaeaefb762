use std::collections::HashMap;

use csv::StringRecord;

/// Read access to one source record, independent of how it was decoded.
pub trait RawRecord {
    /// Field value, `None` when the field does not exist in this record.
    fn get(&self, name: &str) -> Option<&str>;

    /// Every `(name, value)` pair in source order.
    fn fields(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_>;
}

/// Column positions of a CSV header, built once per file.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(headers: &StringRecord) -> Self {
        let names: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(index, name)| {
                if index == 0 {
                    name.trim_start_matches('\u{feff}').to_string()
                } else {
                    name.to_string()
                }
            })
            .collect();
        let mut positions = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            positions.entry(name.clone()).or_insert(index);
        }
        Self { names, positions }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub struct CsvRecord<'a> {
    header: &'a HeaderIndex,
    record: &'a StringRecord,
}

impl<'a> CsvRecord<'a> {
    pub fn new(header: &'a HeaderIndex, record: &'a StringRecord) -> Self {
        Self { header, record }
    }
}

impl RawRecord for CsvRecord<'_> {
    fn get(&self, name: &str) -> Option<&str> {
        self.header
            .positions
            .get(name)
            .and_then(|index| self.record.get(*index))
    }

    fn fields(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        Box::new(
            self.header
                .names
                .iter()
                .map(String::as_str)
                .zip(self.record.iter()),
        )
    }
}

/// In-memory record, mostly for synthetic rows.
#[derive(Debug, Clone, Default)]
pub struct MapRecord {
    fields: Vec<(String, String)>,
}

impl MapRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl RawRecord for MapRecord {
    fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    fn fields(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        Box::new(
            self.fields
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )
    }
}
