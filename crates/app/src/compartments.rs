use std::fs;
use std::path::PathBuf;

use billing_core::Compartment;
use ingest::{CompartmentSource, SourceError};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum Export {
    Listing { data: Vec<Compartment> },
    Bare(Vec<Compartment>),
}

/// Compartment list exported as JSON, either the CLI listing format
/// (`{"data": [...]}`) or a bare array.
#[derive(Debug, Clone)]
pub struct JsonCompartments {
    path: PathBuf,
}

impl JsonCompartments {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CompartmentSource for JsonCompartments {
    fn compartments(&self, root_id: &str) -> Result<Vec<Compartment>, SourceError> {
        let contents = fs::read_to_string(&self.path)
            .map_err(|err| format!("read {}: {}", self.path.display(), err))?;
        let compartments = parse_compartments(&contents)?;
        log::debug!(
            "{} compartments listed under {}",
            compartments.len(),
            root_id
        );
        Ok(compartments)
    }
}

pub fn parse_compartments(contents: &str) -> serde_json::Result<Vec<Compartment>> {
    Ok(match serde_json::from_str(contents)? {
        Export::Listing { data } => data,
        Export::Bare(items) => items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_listing() {
        let compartments = parse_compartments(
            r#"{"data": [
                {"id": "c1", "compartment-id": "root", "name": "Finance", "lifecycle-state": "ACTIVE"},
                {"id": "c2", "compartment-id": "c1", "name": "Old", "lifecycle-state": "DELETED"}
            ]}"#,
        )
        .expect("parse listing");
        assert_eq!(compartments.len(), 2);
        assert_eq!(compartments[0].parent_id, "root");
        assert_eq!(compartments[1].lifecycle_state, "DELETED");
    }

    #[test]
    fn parses_bare_array_with_camel_case() {
        let compartments = parse_compartments(
            r#"[{"id": "c1", "compartmentId": "root", "name": "Finance"}]"#,
        )
        .expect("parse array");
        assert_eq!(compartments[0].lifecycle_state, "ACTIVE");
    }

    #[test]
    fn missing_file_is_an_error() {
        let source = JsonCompartments::new("/nonexistent/compartments.json");
        assert!(source.compartments("root").is_err());
    }
}
