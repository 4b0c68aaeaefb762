use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const ACTIVE_STATE: &str = "ACTIVE";

/// One compartment as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compartment {
    pub id: String,
    #[serde(rename = "compartment-id", alias = "compartment_id", alias = "compartmentId")]
    pub parent_id: String,
    pub name: String,
    #[serde(
        rename = "lifecycle-state",
        alias = "lifecycle_state",
        alias = "lifecycleState",
        default = "default_state"
    )]
    pub lifecycle_state: String,
}

fn default_state() -> String {
    ACTIVE_STATE.to_string()
}

/// Immutable `compartment id -> display path` lookup for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompartmentPaths {
    paths: HashMap<String, String>,
}

impl CompartmentPaths {
    /// Builds paths for the root and every active compartment reachable from it.
    ///
    /// The root is labelled `"/ <name> (root)"`, its direct children carry their
    /// bare name and deeper levels are joined with `" / "`. Inactive
    /// compartments are pruned together with their subtree.
    pub fn build(root_id: &str, root_name: &str, compartments: &[Compartment]) -> Self {
        let mut children: HashMap<&str, Vec<&Compartment>> = HashMap::new();
        for compartment in compartments {
            if compartment.lifecycle_state != ACTIVE_STATE {
                continue;
            }
            children
                .entry(compartment.parent_id.as_str())
                .or_default()
                .push(compartment);
        }

        let mut paths = HashMap::new();
        paths.insert(root_id.to_string(), format!("/ {} (root)", root_name));

        let mut stack: Vec<(&str, Option<String>)> = vec![(root_id, None)];
        while let Some((parent_id, parent_path)) = stack.pop() {
            let Some(kids) = children.get(parent_id) else {
                continue;
            };
            for child in kids {
                if paths.contains_key(&child.id) {
                    continue;
                }
                let path = match &parent_path {
                    Some(parent) => format!("{} / {}", parent, child.name),
                    None => child.name.clone(),
                };
                paths.insert(child.id.clone(), path.clone());
                stack.push((child.id.as_str(), Some(path)));
            }
        }
        Self { paths }
    }

    pub fn from_map(paths: HashMap<String, String>) -> Self {
        Self { paths }
    }

    /// Unresolved ids yield an empty path.
    pub fn path_for(&self, id: &str) -> &str {
        self.paths.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
