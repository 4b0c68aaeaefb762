use std::collections::BTreeSet;

use billing_core::{
    ColumnSource, IDENTITY_PREFIX, NormalizedRow, RecordShape, TAG_LIMIT, TagLayout, Transform,
    day_of, minute_of, sku_patch,
};
use serde_json::Value;

use crate::context::RunContext;
use crate::record::RawRecord;

/// Tag keys seen across one file, plus a count of tag payloads that could not
/// be parsed.
#[derive(Debug, Clone, Default)]
pub struct TagAccumulator {
    keys: BTreeSet<String>,
    malformed: usize,
}

impl TagAccumulator {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn malformed(&self) -> usize {
        self.malformed
    }
}

#[derive(Debug, Default)]
struct FlatTags {
    flat: String,
    specials: [String; 4],
}

/// Maps one source record onto the shape's target columns.
///
/// Missing fields become empty strings, never errors. Values are not type
/// checked here; numeric and date conversion happens in the insert statement.
pub fn normalize(
    raw: &dyn RawRecord,
    ctx: &RunContext,
    file_id: &str,
    tags: &mut TagAccumulator,
) -> NormalizedRow {
    let shape = ctx.shape;
    let flat = flatten_tags(raw, shape.tag_layout, ctx, tags);
    let mut values = Vec::with_capacity(shape.columns.len());
    for column in shape.columns {
        let value = match column.source {
            ColumnSource::Field(name) => raw.get(name).unwrap_or("").to_string(),
            ColumnSource::FirstOf(names) => names
                .iter()
                .filter_map(|name| raw.get(name))
                .find(|value| !value.is_empty())
                .unwrap_or("")
                .to_string(),
            ColumnSource::Tenant => ctx.tenant.clone(),
            ColumnSource::FileId => file_id.to_string(),
            ColumnSource::CompartmentPath => {
                let id = raw.get(shape.compartment_field).unwrap_or("");
                ctx.compartments.path_for(id).to_string()
            }
            ColumnSource::Tags => flat.flat.clone(),
            ColumnSource::TagSpecial(slot) => flat.specials.get(slot).cloned().unwrap_or_default(),
        };
        values.push(apply_transform(column.transform, value));
    }
    let mut row = NormalizedRow { values };
    patch_known_skus(shape, &mut row);
    row
}

fn apply_transform(transform: Transform, value: String) -> String {
    if value.is_empty() {
        return value;
    }
    match transform {
        Transform::None => value,
        Transform::Minute => minute_of(&value),
        Transform::Day => day_of(&value),
        Transform::Suffix6 => {
            let count = value.chars().count();
            value.chars().skip(count.saturating_sub(6)).collect()
        }
        Transform::NumericOnly => {
            let digits = value.replace('.', "");
            if !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()) {
                value
            } else {
                String::new()
            }
        }
    }
}

fn flatten_tags(
    raw: &dyn RawRecord,
    layout: TagLayout,
    ctx: &RunContext,
    acc: &mut TagAccumulator,
) -> FlatTags {
    let mut out = FlatTags::default();
    for (key, value) in collect_tag_pairs(raw, layout, acc) {
        for (slot, special) in ctx.special_tags.iter() {
            if key == special {
                out.specials[slot] = special_value(&value);
            }
        }
        if out.flat.len() + key.len() + value.len() + 2 < TAG_LIMIT {
            out.flat.push_str(&key);
            out.flat.push('=');
            out.flat.push_str(&value);
            out.flat.push('#');
        }
        acc.keys.insert(key);
    }
    out
}

fn collect_tag_pairs(
    raw: &dyn RawRecord,
    layout: TagLayout,
    acc: &mut TagAccumulator,
) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    match layout {
        TagLayout::PrefixedColumns(prefix) => {
            for (name, value) in raw.fields() {
                let Some(key) = name.strip_prefix(prefix) else {
                    continue;
                };
                push_pair(&mut pairs, key, value);
            }
        }
        TagLayout::JsonObject(field) => {
            let payload = raw.get(field).unwrap_or("").trim();
            if payload.is_empty() {
                return pairs;
            }
            match serde_json::from_str::<serde_json::Map<String, Value>>(payload) {
                Ok(map) => {
                    for (key, value) in &map {
                        match value {
                            Value::Null => {}
                            Value::String(text) => push_pair(&mut pairs, key, text),
                            other => push_pair(&mut pairs, key, &other.to_string()),
                        }
                    }
                }
                Err(_) => acc.malformed += 1,
            }
        }
    }
    pairs
}

fn push_pair(pairs: &mut Vec<(String, String)>, key: &str, value: &str) {
    let key = strip_reserved(key);
    let value = strip_reserved(value);
    if key.is_empty() || value.is_empty() {
        return;
    }
    pairs.push((key, value));
}

fn strip_reserved(value: &str) -> String {
    value.chars().filter(|ch| *ch != '#' && *ch != '=').collect()
}

fn special_value(value: &str) -> String {
    value
        .replace(IDENTITY_PREFIX, "")
        .chars()
        .take(TAG_LIMIT)
        .collect()
}

fn patch_known_skus(shape: &RecordShape, row: &mut NormalizedRow) {
    let roles = &shape.roles;
    let (Some(sku_index), Some(description_index)) = (
        shape.column_index(roles.sku),
        shape.column_index(roles.description),
    ) else {
        return;
    };
    if !row.values[description_index].is_empty() {
        return;
    }
    let Some(patch) = sku_patch(&row.values[sku_index]) else {
        return;
    };
    row.values[description_index] = patch.description.to_string();
    if let Some(unit_index) = roles.billing_unit.and_then(|name| shape.column_index(name)) {
        row.values[unit_index] = patch.billing_unit.to_string();
    }
}
