//! Property-name mapping and value normalization for host records.
//!
//! Host property names are mostly space-separated words (`due date`,
//! `tag names`); callers work with identifier names (`due_date`,
//! `tag_names`). The mapping is a table, not a mechanical transform, because
//! it is not a pure rule (`class` maps to `class_`). Values get normalized
//! too: comma-joined tag strings become lists, `missing value` dates become
//! null, and echoed object references collapse to canonical tokens.

use crate::applescript::parser::{Output, Record};
use crate::things::reference;

/// Host property name <-> identifier name. Names absent from the table pass
/// through unchanged in both directions.
const PROPERTY_NAMES: &[(&str, &str)] = &[
    ("due date", "due_date"),
    ("creation date", "creation_date"),
    ("modification date", "modification_date"),
    ("completion date", "completion_date"),
    ("cancellation date", "cancellation_date"),
    ("activation date", "activation_date"),
    ("start date", "start_date"),
    ("tag names", "tag_names"),
    ("parent tag", "parent_tag"),
    ("keyboard shortcut", "keyboard_shortcut"),
    ("class", "class_"),
];

/// Map an identifier name to the host property name.
pub fn host_name(field: &str) -> &str {
    PROPERTY_NAMES
        .iter()
        .find(|(_, f)| *f == field)
        .map(|(host, _)| *host)
        .unwrap_or(field)
}

/// Map a host property name to the identifier name.
pub fn field_name(host: &str) -> &str {
    PROPERTY_NAMES
        .iter()
        .find(|(h, _)| *h == host)
        .map(|(_, field)| *field)
        .unwrap_or(host)
}

/// Split a comma-joined `tag names` string into ordered, trimmed, non-empty
/// tag names.
pub fn split_tag_names(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize one host record: identifier keys, exploded tag lists, null
/// dates for `missing value`, canonical status spellings, canonical
/// reference tokens.
pub fn normalize_record(record: &Record) -> Record {
    let mut normalized = Record::new();

    for (key, value) in record.iter() {
        let field = field_name(key);
        let value = normalize_value(field, value);
        normalized.insert(field, value);
    }

    normalized
}

fn normalize_value(field: &str, value: &Output) -> Output {
    if field.ends_with("date") || field == "deadline" || field == "when" {
        return normalize_date(value);
    }

    if field == "status" {
        return normalize_status(value);
    }

    if field == "tag_names" {
        if let Output::Text(joined) = value {
            return Output::List(
                split_tag_names(joined)
                    .into_iter()
                    .map(Output::Text)
                    .collect(),
            );
        }
    }

    if let Output::Text(text) = value
        && let Some(canonical) = reference::canonicalize_raw(text)
    {
        return Output::Text(canonical);
    }

    value.clone()
}

/// Relative keywords and absolute date text pass through verbatim for the
/// typed layer to interpret; `missing value` becomes null.
fn normalize_date(value: &Output) -> Output {
    match value {
        Output::Null => Output::Null,
        Output::Text(text) if text == "missing value" => Output::Null,
        other => other.clone(),
    }
}

fn normalize_status(value: &Output) -> Output {
    let Output::Text(text) = value else {
        return Output::Null;
    };

    match text.to_lowercase().as_str() {
        "open" => Output::Text("open".to_string()),
        "completed" => Output::Text("completed".to_string()),
        // The alternate spelling shows up in some host versions.
        "canceled" | "cancelled" => Output::Text("canceled".to_string()),
        _ => Output::Null,
    }
}
