//! Field-shape normalization.
//!
//! The archive APIs return the same field as a string, an array or nothing at
//! all depending on how many values an item happens to have. Every raw field
//! bag goes through [`FieldRules::enforce`] before anything else reads it, so
//! the rest of the crate can rely on one shape per field.

use bridge_traits::FieldMap;
use serde_json::Value;
use tracing::warn;

const ITEM_REPEATABLE: &[&str] = &[
    "collection",
    "creator",
    "subject",
    "language",
    "publisher",
    "contributor",
    "description",
];

const ITEM_NONREPEATABLE: &[&str] = &[
    "identifier",
    "title",
    "mediatype",
    "uploader",
    "publicdate",
    "addeddate",
    "date",
    "year",
    "search_collection",
    "noindex",
    "licenseurl",
    "runtime",
    "sound",
    "color",
    "downloads",
    "num_reviews",
    "item_count",
];

const ITEM_REQUIRED: &[&str] = &["identifier", "title", "mediatype", "collection"];

const MEMBER_REPEATABLE: &[&str] = &["collection", "creator", "comments"];

const MEMBER_NONREPEATABLE: &[&str] = &[
    "identifier",
    "title",
    "mediatype",
    "downloads",
    "num_reviews",
    "publicdate",
    "item_count",
    "loans__status__status",
    "updatedate",
    "downloaded",
    "crawl",
];

/// How a field is stored after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// Always an array (strings are wrapped)
    Repeatable,
    /// Always a single value (arrays collapse to their first element)
    NonRepeatable,
    /// Not listed; treated like a repeatable field
    Unlisted,
}

/// Per-field schema for one kind of record.
#[derive(Debug, Clone)]
pub struct FieldRules {
    repeatable: &'static [&'static str],
    nonrepeatable: &'static [&'static str],
    required: Vec<String>,
}

impl FieldRules {
    /// Rules for an item's `metadata` object.
    pub fn item() -> Self {
        Self {
            repeatable: ITEM_REPEATABLE,
            nonrepeatable: ITEM_NONREPEATABLE,
            required: ITEM_REQUIRED.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Rules for search docs, favorites and related hits.
    ///
    /// `required` are the display fields (besides `identifier`) a member
    /// must carry; they are backfilled when missing.
    pub fn member<S: AsRef<str>>(required: &[S]) -> Self {
        let mut fields = vec!["identifier".to_string()];
        fields.extend(required.iter().map(|f| f.as_ref().to_string()));
        Self {
            repeatable: MEMBER_REPEATABLE,
            nonrepeatable: MEMBER_NONREPEATABLE,
            required: fields,
        }
    }

    pub fn shape(&self, field: &str) -> FieldShape {
        if self.nonrepeatable.contains(&field) {
            FieldShape::NonRepeatable
        } else if self.repeatable.contains(&field) {
            FieldShape::Repeatable
        } else {
            FieldShape::Unlisted
        }
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Coerce every field of `raw` to its declared shape and backfill
    /// required fields (`""` for single-valued, `[]` for repeated ones).
    pub fn enforce(&self, raw: &FieldMap) -> FieldMap {
        let identifier = raw
            .get("identifier")
            .map(display_value)
            .unwrap_or_default();

        let mut normalized = FieldMap::new();
        for (field, value) in raw {
            let shaped = match self.shape(field) {
                FieldShape::NonRepeatable => match value {
                    Value::Array(values) => {
                        if values.len() > 1 {
                            warn!(
                                field = %field,
                                identifier = %identifier,
                                "Multiple values in non-repeating field, keeping the first"
                            );
                        }
                        values
                            .first()
                            .cloned()
                            .unwrap_or_else(|| Value::String(String::new()))
                    }
                    other => other.clone(),
                },
                FieldShape::Repeatable | FieldShape::Unlisted => match value {
                    Value::Array(_) | Value::Object(_) => value.clone(),
                    Value::String(s) => Value::Array(vec![Value::String(s.clone())]),
                    _ => Value::Array(Vec::new()),
                },
            };
            normalized.insert(field.clone(), shaped);
        }

        for field in &self.required {
            if !normalized.contains_key(field) {
                warn!(field = %field, identifier = %identifier, "Required field missing");
                let filler = match self.shape(field) {
                    FieldShape::NonRepeatable => Value::String(String::new()),
                    _ => Value::Array(Vec::new()),
                };
                normalized.insert(field.clone(), filler);
            }
        }

        normalized
    }

    /// True when every required field is present and non-null in `raw`.
    ///
    /// Must be checked on the raw bag: [`enforce`](Self::enforce) backfills
    /// missing fields and would make any record look complete.
    pub fn is_complete(&self, raw: &FieldMap) -> bool {
        self.required
            .iter()
            .all(|field| matches!(raw.get(field), Some(v) if !v.is_null()))
    }
}

/// Render a scalar for logs and comparisons.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(values) => values.first().map(display_value).unwrap_or_default(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// String view of a single-valued field.
pub fn str_field<'a>(fields: &'a FieldMap, name: &str) -> Option<&'a str> {
    match fields.get(name)? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(values) => values.first().and_then(Value::as_str),
        _ => None,
    }
}

/// String entries of a repeated field.
pub fn list_field<'a>(fields: &'a FieldMap, name: &str) -> Vec<&'a str> {
    match fields.get(name) {
        Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => vec![s.as_str()],
        _ => Vec::new(),
    }
}
