use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::MatchError;
use crate::normalize::{normalize, normalize_email, normalize_phone};

/// A candidate/prospect row as supplied by the caller.
///
/// Only `display_name`, `email` and `phone` take part in matching. Every other
/// column a spreadsheet or API row carries lands in `extra` and is only
/// touched by the fill-missing merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Free-text remarks. Appended, never overwritten, on merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: None,
            phone: None,
            city: None,
            created_at: None,
            notes: None,
            extra: Map::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Compact normalized key of the display name. Empty means "unknown".
    pub fn name_key(&self) -> String {
        normalize(&self.display_name)
    }

    pub fn usable_email(&self) -> Option<String> {
        self.email.as_deref().and_then(normalize_email)
    }

    pub fn usable_phone(&self) -> Option<String> {
        self.phone.as_deref().and_then(normalize_phone)
    }

    /// Builds a record from an untyped JSON row.
    ///
    /// Fails with `InvalidInput` when the row is not an object or when
    /// `displayName` is absent or not a string. Rows without an `id` get a
    /// fresh UUID so they can still be referenced in the superseded map.
    pub fn from_value(value: Value) -> Result<Self, MatchError> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(MatchError::invalid(format!(
                    "record must be a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        match obj.get("displayName") {
            Some(Value::String(_)) => {}
            Some(other) => {
                return Err(MatchError::invalid(format!(
                    "displayName must be a string, got {}",
                    json_kind(other)
                )))
            }
            None => return Err(MatchError::invalid("record is missing displayName")),
        }

        let id = match obj.remove("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(_)) | Some(Value::Null) | None => Uuid::new_v4().to_string(),
            Some(other) => {
                return Err(MatchError::invalid(format!(
                    "id must be a string or number, got {}",
                    json_kind(&other)
                )))
            }
        };
        obj.insert("id".to_string(), Value::String(id));

        // spreadsheet exports often type phone numbers as numbers
        for key in ["phone", "email", "city", "notes"] {
            let numeric = match obj.get(key) {
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            if let Some(text) = numeric {
                obj.insert(key.to_string(), Value::String(text));
            }
        }

        serde_json::from_value(Value::Object(obj))
            .map_err(|e| MatchError::invalid(format!("malformed record: {e}")))
    }
}

/// Parses a `records`/`pool` payload. Anything other than a JSON array is
/// a caller contract violation.
pub fn parse_records(value: Value) -> Result<Vec<Record>, MatchError> {
    let rows = match value {
        Value::Array(rows) => rows,
        other => {
            return Err(MatchError::invalid(format!(
                "records must be a JSON array, got {}",
                json_kind(&other)
            )))
        }
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            Record::from_value(row).map_err(|e| match e {
                MatchError::InvalidInput(msg) => {
                    MatchError::InvalidInput(format!("record #{i}: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
