//! Persisted logical shape of a document as the backend stores it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::search::ast::Field;
use crate::search::spec::{Category, Projection};
use crate::visibility::Visibility;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEnds {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub library: String,
    pub topic: String,
    pub key: String,
    pub category: Category,
    pub value: String,
    /// `value` without diacritics and punctuation.
    pub nnp: String,
    pub tags: Vec<String>,
    #[serde(with = "payload_text")]
    pub payload: Value,
    pub link: Option<LinkEnds>,
    pub visibility: Visibility,
    pub seq: String,
    pub schema_id: String,
    pub created_by: String,
    pub created_when: DateTime<Utc>,
    pub modified_by: String,
    pub modified_when: DateTime<Utc>,
}

impl Document {
    /// Backend labels: category label (if any) then the tenant label.
    pub fn labels(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(2);
        if let Some(l) = self.category.label() { out.push(l.to_string()); }
        out.push(self.library.clone());
        out
    }

    pub fn field(&self, f: Field) -> Option<&str> {
        match f {
            Field::Id => Some(&self.id),
            Field::Library => Some(&self.library),
            Field::Topic => Some(&self.topic),
            Field::Key => Some(&self.key),
            Field::Value => Some(&self.value),
            Field::Nnp => Some(&self.nnp),
            Field::Seq => Some(&self.seq),
            Field::Visibility => Some(self.visibility.as_str()),
            Field::SchemaId => Some(&self.schema_id),
            Field::From => self.link.as_ref().map(|l| l.from.as_str()),
            Field::To => self.link.as_ref().map(|l| l.to.as_str()),
            Field::Tags | Field::ModifiedWhen => None,
        }
    }

    pub fn to_json(&self) -> Value { serde_json::to_value(self).unwrap_or_default() }

    /// Inverse of `to_json`, used to read full-projection rows back.
    pub fn from_row(row: &Value) -> AppResult<Self> {
        serde_json::from_value(row.clone())
            .map_err(|e| AppError::unavailable("backend_row".to_string(), format!("unreadable document row: {}", e)))
    }

    pub fn project(&self, p: Projection) -> Value {
        match p {
            Projection::Full => self.to_json(),
            Projection::IdValue => json!({ "id": self.id, "value": self.value }),
            Projection::IdValueStripped => json!({ "id": self.id, "value": self.value, "nnp": self.nnp }),
        }
    }
}

/// Payloads stay structured in human-readable formats and travel as JSON text through
/// non-self-describing encoders (bincode), which cannot carry a `serde_json::Value`.
mod payload_text {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(v: &Value, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            v.serialize(s)
        } else {
            s.serialize_str(&v.to_string())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Value, D::Error> {
        if d.is_human_readable() {
            Value::deserialize(d)
        } else {
            let text = String::deserialize(d)?;
            serde_json::from_str(&text).map_err(serde::de::Error::custom)
        }
    }
}
