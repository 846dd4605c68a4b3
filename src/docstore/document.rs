use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::ident::{parse_id, DocumentId};
use crate::search::normalize::normalize_nfc;
use crate::search::spec::Category;
use crate::storage::LinkEnds;
use crate::visibility::Visibility;

/// Keys the store interprets; everything else is carried as opaque payload. Server stamps
/// are listed so callers cannot smuggle them in.
const RESERVED_KEYS: &[&str] = &[
    "id", "library", "topic", "key", "category", "value", "nnp", "tags", "visibility", "from", "to",
    "schema_id", "seq", "payload", "created_by", "created_when", "modified_by", "modified_when",
];

/// A caller-supplied record after schema validation, before stamping.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInput {
    pub id: DocumentId,
    pub category: Category,
    pub value: String,
    pub tags: Vec<String>,
    pub payload: Value,
    pub link: Option<LinkEnds>,
    pub visibility: Option<Visibility>,
}

fn str_field<'a>(obj: &'a Map<String, Value>, k: &str) -> Option<&'a str> {
    obj.get(k).and_then(|v| v.as_str())
}

impl DocumentInput {
    pub fn from_json(json: &Value) -> AppResult<Self> {
        let obj = json
            .as_object()
            .ok_or_else(|| AppError::validation("not_an_object".to_string(), "record must be a JSON object".to_string()))?;
        let category = Category::parse(str_field(obj, "category").unwrap_or(""))?;
        let id = match str_field(obj, "id") {
            Some(id) => {
                let parsed = parse_id(id)?;
                for (k, part) in [("library", &parsed.library), ("topic", &parsed.topic), ("key", &parsed.key)] {
                    if let Some(given) = str_field(obj, k) {
                        if given != part {
                            return Err(AppError::validation(
                                "id_mismatch".to_string(),
                                format!("'{}' is '{}' but id '{}' says '{}'", k, given, id, part),
                            ));
                        }
                    }
                }
                parsed
            }
            None => DocumentId::new(
                str_field(obj, "library").unwrap_or(""),
                str_field(obj, "topic").unwrap_or(""),
                str_field(obj, "key").unwrap_or(""),
            )?,
        };
        let value = normalize_nfc(str_field(obj, "value").unwrap_or(""));
        let mut tags: Vec<String> = obj
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|t| t.as_str()).map(|t| normalize_nfc(t.trim())).filter(|t| !t.is_empty()).collect())
            .unwrap_or_default();
        tags.sort();
        tags.dedup();
        let link = match (str_field(obj, "from"), str_field(obj, "to")) {
            (Some(from), Some(to)) => Some(LinkEnds { from: from.to_string(), to: to.to_string() }),
            _ => None,
        };
        let visibility = str_field(obj, "visibility").map(Visibility::parse).transpose()?;
        let mut payload: Map<String, Value> = obj
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(Value::Object(inner)) = obj.get("payload") {
            for (k, v) in inner { payload.entry(k.clone()).or_insert_with(|| v.clone()); }
        }
        Ok(Self { id, category, value, tags, payload: Value::Object(payload), link, visibility })
    }
}
