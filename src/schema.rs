//! Schema registry seam consulted before every write.

use serde_json::Value;

use crate::search::spec::Category;

pub trait SchemaRegistry: Send + Sync {
    /// First violation found, or `None` when the record is valid.
    fn validate(&self, json: &Value) -> Option<String>;
    fn schema_id_for(&self, json: &Value) -> String;
}

/// Built-in per-category rules: identity parts, text value, link ends, tag shape.
#[derive(Debug, Default, Clone)]
pub struct CategorySchemaRegistry;

impl CategorySchemaRegistry {
    pub fn new() -> Self { Self }
}

fn non_empty_str(obj: &serde_json::Map<String, Value>, k: &str) -> bool {
    obj.get(k).and_then(|v| v.as_str()).map(|s| !s.trim().is_empty()).unwrap_or(false)
}

impl SchemaRegistry for CategorySchemaRegistry {
    fn validate(&self, json: &Value) -> Option<String> {
        let Some(obj) = json.as_object() else {
            return Some("record must be a JSON object".to_string());
        };
        let category = match obj.get("category").and_then(|v| v.as_str()) {
            Some(c) => match Category::parse(c) {
                Ok(Category::Generic) => return Some("records must declare a concrete category".to_string()),
                Ok(c) => c,
                Err(e) => return Some(e.message().to_string()),
            },
            None => return Some("missing 'category'".to_string()),
        };
        if !non_empty_str(obj, "id") {
            for k in ["library", "topic", "key"] {
                if !non_empty_str(obj, k) {
                    return Some(format!("missing '{}' (or 'id')", k));
                }
            }
        }
        match obj.get("value") {
            Some(Value::String(_)) => {}
            Some(_) => return Some("'value' must be a string".to_string()),
            None if category != Category::Link => return Some("missing 'value'".to_string()),
            None => {}
        }
        if category == Category::Link {
            for k in ["from", "to"] {
                if !non_empty_str(obj, k) {
                    return Some(format!("link record missing '{}'", k));
                }
            }
        }
        if let Some(tags) = obj.get("tags") {
            match tags.as_array() {
                Some(arr) if arr.iter().all(|t| t.is_string()) => {}
                _ => return Some("'tags' must be an array of strings".to_string()),
            }
        }
        if let Some(v) = obj.get("visibility") {
            if !v.is_string() {
                return Some("'visibility' must be a string".to_string());
            }
        }
        None
    }

    fn schema_id_for(&self, json: &Value) -> String {
        if let Some(id) = json.get("schema_id").and_then(|v| v.as_str()) {
            return id.to_string();
        }
        let category = json.get("category").and_then(|v| v.as_str()).and_then(|c| Category::parse(c).ok());
        match category {
            Some(c) => format!("{}:1.0", c.as_str()),
            None => "unknown:1.0".to_string(),
        }
    }
}
