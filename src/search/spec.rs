//! Uniform search description. A `SearchSpec` is built per request, compiled once and
//! dropped; nothing here touches the backend.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::ident::{is_wildcard_library, ID_DELIMITER};

/// Document categories with their own compiler variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Doc,
    Note,
    /// Any category; also what the pure wildcard token `*` resolves to.
    Generic,
    Link,
    Template,
    Treebank,
    Ontology,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Doc,
        Category::Note,
        Category::Generic,
        Category::Link,
        Category::Template,
        Category::Treebank,
        Category::Ontology,
    ];

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doc" | "docs" | "text" => Ok(Category::Doc),
            "note" | "notes" => Ok(Category::Note),
            "generic" | "*" => Ok(Category::Generic),
            "link" | "links" | "relationship" => Ok(Category::Link),
            "template" | "templates" => Ok(Category::Template),
            "treebank" | "treebanks" => Ok(Category::Treebank),
            "ontology" => Ok(Category::Ontology),
            other => Err(AppError::unsupported("unsupported_category".to_string(), format!("unrecognized category '{}'", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Doc => "doc",
            Category::Note => "note",
            Category::Generic => "generic",
            Category::Link => "link",
            Category::Template => "template",
            Category::Treebank => "treebank",
            Category::Ontology => "ontology",
        }
    }

    /// Backend label for stored records of this category. Generic has none.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Category::Doc => Some("Doc"),
            Category::Note => Some("Note"),
            Category::Generic => None,
            Category::Link => Some("Link"),
            Category::Template => Some("Template"),
            Category::Treebank => Some("Treebank"),
            Category::Ontology => Some("Ontology"),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStrategy {
    #[default]
    Contains,
    StartsWith,
    EndsWith,
    Regex,
}

impl MatchStrategy {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "CONTAINS" | "C" => Ok(MatchStrategy::Contains),
            "STARTS_WITH" | "SW" => Ok(MatchStrategy::StartsWith),
            "ENDS_WITH" | "EW" => Ok(MatchStrategy::EndsWith),
            "REGEX" | "RX" => Ok(MatchStrategy::Regex),
            other => Err(AppError::validation("unknown_match_strategy".to_string(), format!("unknown match strategy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagOperator {
    #[default]
    All,
    Any,
}

impl TagOperator {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" | "AND" => Ok(TagOperator::All),
            "ANY" | "OR" => Ok(TagOperator::Any),
            other => Err(AppError::validation("unknown_tag_operator".to_string(), format!("unknown tag operator '{}'", other))),
        }
    }
}

/// Field the text query is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProperty {
    #[default]
    Value,
    Key,
    Topic,
    Id,
}

impl SearchProperty {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "value" => Ok(SearchProperty::Value),
            "key" => Ok(SearchProperty::Key),
            "topic" => Ok(SearchProperty::Topic),
            "id" => Ok(SearchProperty::Id),
            other => Err(AppError::validation("unknown_property".to_string(), format!("unknown search property '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Whole persisted record.
    #[default]
    Full,
    IdValue,
    /// id/value plus the diacritic- and punctuation-free form; matching runs on that form.
    IdValueStripped,
}

impl Projection {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "full" => Ok(Projection::Full),
            "id_value" | "idvalue" => Ok(Projection::IdValue),
            "id_value_stripped" | "nnp" => Ok(Projection::IdValueStripped),
            other => Err(AppError::validation("unknown_projection".to_string(), format!("unknown projection '{}'", other))),
        }
    }

    pub fn is_stripped(&self) -> bool { matches!(self, Projection::IdValueStripped) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    /// The category's natural sequence field.
    #[default]
    Natural,
    Value,
    Modified,
}

impl OrderBy {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "natural" | "seq" => Ok(OrderBy::Natural),
            "value" => Ok(OrderBy::Value),
            "modified" | "modified_when" => Ok(OrderBy::Modified),
            other => Err(AppError::validation("unknown_order".to_string(), format!("unknown order '{}'", other))),
        }
    }
}

/// `library[/sub[/sub]]`, e.g. `en_us_demo/me/m01`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub library: String,
    pub sub: Vec<String>,
}

impl Scope {
    pub fn parse(s: &str) -> AppResult<Self> {
        let parts: Vec<&str> = s.split('/').map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
        let Some((library, rest)) = parts.split_first() else {
            return Err(AppError::validation("empty_scope".to_string(), "search scope must name a library".to_string()));
        };
        if parts.iter().any(|p| p.contains(ID_DELIMITER)) {
            return Err(AppError::malformed("malformed_scope".to_string(), format!("scope '{}' contains the id delimiter", s)));
        }
        Ok(Self { library: library.to_string(), sub: rest.iter().map(|p| p.to_string()).collect() })
    }

    pub fn is_wildcard(&self) -> bool { is_wildcard_library(&self.library) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpec {
    pub category: Category,
    pub scope: String,
    #[serde(default)]
    pub text_query: String,
    #[serde(default)]
    pub property: SearchProperty,
    #[serde(default)]
    pub match_strategy: Option<MatchStrategy>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tag_operator: TagOperator,
    #[serde(default)]
    pub projection: Projection,
    #[serde(default)]
    pub order_by: OrderBy,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchSpec {
    pub fn new(category: Category, scope: impl Into<String>) -> Self {
        Self {
            category,
            scope: scope.into(),
            text_query: String::new(),
            property: SearchProperty::Value,
            match_strategy: None,
            tags: Vec::new(),
            tag_operator: TagOperator::All,
            projection: Projection::Full,
            order_by: OrderBy::Natural,
            limit: None,
        }
    }

    pub fn query(mut self, text: impl Into<String>) -> Self { self.text_query = text.into(); self }
    pub fn strategy(mut self, s: MatchStrategy) -> Self { self.match_strategy = Some(s); self }
    pub fn property(mut self, p: SearchProperty) -> Self { self.property = p; self }
    pub fn tags<I, S>(mut self, tags: I, op: TagOperator) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self.tag_operator = op;
        self
    }
    pub fn projection(mut self, p: Projection) -> Self { self.projection = p; self }
    pub fn order_by(mut self, o: OrderBy) -> Self { self.order_by = o; self }
    pub fn limit(mut self, n: usize) -> Self { self.limit = Some(n); self }

    /// Build from loosely typed JSON (controller/CLI input). Unknown categories fail with
    /// `UnsupportedCategory`; other unknown tokens with `ValidationError`.
    pub fn from_json(v: &serde_json::Value) -> AppResult<Self> {
        let s = |k: &str| v.get(k).and_then(|x| x.as_str()).unwrap_or("");
        let category = Category::parse(s("category"))?;
        let mut spec = SearchSpec::new(category, s("scope"));
        spec.text_query = s("text_query").to_string();
        spec.property = SearchProperty::parse(s("property"))?;
        spec.match_strategy = match s("match_strategy") {
            "" => None,
            m => Some(MatchStrategy::parse(m)?),
        };
        if let Some(arr) = v.get("tags").and_then(|x| x.as_array()) {
            spec.tags = arr.iter().filter_map(|t| t.as_str().map(|t| t.to_string())).collect();
        }
        spec.tag_operator = match s("tag_operator") { "" => TagOperator::All, t => TagOperator::parse(t)? };
        spec.projection = Projection::parse(s("projection"))?;
        spec.order_by = OrderBy::parse(s("order_by"))?;
        spec.limit = v.get("limit").and_then(|x| x.as_u64()).map(|n| n as usize);
        Ok(spec)
    }
}
