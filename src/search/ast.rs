//! Backend-agnostic query tree. The compiler builds these; `render` serializes them to
//! the backend's query text as a last step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::spec::{MatchStrategy, Projection};
use crate::storage::document::Document;
use crate::visibility::Visibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Library,
    Topic,
    Key,
    Value,
    Nnp,
    Seq,
    Visibility,
    Tags,
    SchemaId,
    ModifiedWhen,
    From,
    To,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Library => "library",
            Field::Topic => "topic",
            Field::Key => "key",
            Field::Value => "value",
            Field::Nnp => "nnp",
            Field::Seq => "seq",
            Field::Visibility => "visibility",
            Field::Tags => "tags",
            Field::SchemaId => "schema_id",
            Field::ModifiedWhen => "modified_when",
            Field::From => "from",
            Field::To => "to",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Ge,
    Le,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Compare { field: Field, op: CompareOp, value: String },
    Text { field: Field, strategy: MatchStrategy, needle: String },
    TagsAll(Vec<String>),
    TagsAny(Vec<String>),
    VisibilityIs(Visibility),
}

/// Structural part of the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// Node match; every label must be present on the record.
    Node { labels: Vec<String> },
    /// Relationship match by type; tenant restriction lives in the predicates.
    Relationship { rel_type: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAst {
    pub pattern: Pattern,
    pub predicates: Vec<Predicate>,
    pub projection: Projection,
    pub order_by: Vec<Field>,
    pub limit: Option<usize>,
}

impl QueryAst {
    pub fn visibility_predicates(&self) -> usize {
        self.predicates.iter().filter(|p| matches!(p, Predicate::VisibilityIs(_))).count()
    }

    pub fn is_public_only(&self) -> bool {
        self.predicates.iter().any(|p| matches!(p, Predicate::VisibilityIs(Visibility::Public)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Search(QueryAst),
    Insert(Box<Document>),
    Replace(Box<Document>),
    Delete { id: String },
    CountById { id: String },
    /// Distinct tags of a library; `public_only` restricts to PUBLIC records.
    DistinctTags { library: String, public_only: bool },
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Search(_) => "search",
            Statement::Insert(_) => "insert",
            Statement::Replace(_) => "replace",
            Statement::Delete { .. } => "delete",
            Statement::CountById { .. } => "count",
            Statement::DistinctTags { .. } => "tags",
        }
    }
}

/// A statement together with its rendered text and bound parameters. The text doubles as
/// the `query_diagnostic` returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub statement: Statement,
    pub text: String,
    pub params: BTreeMap<String, serde_json::Value>,
}
