//! Serializes a `Statement` to parameterized Cypher. User text never lands in the query
//! string; it is always bound as `$pN`.

use std::collections::BTreeMap;

use serde_json::Value;

use super::ast::{CompareOp, CompiledQuery, Field, Pattern, Predicate, QueryAst, Statement};
use super::spec::{MatchStrategy, Projection};
use crate::visibility::Visibility;

struct Params {
    next: usize,
    map: BTreeMap<String, Value>,
}

impl Params {
    fn new() -> Self { Self { next: 0, map: BTreeMap::new() } }

    fn bind(&mut self, v: Value) -> String {
        let name = format!("p{}", self.next);
        self.next += 1;
        self.map.insert(name.clone(), v);
        format!("${}", name)
    }
}

/// Backtick-quoted label; embedded backticks are doubled.
fn label(l: &str) -> String { format!("`{}`", l.replace('`', "``")) }

fn prop(f: Field) -> String { format!("n.{}", f.as_str()) }

fn render_predicate(p: &Predicate, params: &mut Params) -> String {
    match p {
        Predicate::Compare { field, op, value } => {
            let sym = match op { CompareOp::Eq => "=", CompareOp::Ne => "<>", CompareOp::Ge => ">=", CompareOp::Le => "<=" };
            format!("{} {} {}", prop(*field), sym, params.bind(Value::String(value.clone())))
        }
        Predicate::Text { field, strategy, needle } => {
            let op = match strategy {
                MatchStrategy::Contains => "CONTAINS",
                MatchStrategy::StartsWith => "STARTS WITH",
                MatchStrategy::EndsWith => "ENDS WITH",
                MatchStrategy::Regex => "=~",
            };
            format!("{} {} {}", prop(*field), op, params.bind(Value::String(needle.clone())))
        }
        Predicate::TagsAll(tags) => {
            format!("ALL(t IN {} WHERE t IN n.tags)", params.bind(tags.clone().into()))
        }
        Predicate::TagsAny(tags) => {
            format!("ANY(t IN {} WHERE t IN n.tags)", params.bind(tags.clone().into()))
        }
        Predicate::VisibilityIs(v) => {
            format!("n.visibility = {}", params.bind(Value::String(v.as_str().to_string())))
        }
    }
}

fn render_search(q: &QueryAst, params: &mut Params) -> String {
    let mut out = match &q.pattern {
        Pattern::Node { labels } => {
            let ls: String = labels.iter().map(|l| format!(":{}", label(l))).collect();
            format!("MATCH (n{})", ls)
        }
        Pattern::Relationship { rel_type } => format!("MATCH (a)-[n:{}]->(b)", label(rel_type)),
    };
    if !q.predicates.is_empty() {
        let clauses: Vec<String> = q.predicates.iter().map(|p| render_predicate(p, params)).collect();
        out.push_str(" WHERE ");
        out.push_str(&clauses.join(" AND "));
    }
    let ret = match q.projection {
        Projection::Full => "n".to_string(),
        Projection::IdValue => "n.id AS id, n.value AS value".to_string(),
        Projection::IdValueStripped => "n.id AS id, n.value AS value, n.nnp AS nnp".to_string(),
    };
    out.push_str(" RETURN ");
    out.push_str(&ret);
    if !q.order_by.is_empty() {
        let keys: Vec<String> = q.order_by.iter().map(|f| prop(*f)).collect();
        out.push_str(" ORDER BY ");
        out.push_str(&keys.join(", "));
    }
    if let Some(n) = q.limit {
        out.push_str(&format!(" LIMIT {}", n));
    }
    out
}

pub fn render(statement: Statement) -> CompiledQuery {
    let mut params = Params::new();
    let text = match &statement {
        Statement::Search(q) => render_search(q, &mut params),
        Statement::Insert(doc) => {
            let labels: String = doc.labels().iter().map(|l| format!(":{}", label(l))).collect();
            format!("CREATE (n{} {})", labels, params.bind(doc.to_json()))
        }
        Statement::Replace(doc) => {
            let id = params.bind(Value::String(doc.id.clone()));
            format!("MATCH (n {{id: {}}}) SET n = {}", id, params.bind(doc.to_json()))
        }
        Statement::Delete { id } => {
            format!("MATCH (n {{id: {}}}) DETACH DELETE n", params.bind(Value::String(id.clone())))
        }
        Statement::CountById { id } => {
            format!("MATCH (n {{id: {}}}) RETURN count(n) AS count", params.bind(Value::String(id.clone())))
        }
        Statement::DistinctTags { library, public_only } => {
            let filter = if *public_only {
                format!(" WHERE n.visibility = {}", params.bind(Value::String(Visibility::Public.as_str().to_string())))
            } else {
                String::new()
            };
            format!("MATCH (n:{}){} UNWIND n.tags AS tag RETURN DISTINCT tag ORDER BY tag", label(library), filter)
        }
    };
    CompiledQuery { statement, text, params: params.map }
}
