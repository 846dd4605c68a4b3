//! In-process graph backend that evaluates the query AST directly.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use parking_lot::RwLock;
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use super::document::Document;
use super::GraphBackend;
use crate::error::{AppError, AppResult};
use crate::search::ast::{CompareOp, CompiledQuery, Field, Pattern, Predicate, QueryAst, Statement};
use crate::search::spec::MatchStrategy;
use crate::visibility::is_visible;

pub struct MemoryGraph {
    docs: RwLock<BTreeMap<String, Document>>,
    available: AtomicBool,
}

impl Default for MemoryGraph {
    fn default() -> Self { Self::new() }
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self { docs: RwLock::new(BTreeMap::new()), available: AtomicBool::new(true) }
    }

    pub fn from_documents(docs: Vec<Document>) -> Self {
        let g = Self::new();
        {
            let mut w = g.docs.write();
            for d in docs { w.insert(d.id.clone(), d); }
        }
        g
    }

    /// Simulate the backend going away (or coming back).
    pub fn set_available(&self, up: bool) { self.available.store(up, AtomicOrdering::SeqCst); }

    pub fn documents(&self) -> Vec<Document> { self.docs.read().values().cloned().collect() }

    pub fn len(&self) -> usize { self.docs.read().len() }

    pub fn is_empty(&self) -> bool { self.docs.read().is_empty() }

    fn search(&self, q: &QueryAst) -> AppResult<Vec<Value>> {
        let regexes = compile_regexes(q)?;
        let r = self.docs.read();
        let mut hits: Vec<&Document> = r
            .values()
            .filter(|d| pattern_matches(&q.pattern, d))
            .filter(|d| q.predicates.iter().all(|p| predicate_matches(p, d, &regexes)))
            .collect();
        hits.sort_by(|a, b| compare_docs(a, b, &q.order_by));
        let limit = q.limit.unwrap_or(usize::MAX);
        Ok(hits.into_iter().take(limit).map(|d| d.project(q.projection)).collect())
    }
}

fn field_text(d: &Document, f: Field) -> Option<Cow<'_, str>> {
    match f {
        Field::ModifiedWhen => Some(Cow::Owned(d.modified_when.format("%Y-%m-%dT%H:%M:%S%.9f").to_string())),
        other => d.field(other).map(Cow::Borrowed),
    }
}

fn pattern_matches(p: &Pattern, d: &Document) -> bool {
    match p {
        Pattern::Node { labels } => {
            let have = d.labels();
            labels.iter().all(|l| have.contains(l))
        }
        Pattern::Relationship { rel_type } => d.category.label() == Some(rel_type.as_str()),
    }
}

/// Cypher `=~` is a whole-string match.
fn compile_regexes(q: &QueryAst) -> AppResult<BTreeMap<String, Regex>> {
    let mut out = BTreeMap::new();
    for p in &q.predicates {
        if let Predicate::Text { strategy: MatchStrategy::Regex, needle, .. } = p {
            let re = Regex::new(&format!("^(?:{})$", needle))
                .map_err(|e| AppError::validation("invalid_regex".to_string(), e.to_string()))?;
            out.insert(needle.clone(), re);
        }
    }
    Ok(out)
}

fn predicate_matches(p: &Predicate, d: &Document, regexes: &BTreeMap<String, Regex>) -> bool {
    match p {
        Predicate::Compare { field, op, value } => {
            let Some(v) = field_text(d, *field) else { return false; };
            let v = v.as_ref();
            match op {
                CompareOp::Eq => v == value,
                CompareOp::Ne => v != value,
                CompareOp::Ge => v >= value.as_str(),
                CompareOp::Le => v <= value.as_str(),
            }
        }
        Predicate::Text { field, strategy, needle } => {
            let Some(v) = field_text(d, *field) else { return false; };
            match strategy {
                MatchStrategy::Contains => v.contains(needle.as_str()),
                MatchStrategy::StartsWith => v.starts_with(needle.as_str()),
                MatchStrategy::EndsWith => v.ends_with(needle.as_str()),
                MatchStrategy::Regex => regexes.get(needle).map(|re| re.is_match(&v)).unwrap_or(false),
            }
        }
        Predicate::TagsAll(tags) => tags.iter().all(|t| d.tags.contains(t)),
        Predicate::TagsAny(tags) => tags.iter().any(|t| d.tags.contains(t)),
        Predicate::VisibilityIs(v) => d.visibility == *v,
    }
}

fn compare_docs(a: &Document, b: &Document, order: &[Field]) -> Ordering {
    for f in order {
        let ka = field_text(a, *f).unwrap_or(Cow::Borrowed(""));
        let kb = field_text(b, *f).unwrap_or(Cow::Borrowed(""));
        match ka.cmp(&kb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.id.cmp(&b.id)
}

impl GraphBackend for MemoryGraph {
    fn execute_query(&self, query: &CompiledQuery) -> AppResult<Vec<Value>> {
        if !self.connection_ok() {
            return Err(AppError::unavailable("backend_down".to_string(), "graph backend is not available".to_string()));
        }
        debug!(target: "folio::storage", "execute kind={} text={}", query.statement.kind(), query.text);
        match &query.statement {
            Statement::Search(q) => self.search(q),
            Statement::Insert(doc) => {
                let mut w = self.docs.write();
                if w.contains_key(&doc.id) {
                    return Err(AppError::conflict("duplicate_id".to_string(), format!("'{}' already exists", doc.id)));
                }
                w.insert(doc.id.clone(), (**doc).clone());
                Ok(vec![json!({ "id": doc.id })])
            }
            Statement::Replace(doc) => {
                let mut w = self.docs.write();
                match w.get_mut(&doc.id) {
                    Some(slot) => {
                        *slot = (**doc).clone();
                        Ok(vec![json!({ "id": doc.id })])
                    }
                    None => Err(AppError::not_found("unknown_id".to_string(), format!("'{}' does not exist", doc.id))),
                }
            }
            Statement::Delete { id } => {
                let removed = self.docs.write().remove(id).is_some();
                Ok(vec![json!({ "deleted": if removed { 1 } else { 0 } })])
            }
            Statement::CountById { id } => {
                let n = if self.docs.read().contains_key(id) { 1 } else { 0 };
                Ok(vec![json!({ "count": n })])
            }
            Statement::DistinctTags { library, public_only } => {
                let r = self.docs.read();
                let tags: BTreeSet<&str> = r
                    .values()
                    .filter(|d| &d.library == library && is_visible(d.visibility, *public_only))
                    .flat_map(|d| d.tags.iter().map(|t| t.as_str()))
                    .collect();
                Ok(tags.into_iter().map(|t| json!({ "tag": t })).collect())
            }
        }
    }

    fn connection_ok(&self) -> bool { self.available.load(AtomicOrdering::SeqCst) }
}
