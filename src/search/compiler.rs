//! SearchSpec -> QueryAst -> CompiledQuery.
//!
//! Each category has its own profile (labels, sub-scope handling, natural order). The
//! pipeline is shared: normalize text, resolve scope, one match strategy, tags, the
//! public-only guard, then projection and a deterministic order.

use regex::Regex;
use tracing::debug;

use super::ast::{CompareOp, CompiledQuery, Field, Pattern, Predicate, QueryAst, Statement};
use super::normalize::{normalize_nfc, strip_diacritics, strip_diacritics_and_punctuation};
use super::render::render;
use super::spec::{Category, MatchStrategy, OrderBy, Projection, Scope, SearchProperty, SearchSpec, TagOperator};
use crate::error::{AppError, AppResult};
use crate::ident::{ALL_DOMAINS, SYSTEM_LIBRARY};
use crate::storage::document::Document;
use crate::visibility::Visibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubScope {
    /// Segments joined with `.` must prefix the topic (book, book.chapter).
    TopicPrefix,
    /// Single segment equal to the topic.
    TopicExact,
    Forbidden,
}

#[derive(Debug, Clone, Copy)]
struct Profile {
    relationship: bool,
    max_sub: usize,
    sub: SubScope,
    natural: &'static [Field],
}

const BY_SEQ: &[Field] = &[Field::Seq, Field::Id];
const BY_ID: &[Field] = &[Field::Id];

fn profile(category: Category) -> Profile {
    match category {
        Category::Doc => Profile { relationship: false, max_sub: 2, sub: SubScope::TopicPrefix, natural: BY_SEQ },
        Category::Treebank => Profile { relationship: false, max_sub: 2, sub: SubScope::TopicPrefix, natural: BY_SEQ },
        Category::Note => Profile { relationship: false, max_sub: 1, sub: SubScope::TopicPrefix, natural: BY_SEQ },
        Category::Ontology => Profile { relationship: false, max_sub: 1, sub: SubScope::TopicExact, natural: BY_ID },
        Category::Link => Profile { relationship: true, max_sub: 1, sub: SubScope::TopicExact, natural: BY_ID },
        Category::Template => Profile { relationship: false, max_sub: 0, sub: SubScope::Forbidden, natural: BY_ID },
        Category::Generic => Profile { relationship: false, max_sub: 0, sub: SubScope::Forbidden, natural: BY_ID },
    }
}

fn text_field(property: SearchProperty, projection: Projection) -> Field {
    match (property, projection) {
        (SearchProperty::Value, Projection::IdValueStripped) => Field::Nnp,
        (SearchProperty::Value, _) => Field::Value,
        (SearchProperty::Key, _) => Field::Key,
        (SearchProperty::Topic, _) => Field::Topic,
        (SearchProperty::Id, _) => Field::Id,
    }
}

fn tenant_predicates(scope: &Scope) -> Vec<Predicate> {
    if scope.library == SYSTEM_LIBRARY {
        Vec::new()
    } else if scope.library == ALL_DOMAINS {
        vec![Predicate::Compare { field: Field::Library, op: CompareOp::Ne, value: SYSTEM_LIBRARY.to_string() }]
    } else {
        vec![Predicate::Compare { field: Field::Library, op: CompareOp::Eq, value: scope.library.clone() }]
    }
}

/// Resolve the structural filter for a scope under a category profile.
fn resolve_scope(category: Category, p: &Profile, scope: &Scope) -> AppResult<(Pattern, Vec<Predicate>)> {
    if scope.sub.len() > p.max_sub {
        return Err(AppError::validation(
            "scope_too_deep".to_string(),
            format!("{} scope accepts at most {} sub-scope segment(s), got '{}'", category, p.max_sub, scope.sub.join("/")),
        ));
    }
    let mut preds = Vec::new();
    let pattern = if p.relationship {
        preds.extend(tenant_predicates(scope));
        Pattern::Relationship { rel_type: category.label().unwrap_or("Link").to_string() }
    } else {
        let mut labels = Vec::new();
        if let Some(l) = category.label() { labels.push(l.to_string()); }
        if scope.is_wildcard() {
            preds.extend(tenant_predicates(scope));
        } else {
            labels.push(scope.library.clone());
        }
        Pattern::Node { labels }
    };
    if !scope.sub.is_empty() {
        match p.sub {
            SubScope::TopicPrefix => preds.push(Predicate::Text {
                field: Field::Topic,
                strategy: MatchStrategy::StartsWith,
                needle: normalize_nfc(&scope.sub.join(".")),
            }),
            SubScope::TopicExact => preds.push(Predicate::Compare {
                field: Field::Topic,
                op: CompareOp::Eq,
                value: normalize_nfc(&scope.sub[0]),
            }),
            SubScope::Forbidden => {}
        }
    }
    Ok((pattern, preds))
}

/// Comparison form of the query text. Against `nnp` a regex only loses its diacritics, since
/// its punctuation is syntax; literal needles lose punctuation too and must keep something.
fn text_needle(spec: &SearchSpec, strategy: MatchStrategy) -> AppResult<String> {
    if !(spec.projection.is_stripped() && spec.property == SearchProperty::Value) {
        return Ok(normalize_nfc(&spec.text_query));
    }
    if strategy == MatchStrategy::Regex {
        return Ok(strip_diacritics(&spec.text_query));
    }
    let needle = strip_diacritics_and_punctuation(&spec.text_query);
    if needle.is_empty() {
        return Err(AppError::validation(
            "empty_query".to_string(),
            format!("query '{}' is empty once punctuation is stripped", spec.text_query),
        ));
    }
    Ok(needle)
}

/// Build the AST for a search. `public_only` comes from the visibility policy.
pub fn build_search(spec: &SearchSpec, public_only: bool) -> AppResult<QueryAst> {
    let scope = Scope::parse(&spec.scope)?;
    if spec.category == Category::Generic && scope.is_wildcard() {
        return Err(AppError::unsupported(
            "wildcard_generic".to_string(),
            format!("generic search over wildcard scope '{}' is not supported", scope.library),
        ));
    }
    let p = profile(spec.category);
    let (pattern, mut predicates) = resolve_scope(spec.category, &p, &scope)?;

    if !spec.text_query.is_empty() {
        let strategy = spec.match_strategy.unwrap_or_default();
        let needle = text_needle(spec, strategy)?;
        if strategy == MatchStrategy::Regex {
            Regex::new(&needle).map_err(|e| AppError::validation("invalid_regex".to_string(), format!("invalid regex '{}': {}", needle, e)))?;
        }
        predicates.push(Predicate::Text { field: text_field(spec.property, spec.projection), strategy, needle });
    }

    let tags: Vec<String> = spec.tags.iter().map(|t| normalize_nfc(t.trim())).filter(|t| !t.is_empty()).collect();
    if !tags.is_empty() {
        predicates.push(match spec.tag_operator {
            TagOperator::All => Predicate::TagsAll(tags),
            TagOperator::Any => Predicate::TagsAny(tags),
        });
    }

    if public_only {
        predicates.push(Predicate::VisibilityIs(Visibility::Public));
    }

    let order_by = match spec.order_by {
        OrderBy::Natural => p.natural.to_vec(),
        OrderBy::Value => vec![Field::Value, Field::Id],
        OrderBy::Modified => vec![Field::ModifiedWhen, Field::Id],
    };
    Ok(QueryAst { pattern, predicates, projection: spec.projection, order_by, limit: spec.limit })
}

pub fn compile_search(spec: &SearchSpec, public_only: bool) -> AppResult<CompiledQuery> {
    let ast = build_search(spec, public_only)?;
    let compiled = render(Statement::Search(ast));
    debug!(target: "folio::search", "compiled category={} scope='{}' public_only={} query={}", spec.category, spec.scope, public_only, compiled.text);
    Ok(compiled)
}

/// Records of one (library, topic) whose sequence falls in `[start_seq, end_seq]`.
pub fn compile_context(library: &str, topic: &str, start_seq: &str, end_seq: &str, public_only: bool) -> CompiledQuery {
    let mut predicates = vec![
        Predicate::Compare { field: Field::Library, op: CompareOp::Eq, value: library.to_string() },
        Predicate::Compare { field: Field::Topic, op: CompareOp::Eq, value: topic.to_string() },
        Predicate::Compare { field: Field::Seq, op: CompareOp::Ge, value: start_seq.to_string() },
        Predicate::Compare { field: Field::Seq, op: CompareOp::Le, value: end_seq.to_string() },
    ];
    if public_only {
        predicates.push(Predicate::VisibilityIs(Visibility::Public));
    }
    render(Statement::Search(QueryAst {
        pattern: Pattern::Node { labels: vec![library.to_string()] },
        predicates,
        projection: Projection::Full,
        order_by: BY_SEQ.to_vec(),
        limit: None,
    }))
}

pub fn compile_insert(doc: Document) -> CompiledQuery { render(Statement::Insert(Box::new(doc))) }

pub fn compile_replace(doc: Document) -> CompiledQuery { render(Statement::Replace(Box::new(doc))) }

pub fn compile_delete(id: &str) -> CompiledQuery { render(Statement::Delete { id: id.to_string() }) }

pub fn compile_count(id: &str) -> CompiledQuery { render(Statement::CountById { id: id.to_string() }) }

pub fn compile_tags(library: &str, public_only: bool) -> CompiledQuery {
    render(Statement::DistinctTags { library: library.to_string(), public_only })
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod compiler_tests;
