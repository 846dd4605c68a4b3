//! Document store façade: the only path through which documents are written or searched.
//!
//! Write order is fixed: schema validation, existence (Conflict / NotFound),
//! authorization, visibility assignment, stamping, then the single backend statement.

pub mod document;
pub mod tag_cache;

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::ident::{parse_id, user_record_id, window_bounds, SequenceIssuer};
use crate::identity::{Authorizer, RequestContext, Verb};
use crate::schema::SchemaRegistry;
use crate::search::compiler::{compile_context, compile_count, compile_delete, compile_insert, compile_replace, compile_search, compile_tags};
use crate::search::normalize::strip_diacritics_and_punctuation;
use crate::search::ast::{CompareOp, Field, Pattern, Predicate, QueryAst, Statement};
use crate::search::spec::{Projection, Scope, SearchSpec};
use crate::search::render::render;
use crate::storage::{Document, GraphBackend};
use crate::visibility::{assign_visibility, is_visible, needs_public_filter, Visibility};

pub use document::DocumentInput;
pub use tag_cache::TagCache;

/// Count-bearing search envelope. Zero rows is a successful, empty result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub values: Vec<Value>,
    pub value_count: usize,
    pub query_diagnostic: String,
}

impl SearchResult {
    fn new(values: Vec<Value>, query_diagnostic: String) -> Self {
        Self { value_count: values.len(), values, query_diagnostic }
    }
}

pub struct DocStore {
    backend: Arc<dyn GraphBackend>,
    authz: Arc<Authorizer>,
    schemas: Arc<dyn SchemaRegistry>,
    sequences: Arc<SequenceIssuer>,
    tag_cache: Option<Arc<TagCache>>,
}

impl DocStore {
    pub fn new(
        backend: Arc<dyn GraphBackend>,
        authz: Arc<Authorizer>,
        schemas: Arc<dyn SchemaRegistry>,
        sequences: Arc<SequenceIssuer>,
    ) -> Self {
        Self { backend, authz, schemas, sequences, tag_cache: None }
    }

    pub fn with_tag_cache(mut self, cache: Arc<TagCache>) -> Self {
        self.tag_cache = Some(cache);
        self
    }

    pub fn tag_cache(&self) -> Option<&Arc<TagCache>> { self.tag_cache.as_ref() }

    fn validate(&self, json: &Value) -> AppResult<(DocumentInput, String)> {
        if let Some(msg) = self.schemas.validate(json) {
            return Err(AppError::validation("schema_violation".to_string(), msg));
        }
        let input = DocumentInput::from_json(json)?;
        if self.authz.facts().library(&input.id.library).is_none() {
            return Err(AppError::not_found(
                "unknown_library".to_string(),
                format!("library '{}' is not registered", input.id.library),
            ));
        }
        Ok((input, self.schemas.schema_id_for(json)))
    }

    fn exists(&self, id: &str) -> AppResult<bool> {
        let rows = self.backend.execute_query(&compile_count(id))?;
        Ok(rows.first().and_then(|r| r.get("count")).and_then(|c| c.as_u64()).unwrap_or(0) > 0)
    }

    fn authorize(&self, ctx: &RequestContext, verb: Verb, library: &str) -> AppResult<()> {
        if self.authz.is_authorized(&ctx.requestor, verb, library) {
            Ok(())
        } else {
            Err(AppError::forbidden(
                "not_authorized".to_string(),
                format!("'{}' may not {} in '{}'", ctx.requestor, verb, library),
            ))
        }
    }

    /// Unfiltered single-record read for internal use.
    fn fetch(&self, id: &str) -> AppResult<Option<Document>> {
        let parsed = parse_id(id)?;
        let q = render(Statement::Search(QueryAst {
            pattern: Pattern::Node { labels: vec![parsed.library] },
            predicates: vec![Predicate::Compare { field: Field::Id, op: CompareOp::Eq, value: id.to_string() }],
            projection: Projection::Full,
            order_by: vec![Field::Id],
            limit: Some(1),
        }));
        match self.backend.execute_query(&q)?.first() {
            Some(row) => Ok(Some(Document::from_row(row)?)),
            None => Ok(None),
        }
    }

    fn home_library(&self, user: &str) -> Option<String> {
        self.authz.facts().user(user).map(|u| u.home_library)
    }

    fn refresh_tags(&self, library: &str) {
        if let Some(c) = &self.tag_cache {
            c.schedule_rebuild(library);
        }
    }

    pub fn create(&self, ctx: &RequestContext, json: &Value) -> AppResult<Document> {
        let (input, schema_id) = self.validate(json)?;
        let id = input.id.canonical();
        if self.exists(&id)? {
            return Err(AppError::conflict("duplicate_id".to_string(), format!("'{}' already exists", id)));
        }
        self.authorize(ctx, Verb::Post, &input.id.library)?;
        let home = self.home_library(&ctx.requestor);
        let visibility = assign_visibility(&self.authz, &ctx.requestor, home.as_deref(), &input.id.library, input.visibility)?;
        let seq = self.sequences.next(&input.id.library, &input.id.topic)?;
        let now = Utc::now();
        let doc = Document {
            id: id.clone(),
            library: input.id.library.clone(),
            topic: input.id.topic.clone(),
            key: input.id.key.clone(),
            category: input.category,
            nnp: strip_diacritics_and_punctuation(&input.value),
            value: input.value,
            tags: input.tags,
            payload: input.payload,
            link: input.link,
            visibility,
            seq,
            schema_id,
            created_by: ctx.requestor.clone(),
            created_when: now,
            modified_by: ctx.requestor.clone(),
            modified_when: now,
        };
        self.backend.execute_query(&compile_insert(doc.clone()))?;
        info!(target: "folio::docstore", "create id='{}' by='{}' visibility={} rid={}", id, ctx.requestor, visibility, ctx.request_id);
        self.refresh_tags(&doc.library);
        Ok(doc)
    }

    /// Replace the mutable part of an existing record. Creation stamps, sequence and
    /// category never change; visibility changes only when explicitly requested.
    pub fn update(&self, ctx: &RequestContext, json: &Value) -> AppResult<Document> {
        let (input, schema_id) = self.validate(json)?;
        let id = input.id.canonical();
        if !self.exists(&id)? {
            return Err(AppError::not_found("unknown_id".to_string(), format!("'{}' does not exist", id)));
        }
        self.authorize(ctx, Verb::Put, &input.id.library)?;
        let existing = self
            .fetch(&id)?
            .ok_or_else(|| AppError::not_found("unknown_id".to_string(), format!("'{}' does not exist", id)))?;
        if existing.category != input.category {
            return Err(AppError::validation(
                "category_change".to_string(),
                format!("'{}' is a {} record, not {}", id, existing.category, input.category),
            ));
        }
        let visibility = match input.visibility {
            Some(v) if v != existing.visibility => {
                let home = self.home_library(&ctx.requestor);
                assign_visibility(&self.authz, &ctx.requestor, home.as_deref(), &input.id.library, Some(v))?
            }
            _ => existing.visibility,
        };
        let doc = Document {
            nnp: strip_diacritics_and_punctuation(&input.value),
            value: input.value,
            tags: input.tags,
            payload: input.payload,
            link: input.link,
            visibility,
            schema_id,
            modified_by: ctx.requestor.clone(),
            modified_when: Utc::now(),
            ..existing
        };
        self.backend.execute_query(&compile_replace(doc.clone()))?;
        info!(target: "folio::docstore", "update id='{}' by='{}' rid={}", id, ctx.requestor, ctx.request_id);
        self.refresh_tags(&doc.library);
        Ok(doc)
    }

    /// Compile and run a search. Records the requestor may not see are filtered out, so an
    /// unauthorized reader gets an empty result rather than an error.
    pub fn search(&self, ctx: &RequestContext, spec: &SearchSpec) -> AppResult<SearchResult> {
        let scope = Scope::parse(&spec.scope)?;
        let public_only = needs_public_filter(&self.authz, &scope.library, &ctx.requestor);
        let compiled = compile_search(spec, public_only)?;
        let rows = self.backend.execute_query(&compiled)?;
        let values: Vec<Value> = rows.into_iter().filter(|r| row_visible(r, public_only)).collect();
        debug!(target: "folio::search", "search by='{}' scope='{}' public_only={} rows={} rid={}", ctx.requestor, spec.scope, public_only, values.len(), ctx.request_id);
        Ok(SearchResult::new(values, compiled.text))
    }

    /// Alias kept for controller code that speaks in CRUD terms.
    pub fn read(&self, ctx: &RequestContext, spec: &SearchSpec) -> AppResult<SearchResult> { self.search(ctx, spec) }

    pub fn delete(&self, ctx: &RequestContext, id: &str) -> AppResult<()> {
        let parsed = parse_id(id)?;
        if user_record_id(&ctx.requestor).map(|own| own == id).unwrap_or(false) {
            return Err(AppError::forbidden("self_delete".to_string(), format!("'{}' may not delete their own identity record", ctx.requestor)));
        }
        self.authorize(ctx, Verb::Delete, &parsed.library)?;
        if !self.exists(id)? {
            return Err(AppError::not_found("unknown_id".to_string(), format!("'{}' does not exist", id)));
        }
        self.backend.execute_query(&compile_delete(id))?;
        info!(target: "folio::docstore", "delete id='{}' by='{}' rid={}", id, ctx.requestor, ctx.request_id);
        self.refresh_tags(&parsed.library);
        Ok(())
    }

    /// Up to `n` visible records either side of `id` in the same (library, topic), in
    /// sequence order. An anchor the requestor cannot see yields an empty result.
    pub fn context(&self, ctx: &RequestContext, id: &str, n: u64) -> AppResult<SearchResult> {
        let parsed = parse_id(id)?;
        let public_only = needs_public_filter(&self.authz, &parsed.library, &ctx.requestor);
        let Some(anchor) = self.fetch(id)? else {
            return Ok(SearchResult::new(Vec::new(), String::new()));
        };
        if !is_visible(anchor.visibility, public_only) {
            return Ok(SearchResult::new(Vec::new(), String::new()));
        }
        let (start, end) = window_bounds(&anchor.seq, n)?;
        let compiled = compile_context(&anchor.library, &anchor.topic, &start, &end, public_only);
        let rows = self.backend.execute_query(&compiled)?;
        let values: Vec<Value> = rows.into_iter().filter(|r| row_visible(r, public_only)).collect();
        Ok(SearchResult::new(values, compiled.text))
    }

    /// Sorted distinct tags used in a library. Served from the cache when one is attached.
    /// Readers under the visibility filter only see tags of PUBLIC records.
    pub fn tags(&self, ctx: &RequestContext, library: &str) -> AppResult<Vec<String>> {
        if !self.authz.is_authorized(&ctx.requestor, Verb::Get, library) {
            return Ok(Vec::new());
        }
        let public_only = needs_public_filter(&self.authz, library, &ctx.requestor);
        if let Some(c) = &self.tag_cache {
            if let Some(t) = c.get(library, public_only) { return Ok(t); }
            return c.rebuild(library, public_only);
        }
        let rows = self.backend.execute_query(&compile_tags(library, public_only))?;
        Ok(tag_cache::tag_column(&rows))
    }
}

/// Second line of defence behind the compiled predicate: rows that carry a visibility
/// must be PUBLIC when filtering applies.
fn row_visible(row: &Value, public_only: bool) -> bool {
    match row.get("visibility").and_then(|v| v.as_str()).map(Visibility::parse) {
        Some(Ok(v)) => is_visible(v, public_only),
        Some(Err(_)) => !public_only,
        None => true,
    }
}
