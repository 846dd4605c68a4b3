use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use super::*;
use crate::error::AppError;
use crate::identity::{Library, RoleStore};
use crate::search::compiler::{compile_count, compile_delete, compile_insert, compile_search, compile_tags};
use crate::search::spec::{Category, MatchStrategy, OrderBy, Projection, SearchSpec, TagOperator};
use crate::visibility::Visibility;

fn doc(library: &str, topic: &str, key: &str, ordinal: u64, value: &str, tags: &[&str], vis: Visibility) -> Document {
    let now = Utc::now();
    Document {
        id: crate::ident::build_id(library, topic, key).unwrap(),
        library: library.into(),
        topic: topic.into(),
        key: key.into(),
        category: Category::Doc,
        value: value.into(),
        nnp: crate::search::normalize::strip_diacritics_and_punctuation(value),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        payload: json!({}),
        link: None,
        visibility: vis,
        seq: crate::ident::build_sequence(library, topic, ordinal).unwrap(),
        schema_id: "doc".into(),
        created_by: "alice".into(),
        created_when: now,
        modified_by: "alice".into(),
        modified_when: now,
    }
}

fn seeded() -> MemoryGraph {
    MemoryGraph::from_documents(vec![
        doc("en_us_demo", "me.m01", "a", 2, "Pascha is here", &["feast"], Visibility::Public),
        doc("en_us_demo", "me.m01", "b", 1, "Pascal wrote", &["math"], Visibility::Private),
        doc("en_us_demo", "me.m02", "c", 1, "Πάσχα!", &["feast", "greek"], Visibility::Personal),
        doc("en_us_other", "me.m01", "a", 1, "Pascha elsewhere", &["feast"], Visibility::Public),
    ])
}

fn ids(rows: &[serde_json::Value]) -> Vec<String> {
    rows.iter().map(|r| r["id"].as_str().unwrap_or_default().to_string()).collect()
}

#[test]
fn search_filters_by_tenant_and_orders_by_sequence() {
    let g = seeded();
    let q = compile_search(&SearchSpec::new(Category::Doc, "en_us_demo").query("Pasc").strategy(MatchStrategy::StartsWith), false).unwrap();
    let rows = g.execute_query(&q).unwrap();
    assert_eq!(ids(&rows), vec!["en_us_demo~me.m01~b", "en_us_demo~me.m01~a"]);
}

#[test]
fn public_only_hides_private_and_personal() {
    let g = seeded();
    let q = compile_search(&SearchSpec::new(Category::Doc, "en_us_demo"), true).unwrap();
    let rows = g.execute_query(&q).unwrap();
    assert_eq!(ids(&rows), vec!["en_us_demo~me.m01~a"]);
}

#[test]
fn tag_operators() {
    let g = seeded();
    let any = compile_search(&SearchSpec::new(Category::Doc, "en_us_demo").tags(["math", "greek"], TagOperator::Any), false).unwrap();
    assert_eq!(g.execute_query(&any).unwrap().len(), 2);
    let all = compile_search(&SearchSpec::new(Category::Doc, "en_us_demo").tags(["feast", "greek"], TagOperator::All), false).unwrap();
    assert_eq!(ids(&g.execute_query(&all).unwrap()), vec!["en_us_demo~me.m02~c"]);
}

#[test]
fn stripped_projection_matches_without_accents() {
    let g = seeded();
    let q = compile_search(
        &SearchSpec::new(Category::Doc, "en_us_demo").query("Πασχα").projection(Projection::IdValueStripped),
        false,
    ).unwrap();
    let rows = g.execute_query(&q).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["nnp"], json!("Πασχα"));
}

#[test]
fn regex_is_whole_value_match() {
    let g = seeded();
    let q = compile_search(&SearchSpec::new(Category::Doc, "en_us_demo").query("Pasc.*here").strategy(MatchStrategy::Regex), false).unwrap();
    assert_eq!(ids(&g.execute_query(&q).unwrap()), vec!["en_us_demo~me.m01~a"]);
    let q = compile_search(&SearchSpec::new(Category::Doc, "en_us_demo").query("Pasc").strategy(MatchStrategy::Regex), false).unwrap();
    assert!(g.execute_query(&q).unwrap().is_empty());
}

#[test]
fn ends_with_matches_value_suffix() {
    let g = seeded();
    let q = compile_search(&SearchSpec::new(Category::Doc, "en_us_demo").query("wrote").strategy(MatchStrategy::EndsWith), false).unwrap();
    assert_eq!(ids(&g.execute_query(&q).unwrap()), vec!["en_us_demo~me.m01~b"]);
    let q = compile_search(
        &SearchSpec::new(Category::Doc, "en_us_demo").query("σχα").strategy(MatchStrategy::EndsWith).projection(Projection::IdValueStripped),
        false,
    ).unwrap();
    assert_eq!(ids(&g.execute_query(&q).unwrap()), vec!["en_us_demo~me.m02~c"]);
    // the raw value still ends with '!', so an unstripped suffix search misses it
    let q = compile_search(&SearchSpec::new(Category::Doc, "en_us_demo").query("σχα").strategy(MatchStrategy::EndsWith), false).unwrap();
    assert!(g.execute_query(&q).unwrap().is_empty());
}

#[test]
fn stripped_regex_matches_normalized_value() {
    let g = seeded();
    let q = compile_search(
        &SearchSpec::new(Category::Doc, "en_us_demo").query("Πάσχα.*").strategy(MatchStrategy::Regex).projection(Projection::IdValueStripped),
        false,
    ).unwrap();
    assert_eq!(ids(&g.execute_query(&q).unwrap()), vec!["en_us_demo~me.m02~c"]);
    let q = compile_search(
        &SearchSpec::new(Category::Doc, "en_us_demo").query("Pasc(ha|al).*").strategy(MatchStrategy::Regex).projection(Projection::IdValueStripped),
        false,
    ).unwrap();
    assert_eq!(ids(&g.execute_query(&q).unwrap()).len(), 2);
}

#[test]
fn order_by_value_and_modified() {
    let g = seeded();
    let q = compile_search(&SearchSpec::new(Category::Doc, "en_us_demo").order_by(OrderBy::Value), false).unwrap();
    // byte order: "Pascha" < "Pascal" < Greek
    assert_eq!(ids(&g.execute_query(&q).unwrap()), vec!["en_us_demo~me.m01~a", "en_us_demo~me.m01~b", "en_us_demo~me.m02~c"]);

    let base = Utc::now();
    let mut k1 = doc("en_us_demo", "t", "k1", 3, "x", &[], Visibility::Public);
    k1.modified_when = base - chrono::Duration::hours(2);
    let mut k2 = doc("en_us_demo", "t", "k2", 1, "y", &[], Visibility::Public);
    k2.modified_when = base - chrono::Duration::hours(1);
    let mut k3 = doc("en_us_demo", "t", "k3", 2, "z", &[], Visibility::Public);
    k3.modified_when = base;
    let g = MemoryGraph::from_documents(vec![k3, k1, k2]);
    let q = compile_search(&SearchSpec::new(Category::Doc, "en_us_demo").order_by(OrderBy::Modified), false).unwrap();
    assert_eq!(ids(&g.execute_query(&q).unwrap()), vec!["en_us_demo~t~k1", "en_us_demo~t~k2", "en_us_demo~t~k3"]);
    let q = compile_search(&SearchSpec::new(Category::Doc, "en_us_demo"), false).unwrap();
    assert_eq!(ids(&g.execute_query(&q).unwrap()), vec!["en_us_demo~t~k2", "en_us_demo~t~k3", "en_us_demo~t~k1"]);
}

#[test]
fn writes_count_and_tags() {
    let g = MemoryGraph::new();
    let d = doc("en_us_demo", "t", "k", 1, "v", &["z", "a"], Visibility::Private);
    g.execute_query(&compile_insert(d.clone())).unwrap();
    let e = g.execute_query(&compile_insert(d.clone())).unwrap_err();
    assert!(matches!(e, AppError::Conflict { .. }));
    assert_eq!(g.execute_query(&compile_count(&d.id)).unwrap()[0]["count"], json!(1));
    let tags = g.execute_query(&compile_tags("en_us_demo", false)).unwrap();
    assert_eq!(tags, vec![json!({"tag": "a"}), json!({"tag": "z"})]);
    // tags of non-public records stay out of a public-only scan
    assert!(g.execute_query(&compile_tags("en_us_demo", true)).unwrap().is_empty());
    g.execute_query(&compile_delete(&d.id)).unwrap();
    assert!(g.is_empty());
}

#[test]
fn down_backend_fails_fast() {
    let g = seeded();
    g.set_available(false);
    let q = compile_search(&SearchSpec::new(Category::Doc, "en_us_demo"), false).unwrap();
    let e = g.execute_query(&q).unwrap_err();
    assert!(e.is_backend_unavailable());
    let e = connect_with_retry(&g, 3, Duration::from_millis(1)).unwrap_err();
    assert!(e.is_backend_unavailable());
    g.set_available(true);
    assert!(connect_with_retry(&g, 1, Duration::from_millis(1)).is_ok());
}

#[test]
fn snapshot_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("folio.snap");
    assert!(snapshot::load_snapshot(&path).unwrap().is_none());

    let rs = RoleStore::new();
    rs.register_library(Library::user("en_us_demo")).unwrap();
    let g = seeded();
    let snap = Snapshot::new(g.documents(), rs.state(), vec![("en_us_demo".into(), "me.m01".into(), 2)]);
    snapshot::save_snapshot(&path, &snap).unwrap();

    let back = snapshot::load_snapshot(&path).unwrap().unwrap();
    assert_eq!(back.documents, g.documents());
    assert!(back.roles.libraries.contains_key("en_us_demo"));
    assert_eq!(back.counters, vec![("en_us_demo".to_string(), "me.m01".to_string(), 2)]);
    assert!(!path.with_extension("snap.tmp").exists());
}
