use super::*;
use crate::search::spec::{Category, MatchStrategy, OrderBy, Projection, SearchSpec, TagOperator};

fn doc_spec() -> SearchSpec {
    SearchSpec::new(Category::Doc, "en_us_demo")
        .query("Pasc")
        .strategy(MatchStrategy::StartsWith)
        .tags(["feast"], TagOperator::Any)
}

#[test]
fn doc_search_shape() {
    let ast = build_search(&doc_spec(), false).unwrap();
    assert_eq!(ast.pattern, Pattern::Node { labels: vec!["Doc".into(), "en_us_demo".into()] });
    assert_eq!(ast.predicates.len(), 2);
    assert!(matches!(&ast.predicates[0], Predicate::Text { field: Field::Value, strategy: MatchStrategy::StartsWith, needle } if needle == "Pasc"));
    assert_eq!(ast.predicates[1], Predicate::TagsAny(vec!["feast".into()]));
    assert_eq!(ast.order_by, vec![Field::Seq, Field::Id]);
    assert_eq!(ast.visibility_predicates(), 0);
}

#[test]
fn public_filter_injected_exactly_once() {
    let ast = build_search(&doc_spec(), true).unwrap();
    assert_eq!(ast.visibility_predicates(), 1);
    assert!(ast.is_public_only());
    let compiled = compile_search(&doc_spec(), true).unwrap();
    assert_eq!(compiled.text.matches("n.visibility").count(), 1);
}

#[test]
fn contains_is_default_strategy() {
    let spec = SearchSpec::new(Category::Note, "en_us_demo").query("x");
    let ast = build_search(&spec, false).unwrap();
    assert!(matches!(&ast.predicates[0], Predicate::Text { strategy: MatchStrategy::Contains, .. }));
}

#[test]
fn empty_query_adds_no_text_predicate() {
    let ast = build_search(&SearchSpec::new(Category::Template, "en_us_demo"), false).unwrap();
    assert!(ast.predicates.is_empty());
    assert_eq!(ast.order_by, vec![Field::Id]);
}

#[test]
fn query_text_is_nfc_normalized() {
    let spec = SearchSpec::new(Category::Doc, "en_us_demo").query("cafe\u{0301}");
    let ast = build_search(&spec, false).unwrap();
    assert!(matches!(&ast.predicates[0], Predicate::Text { needle, .. } if needle == "caf\u{00E9}"));
}

#[test]
fn stripped_projection_compares_nnp() {
    let spec = SearchSpec::new(Category::Doc, "en_us_demo").query("Πάσχα.").projection(Projection::IdValueStripped);
    let ast = build_search(&spec, false).unwrap();
    assert!(matches!(&ast.predicates[0], Predicate::Text { field: Field::Nnp, needle, .. } if needle == "Πασχα"));
}

#[test]
fn stripped_regex_keeps_its_syntax() {
    let spec = SearchSpec::new(Category::Doc, "en_us_demo")
        .query("Πάσχα.*")
        .strategy(MatchStrategy::Regex)
        .projection(Projection::IdValueStripped);
    let ast = build_search(&spec, false).unwrap();
    assert!(matches!(&ast.predicates[0], Predicate::Text { field: Field::Nnp, strategy: MatchStrategy::Regex, needle } if needle == "Πασχα.*"));
}

#[test]
fn punctuation_only_query_is_rejected_not_widened() {
    let spec = SearchSpec::new(Category::Doc, "en_us_demo").query("?!").projection(Projection::IdValueStripped);
    let e = build_search(&spec, false).unwrap_err();
    assert!(matches!(e, AppError::ValidationError { ref code, .. } if code == "empty_query"));
    // the same text against the raw value is an ordinary needle
    let spec = SearchSpec::new(Category::Doc, "en_us_demo").query("?!");
    let ast = build_search(&spec, false).unwrap();
    assert!(matches!(&ast.predicates[0], Predicate::Text { field: Field::Value, needle, .. } if needle == "?!"));
}

#[test]
fn book_chapter_sub_scope_becomes_topic_prefix() {
    let spec = SearchSpec::new(Category::Doc, "en_us_demo/me/m01");
    let ast = build_search(&spec, false).unwrap();
    assert_eq!(ast.predicates, vec![Predicate::Text { field: Field::Topic, strategy: MatchStrategy::StartsWith, needle: "me.m01".into() }]);
}

#[test]
fn template_rejects_sub_scope() {
    let e = build_search(&SearchSpec::new(Category::Template, "en_us_demo/x"), false).unwrap_err();
    assert!(matches!(e, AppError::ValidationError { .. }));
}

#[test]
fn link_uses_relationship_pattern_with_tenant_predicate() {
    let spec = SearchSpec::new(Category::Link, "en_us_demo/refersTo");
    let ast = build_search(&spec, false).unwrap();
    assert_eq!(ast.pattern, Pattern::Relationship { rel_type: "Link".into() });
    assert_eq!(ast.predicates[0], Predicate::Compare { field: Field::Library, op: CompareOp::Eq, value: "en_us_demo".into() });
    assert_eq!(ast.predicates[1], Predicate::Compare { field: Field::Topic, op: CompareOp::Eq, value: "refersTo".into() });
}

#[test]
fn generic_over_wildcard_is_rejected() {
    for scope in ["all", "system"] {
        let e = build_search(&SearchSpec::new(Category::Generic, scope), false).unwrap_err();
        assert!(matches!(e, AppError::UnsupportedCategory { .. }), "scope {}", scope);
    }
    // concrete library is fine
    assert!(build_search(&SearchSpec::new(Category::Generic, "en_us_demo"), false).is_ok());
}

#[test]
fn all_domains_scope_excludes_system_library() {
    let ast = build_search(&SearchSpec::new(Category::Doc, "all"), false).unwrap();
    assert_eq!(ast.pattern, Pattern::Node { labels: vec!["Doc".into()] });
    assert_eq!(ast.predicates, vec![Predicate::Compare { field: Field::Library, op: CompareOp::Ne, value: "system".into() }]);
}

#[test]
fn bad_regex_is_validation_error() {
    let spec = SearchSpec::new(Category::Doc, "en_us_demo").query("(unclosed").strategy(MatchStrategy::Regex);
    let e = build_search(&spec, false).unwrap_err();
    assert!(matches!(e, AppError::ValidationError { .. }));
}

#[test]
fn every_category_compiles_against_concrete_scope() {
    for c in Category::ALL {
        let spec = SearchSpec::new(c, "en_us_demo").query("a");
        let compiled = compile_search(&spec, true).unwrap();
        assert!(compiled.text.contains("ORDER BY"), "{}: {}", c, compiled.text);
        assert!(compiled.text.ends_with("n.id"), "{}: {}", c, compiled.text);
    }
}

#[test]
fn compile_is_deterministic() {
    let a = compile_search(&doc_spec().order_by(OrderBy::Value), true).unwrap();
    let b = compile_search(&doc_spec().order_by(OrderBy::Value), true).unwrap();
    assert_eq!(a, b);
}

#[test]
fn context_query_brackets_sequence() {
    let c = compile_context("en_us_demo", "me.m01", "a", "b", false);
    match &c.statement {
        Statement::Search(q) => assert_eq!(q.predicates.len(), 4),
        other => panic!("unexpected {:?}", other.kind()),
    }
    assert!(c.text.contains("n.seq >= $p2 AND n.seq <= $p3"));
}
