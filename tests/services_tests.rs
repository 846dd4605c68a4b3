mod common;

use common::{ctx, doc_json, fixture_with, ids, test_config};
use folio::error::AppError;
use folio::identity::Verb;
use folio::search::{Category, SearchSpec};
use folio::Services;
use serde_json::Value;

#[test]
fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let snap = dir.path().join("folio.snap");
    let s = fixture_with(test_config(), Some(snap.clone()));
    s.docs.create(&ctx("alice"), &doc_json("en_us_demo", "lit", "a", "first", &["x"])).unwrap();
    s.docs.create(&ctx("alice"), &doc_json("en_us_demo", "lit", "b", "second", &[])).unwrap();
    s.shutdown().unwrap();
    assert!(snap.exists());

    let mut cfg = test_config();
    cfg.snapshot_path = Some(snap.clone());
    let s = Services::start(cfg).unwrap();
    assert!(s.authz.is_authorized("alice", Verb::Post, "en_us_demo"));
    let found = s.docs.search(&ctx("alice"), &SearchSpec::new(Category::Doc, "en_us_demo")).unwrap();
    assert_eq!(ids(&found.values), vec!["en_us_demo~lit~a", "en_us_demo~lit~b"]);

    // sequence counters continue where they left off
    let c = s.docs.create(&ctx("alice"), &doc_json("en_us_demo", "lit", "c", "third", &[])).unwrap();
    assert_eq!(c.seq, "en_us_demo~lit~000000003");
}

#[test]
fn missing_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config();
    cfg.snapshot_path = Some(dir.path().join("nothing.snap"));
    let s = Services::start(cfg).unwrap();
    assert!(s.backend.is_empty());
    assert!(s.roles.libraries().is_empty());
}

#[test]
fn denials_are_written_to_the_audit_log() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("audit").join("denials.jsonl");
    let mut cfg = test_config();
    cfg.audit_log_path = Some(log.clone());
    let s = fixture_with(cfg, None);
    assert!(!s.authz.is_authorized("eve", Verb::Put, "en_us_demo"));
    assert!(s.authz.is_authorized("alice", Verb::Put, "en_us_demo"));

    let text = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["user"], "eve");
    assert_eq!(lines[0]["verb"], "PUT");
    assert_eq!(lines[0]["allow"], false);
}

#[test]
fn session_lifecycle() {
    let s = fixture_with(test_config(), None);
    assert!(matches!(s.login("alice", "wrong").unwrap_err(), AppError::Forbidden { .. }));
    assert!(matches!(s.login("eve", "").unwrap_err(), AppError::Forbidden { .. }));

    let sess = s.login("alice", "pw").unwrap();
    let rc = s.authenticate(&sess.token).unwrap();
    assert_eq!(rc.requestor, "alice");
    assert!(!s.sessions.session_expired("alice"));

    assert!(s.sessions.logout(&sess.token));
    assert!(matches!(s.authenticate(&sess.token).unwrap_err(), AppError::Forbidden { .. }));
}

#[test]
fn unreachable_backend_fails_startup() {
    let backend = std::sync::Arc::new(folio::storage::MemoryGraph::new());
    backend.set_available(false);
    let err = Services::assemble(
        test_config(),
        backend,
        folio::identity::RoleStore::new(),
        folio::ident::SequenceIssuer::new(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, AppError::BackendUnavailable { .. }));
}
