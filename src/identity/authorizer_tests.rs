use super::*;
use crate::identity::audit::MemoryAuditSink;
use crate::identity::principal::{Library, UserRecord};
use crate::identity::roles::RoleStore;

fn readable() -> Vec<String> {
    ["docs", "login", "links", "nlp", "ontology", "linguistics"].iter().map(|s| s.to_string()).collect()
}

fn seeded() -> Arc<RoleStore> {
    let rs = RoleStore::new();
    rs.register_library(Library::user("en_us_demo")).unwrap();
    rs.register_library(Library::user("en_us_other")).unwrap();
    rs.register_library(Library::collective("gr_gr_cog", true)).unwrap();
    rs.register_library(Library::collective("en_uk_private", false)).unwrap();
    for (u, home) in [("wsadmin", "en_us_demo"), ("alice", "en_us_demo"), ("bob", "en_us_other"), ("carol", "en_us_other"), ("dba", "en_us_other")] {
        rs.register_user(UserRecord { username: u.into(), home_library: home.into(), password_hash: None }).unwrap();
    }
    rs.bootstrap_ws_admin("wsadmin").unwrap();
    Arc::new(rs)
}

fn authz(rs: &Arc<RoleStore>) -> Authorizer {
    Authorizer::new(rs.clone(), readable(), vec!["admin".into(), "system".into(), "users".into()])
}

#[test]
fn lib_admin_scenario() {
    let rs = seeded();
    rs.grant_role("wsadmin", Role::Admin, "en_us_demo", "alice").unwrap();
    let a = authz(&rs);
    assert!(a.is_authorized("alice", Verb::Put, "en_us_demo"));
    assert!(!a.is_authorized("alice", Verb::Put, "en_us_other"));
}

#[test]
fn admin_implies_every_verb() {
    let rs = seeded();
    rs.grant_role("wsadmin", Role::Admin, "en_us_other", "bob").unwrap();
    let a = authz(&rs);
    for v in [Verb::Get, Verb::Post, Verb::Put, Verb::Delete, Verb::Review] {
        assert!(a.is_authorized("bob", v, "en_us_other"), "admin should allow {}", v);
    }
}

#[test]
fn reader_can_get_but_not_write() {
    let rs = seeded();
    rs.grant_role("wsadmin", Role::Reader, "en_us_other", "carol").unwrap();
    let a = authz(&rs);
    assert!(a.is_authorized("carol", Verb::Get, "en_us_other"));
    assert!(!a.is_authorized("carol", Verb::Post, "en_us_other"));
    assert!(!a.is_authorized("carol", Verb::Delete, "en_us_other"));
}

#[test]
fn author_writes_and_reads() {
    let rs = seeded();
    rs.grant_role("wsadmin", Role::Author, "en_us_other", "carol").unwrap();
    let a = authz(&rs);
    assert!(a.is_lib_reader("en_us_other", "carol"));
    assert!(a.is_authorized("carol", Verb::Post, "en_us_other"));
    assert!(a.is_authorized("carol", Verb::Get, "en_us_other"));
    assert!(!a.is_authorized("carol", Verb::Review, "en_us_other"));
}

#[test]
fn reviewer_is_parallel_capability() {
    let rs = seeded();
    rs.grant_role("wsadmin", Role::Reviewer, "en_us_other", "carol").unwrap();
    let a = authz(&rs);
    assert!(a.is_authorized("carol", Verb::Review, "en_us_other"));
    assert!(!a.is_authorized("carol", Verb::Get, "en_us_other"));
    assert!(!a.is_authorized("carol", Verb::Put, "en_us_other"));
}

#[test]
fn readable_scopes_allow_get_for_anyone() {
    let rs = seeded();
    let a = authz(&rs);
    assert!(a.is_authorized("carol", Verb::Get, "docs"));
    assert!(a.is_authorized("carol", Verb::Get, "ontology"));
    assert!(!a.is_authorized("carol", Verb::Post, "docs"));
}

#[test]
fn authors_may_write_readable_scopes() {
    let rs = seeded();
    rs.grant_role("wsadmin", Role::Author, "en_us_other", "carol").unwrap();
    let a = authz(&rs);
    assert!(a.is_authorized("carol", Verb::Post, "links"));
    assert!(!a.is_authorized("carol", Verb::Post, "en_us_demo"));
}

#[test]
fn public_collective_is_readable() {
    let rs = seeded();
    let a = authz(&rs);
    assert!(a.is_authorized("carol", Verb::Get, "gr_gr_cog"));
    assert!(!a.is_authorized("carol", Verb::Put, "gr_gr_cog"));
    assert!(!a.is_authorized("carol", Verb::Get, "en_uk_private"));
}

#[test]
fn all_domains_admin_is_db_admin() {
    let rs = seeded();
    rs.grant_role("wsadmin", Role::Admin, ALL_DOMAINS, "dba").unwrap();
    let a = authz(&rs);
    assert!(a.is_db_admin("dba"));
    assert!(!a.is_ws_admin("dba"));
    assert!(a.is_authorized("dba", Verb::Delete, "en_us_demo"));
    assert!(!a.is_authorized("dba", Verb::Put, SYSTEM_LIBRARY));
}

#[test]
fn wildcard_reader_implies_every_content_library() {
    let rs = seeded();
    rs.grant_role("wsadmin", Role::Reader, ALL_DOMAINS, "carol").unwrap();
    let a = authz(&rs);
    assert!(a.is_lib_reader("en_us_demo", "carol"));
    assert!(a.is_lib_reader("en_uk_private", "carol"));
    assert!(!a.is_lib_reader(SYSTEM_LIBRARY, "carol"));
    assert!(!a.is_lib_author("en_us_demo", "carol"));
}

#[test]
fn ws_admin_allows_everything() {
    let rs = seeded();
    let a = authz(&rs);
    assert!(a.is_ws_admin("wsadmin"));
    assert!(a.is_db_admin("wsadmin"));
    assert!(a.is_authorized("wsadmin", Verb::Delete, SYSTEM_LIBRARY));
    assert!(a.is_authorized("wsadmin", Verb::Put, "en_uk_private"));
}

#[test]
fn unregistered_library_denies_even_admins() {
    let rs = seeded();
    rs.grant_role("wsadmin", Role::Admin, ALL_DOMAINS, "dba").unwrap();
    let a = authz(&rs);
    assert!(!a.is_authorized("wsadmin", Verb::Get, "xx_nowhere"));
    assert!(!a.is_authorized("dba", Verb::Put, "xx_nowhere"));
    // wildcards and readable scopes are never registered, yet remain addressable
    assert!(a.is_authorized("wsadmin", Verb::Put, ALL_DOMAINS));
    assert!(a.is_authorized("carol", Verb::Get, "docs"));
    assert!(a.is_authorized_path("wsadmin", Verb::Delete, "/admin/users/bob"));
}

#[test]
fn denials_are_audited() {
    let rs = seeded();
    let sink = Arc::new(MemoryAuditSink::new());
    let a = authz(&rs).with_audit_sink(sink.clone());
    assert!(!a.is_authorized("carol", Verb::Put, "en_us_demo"));
    assert!(a.is_authorized("wsadmin", Verb::Put, "en_us_demo"));
    let evs = sink.events();
    assert_eq!(evs.len(), 1);
    assert_eq!(evs[0].user, "carol");
    assert_eq!(evs[0].verb, Verb::Put);
    assert_eq!(evs[0].library, "en_us_demo");
    assert!(!evs[0].allow);
}

#[test]
fn admin_paths_require_ws_admin() {
    let rs = seeded();
    rs.grant_role("wsadmin", Role::Admin, "en_us_demo", "alice").unwrap();
    let a = authz(&rs);
    assert!(a.is_admin_path("/admin/users/list"));
    assert!(a.is_admin_path("Users"));
    assert!(!a.is_admin_path("/en_us_demo/actors"));
    assert!(!a.is_authorized_path("alice", Verb::Get, "/admin/users"));
    assert!(a.is_authorized_path("wsadmin", Verb::Get, "/admin/users"));
    assert!(a.is_authorized_path("alice", Verb::Put, "/en_us_demo/actors/Priest"));
}

#[test]
fn allow_all_override_is_test_only_switch() {
    let rs = seeded();
    let a = authz(&rs).with_allow_all(true);
    assert!(a.is_authorized("nobody", Verb::Delete, "en_us_demo"));
}

#[test]
fn grant_authority_rules() {
    let rs = seeded();
    rs.grant_role("wsadmin", Role::Admin, ALL_DOMAINS, "dba").unwrap();
    rs.grant_role("wsadmin", Role::Admin, "en_us_demo", "alice").unwrap();
    assert_eq!(grant_authority(rs.as_ref(), "wsadmin", SYSTEM_LIBRARY), GrantAuthority::Allowed);
    assert!(matches!(grant_authority(rs.as_ref(), "dba", SYSTEM_LIBRARY), GrantAuthority::Denied(_)));
    assert_eq!(grant_authority(rs.as_ref(), "dba", ALL_DOMAINS), GrantAuthority::Allowed);
    assert_eq!(grant_authority(rs.as_ref(), "dba", "en_us_other"), GrantAuthority::Allowed);
    assert!(matches!(grant_authority(rs.as_ref(), "dba", "nowhere"), GrantAuthority::Denied(_)));
    assert_eq!(grant_authority(rs.as_ref(), "alice", "en_us_demo"), GrantAuthority::Allowed);
    assert!(matches!(grant_authority(rs.as_ref(), "alice", "en_us_other"), GrantAuthority::Denied(_)));
    assert!(matches!(grant_authority(rs.as_ref(), "alice", ALL_DOMAINS), GrantAuthority::Denied(_)));
}
