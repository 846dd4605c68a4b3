#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use folio::config::FolioConfig;
use folio::ident::{SequenceIssuer, ALL_DOMAINS};
use folio::identity::{Library, RequestContext, Role, RoleStore};
use folio::storage::MemoryGraph;
use folio::Services;
use serde_json::{json, Value};

pub fn test_config() -> FolioConfig {
    FolioConfig { backend_connect_attempts: 1, backend_connect_backoff_ms: 1, ..Default::default() }
}

/// Two user libraries, one public collective, and:
/// root (ws admin), dan (ADMIN on all), alice (author in both user libraries),
/// bob (admin of en_us_other), eve (no grants), rita (reviewer in en_us_demo).
/// Only alice has a password ("pw").
pub fn fixture_with(mut config: FolioConfig, snapshot: Option<PathBuf>) -> Services {
    config.snapshot_path = snapshot;
    let services = Services::assemble(config, Arc::new(MemoryGraph::new()), RoleStore::new(), SequenceIssuer::new())
        .expect("services start");
    services.register_library(Library::user("en_us_demo")).unwrap();
    services.register_library(Library::user("en_us_other")).unwrap();
    services.register_library(Library::collective("gr_gr_cog", true)).unwrap();
    for (u, home) in [
        ("root", "en_us_demo"),
        ("dan", "en_us_demo"),
        ("alice", "en_us_demo"),
        ("bob", "en_us_other"),
        ("eve", "en_us_other"),
        ("rita", "en_us_demo"),
    ] {
        let pw = if u == "alice" { Some("pw") } else { None };
        services.register_user(u, home, pw).unwrap();
    }
    services.roles.bootstrap_ws_admin("root").unwrap();
    services.roles.grant_role("root", Role::Admin, ALL_DOMAINS, "dan").unwrap();
    services.roles.grant_role("root", Role::Author, "en_us_demo", "alice").unwrap();
    services.roles.grant_role("root", Role::Author, "en_us_other", "alice").unwrap();
    services.roles.grant_role("root", Role::Admin, "en_us_other", "bob").unwrap();
    services.roles.grant_role("root", Role::Reviewer, "en_us_demo", "rita").unwrap();
    services
}

pub fn fixture() -> Services { fixture_with(test_config(), None) }

pub fn ctx(user: &str) -> RequestContext { RequestContext::new(user) }

pub fn doc_json(library: &str, topic: &str, key: &str, value: &str, tags: &[&str]) -> Value {
    json!({ "category": "doc", "library": library, "topic": topic, "key": key, "value": value, "tags": tags })
}

pub fn ids(values: &[Value]) -> Vec<String> {
    values.iter().map(|v| v["id"].as_str().unwrap_or_default().to_string()).collect()
}
