//! Authorization engine: resolves the per-library role hierarchy
//! (ADMIN ⊇ AUTHOR ⊇ READER, REVIEWER alongside) plus the two wildcard scopes into a
//! yes/no decision for a (user, verb, library) triple. Decisions are pure reads over
//! the current role facts; denials are audited, never raised.

use std::sync::Arc;

use tracing::{debug, warn};

use super::audit::{AuditEvent, AuditSink};
use super::principal::{Role, Verb};
use super::roles::RoleFacts;
use crate::ident::{is_wildcard_library, ALL_DOMAINS, SYSTEM_LIBRARY};

/// Web-service administrator: ADMIN on SYSTEM.
pub fn is_ws_admin<F: RoleFacts + ?Sized>(facts: &F, user: &str) -> bool {
    facts.has_role(Role::Admin, SYSTEM_LIBRARY, user)
}

/// Database administrator: web-service admin or ADMIN on ALL_DOMAINS.
pub fn is_db_admin<F: RoleFacts + ?Sized>(facts: &F, user: &str) -> bool {
    is_ws_admin(facts, user) || facts.has_role(Role::Admin, ALL_DOMAINS, user)
}

/// Exact grant on `library` or on a wildcard whose scope covers it.
fn holds_in_scope<F: RoleFacts + ?Sized>(facts: &F, role: Role, library: &str, user: &str) -> bool {
    if facts.has_role(role, library, user) || facts.has_role(role, SYSTEM_LIBRARY, user) {
        return true;
    }
    library != SYSTEM_LIBRARY && facts.has_role(role, ALL_DOMAINS, user)
}

pub fn is_lib_admin<F: RoleFacts + ?Sized>(facts: &F, library: &str, user: &str) -> bool {
    holds_in_scope(facts, Role::Admin, library, user)
}

pub fn is_lib_author<F: RoleFacts + ?Sized>(facts: &F, library: &str, user: &str) -> bool {
    is_lib_admin(facts, library, user) || holds_in_scope(facts, Role::Author, library, user)
}

pub fn is_lib_reader<F: RoleFacts + ?Sized>(facts: &F, library: &str, user: &str) -> bool {
    is_lib_author(facts, library, user) || holds_in_scope(facts, Role::Reader, library, user)
}

pub fn is_lib_reviewer<F: RoleFacts + ?Sized>(facts: &F, library: &str, user: &str) -> bool {
    is_lib_admin(facts, library, user) || holds_in_scope(facts, Role::Reviewer, library, user)
}

/// True when the user can author in at least one library.
pub fn authors_any_library<F: RoleFacts + ?Sized>(facts: &F, user: &str) -> bool {
    facts.roles_of(user).iter().any(|(r, _)| matches!(r, Role::Admin | Role::Author))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantAuthority {
    Allowed,
    Denied(&'static str),
}

/// Who may manage roles on `library`:
/// web-service admins anywhere; database admins on ALL_DOMAINS and registered
/// content libraries; library admins on their own concrete library.
pub fn grant_authority<F: RoleFacts + ?Sized>(facts: &F, requestor: &str, library: &str) -> GrantAuthority {
    if is_ws_admin(facts, requestor) {
        return GrantAuthority::Allowed;
    }
    if library == SYSTEM_LIBRARY {
        return GrantAuthority::Denied("SYSTEM roles require a web-service administrator");
    }
    let registered = facts.library(library).is_some();
    if is_db_admin(facts, requestor) {
        if library == ALL_DOMAINS || registered {
            return GrantAuthority::Allowed;
        }
        return GrantAuthority::Denied("library is not a registered domain");
    }
    if library == ALL_DOMAINS {
        return GrantAuthority::Denied("ALL_DOMAINS roles require a database administrator");
    }
    if facts.has_role(Role::Admin, library, requestor) {
        return GrantAuthority::Allowed;
    }
    GrantAuthority::Denied("requestor is not an administrator of the library")
}

/// Injected authorization service.
pub struct Authorizer {
    facts: Arc<dyn RoleFacts>,
    readable_scopes: Vec<String>,
    admin_path_prefixes: Vec<String>,
    audit: Vec<Arc<dyn AuditSink>>,
    #[cfg(any(test, feature = "test-override"))]
    allow_all: bool,
}

impl Authorizer {
    pub fn new(facts: Arc<dyn RoleFacts>, readable_scopes: Vec<String>, admin_path_prefixes: Vec<String>) -> Self {
        Self {
            facts,
            readable_scopes,
            admin_path_prefixes,
            audit: Vec::new(),
            #[cfg(any(test, feature = "test-override"))]
            allow_all: false,
        }
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit.push(sink);
        self
    }

    /// Force every decision to allow. Only compiled into test builds.
    #[cfg(any(test, feature = "test-override"))]
    pub fn with_allow_all(mut self, on: bool) -> Self {
        self.allow_all = on;
        self
    }

    pub fn facts(&self) -> &Arc<dyn RoleFacts> { &self.facts }

    pub fn readable_scopes(&self) -> &[String] { &self.readable_scopes }

    pub fn is_ws_admin(&self, user: &str) -> bool { is_ws_admin(self.facts.as_ref(), user) }
    pub fn is_db_admin(&self, user: &str) -> bool { is_db_admin(self.facts.as_ref(), user) }
    pub fn is_lib_admin(&self, library: &str, user: &str) -> bool { is_lib_admin(self.facts.as_ref(), library, user) }
    pub fn is_lib_author(&self, library: &str, user: &str) -> bool { is_lib_author(self.facts.as_ref(), library, user) }
    pub fn is_lib_reader(&self, library: &str, user: &str) -> bool { is_lib_reader(self.facts.as_ref(), library, user) }
    pub fn is_lib_reviewer(&self, library: &str, user: &str) -> bool { is_lib_reviewer(self.facts.as_ref(), library, user) }
    pub fn has_role(&self, role: Role, library: &str, user: &str) -> bool { self.facts.has_role(role, library, user) }

    fn is_readable_scope(&self, library: &str) -> bool {
        self.readable_scopes.iter().any(|s| s == library)
    }

    /// Decide whether `user` may perform `verb` on `library`.
    pub fn is_authorized(&self, user: &str, verb: Verb, library: &str) -> bool {
        let (allow, reason) = self.decide(user, verb, library);
        if allow {
            debug!(target: "folio::authz", "allow user='{}' verb={} library='{}' reason={}", user, verb, library, reason);
        } else {
            warn!(target: "folio::audit", "denied user='{}' verb={} library='{}' reason={}", user, verb, library, reason);
            let ev = AuditEvent::denied(user, verb, library, reason);
            for sink in self.audit.iter() {
                sink.record(&ev);
            }
        }
        allow
    }

    fn decide(&self, user: &str, verb: Verb, library: &str) -> (bool, &'static str) {
        #[cfg(any(test, feature = "test-override"))]
        if self.allow_all {
            return (true, "allow_all_override");
        }
        let f = self.facts.as_ref();
        // Concrete libraries must be registered before any grant, admin included, reaches them.
        if !is_wildcard_library(library) && !self.is_readable_scope(library) && f.library(library).is_none() {
            return (false, "unregistered_library");
        }
        if is_ws_admin(f, user) {
            return (true, "ws_admin");
        }
        if library != SYSTEM_LIBRARY && is_db_admin(f, user) {
            return (true, "db_admin");
        }
        if is_lib_admin(f, library, user) {
            return (true, "lib_admin");
        }
        match verb {
            Verb::Get => {
                if is_lib_reader(f, library, user) {
                    (true, "lib_reader")
                } else if self.is_readable_scope(library) {
                    (true, "readable_scope")
                } else if f.library(library).map(|l| l.is_globally_readable()).unwrap_or(false) {
                    (true, "public_collective")
                } else {
                    (false, "no_read_role")
                }
            }
            Verb::Post | Verb::Put | Verb::Delete => {
                if is_lib_author(f, library, user) {
                    (true, "lib_author")
                } else if self.is_readable_scope(library) && authors_any_library(f, user) {
                    (true, "author_on_readable_scope")
                } else {
                    (false, "no_write_role")
                }
            }
            Verb::Review => {
                if is_lib_reviewer(f, library, user) { (true, "lib_reviewer") } else { (false, "no_review_role") }
            }
        }
    }

    /// Path-shaped administrative resources (first segment in the admin prefix list).
    pub fn is_admin_path(&self, path: &str) -> bool {
        match first_segment(path) {
            Some(seg) => self.admin_path_prefixes.iter().any(|p| p.eq_ignore_ascii_case(seg)),
            None => false,
        }
    }

    /// Authorize against a path: admin paths resolve to SYSTEM, others to their first segment.
    pub fn is_authorized_path(&self, user: &str, verb: Verb, path: &str) -> bool {
        if self.is_admin_path(path) {
            return self.is_authorized(user, verb, SYSTEM_LIBRARY);
        }
        match first_segment(path) {
            Some(library) => self.is_authorized(user, verb, library),
            None => self.is_authorized(user, verb, SYSTEM_LIBRARY),
        }
    }
}

fn first_segment(path: &str) -> Option<&str> {
    path.split('/').map(|s| s.trim()).find(|s| !s.is_empty())
}

#[cfg(test)]
#[path = "authorizer_tests.rs"]
mod authorizer_tests;
