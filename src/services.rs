//! Explicit service graph. Everything a request needs is built once in `start` and handed
//! out by reference; `shutdown` drains background work and persists state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::FolioConfig;
use crate::docstore::{DocStore, TagCache};
use crate::error::{AppError, AppResult};
use crate::ident::SequenceIssuer;
use crate::identity::{
    Authorizer, CredentialVerifier, FileAuditSink, Library, LocalCredentialVerifier, RequestContext, RoleFacts,
    RoleStore, Session, SessionStore, UserRecord,
};
use crate::schema::CategorySchemaRegistry;
use crate::security;
use crate::storage::snapshot::{load_snapshot, save_snapshot};
use crate::storage::{connect_with_retry, GraphBackend, MemoryGraph, Snapshot};

pub struct Services {
    pub config: FolioConfig,
    pub roles: Arc<RoleStore>,
    pub authz: Arc<Authorizer>,
    pub sessions: SessionStore,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub backend: Arc<MemoryGraph>,
    pub sequences: Arc<SequenceIssuer>,
    pub docs: DocStore,
}

impl Services {
    /// Load the snapshot named by the config (if any) and wire the services around it.
    pub fn start(config: FolioConfig) -> AppResult<Self> {
        let snap = match &config.snapshot_path {
            Some(p) => load_snapshot(p)?,
            None => None,
        };
        let snap = snap.unwrap_or_default();
        let counters = snap.counters.into_iter().map(|(l, t, n)| ((l, t), n)).collect();
        Self::assemble(
            config,
            Arc::new(MemoryGraph::from_documents(snap.documents)),
            RoleStore::from_state(snap.roles),
            SequenceIssuer::from_counters(counters),
        )
    }

    /// Wire services around an existing backend and role store.
    pub fn assemble(config: FolioConfig, backend: Arc<MemoryGraph>, roles: RoleStore, sequences: SequenceIssuer) -> AppResult<Self> {
        connect_with_retry(backend.as_ref(), config.backend_connect_attempts, config.connect_backoff())?;

        let roles = Arc::new(roles);
        let facts: Arc<dyn RoleFacts> = roles.clone();
        let mut authz = Authorizer::new(facts.clone(), config.readable_scopes.clone(), config.admin_path_prefixes.clone());
        if let Some(p) = &config.audit_log_path {
            authz = authz.with_audit_sink(Arc::new(FileAuditSink::new(p)));
        }
        #[cfg(any(test, feature = "test-override"))]
        {
            authz = authz.with_allow_all(config.allow_all_override);
        }
        let authz = Arc::new(authz);

        let sequences = Arc::new(sequences);
        let graph: Arc<dyn GraphBackend> = backend.clone();
        let mut docs = DocStore::new(graph.clone(), authz.clone(), Arc::new(CategorySchemaRegistry::new()), sequences.clone());
        if config.tag_cache_enabled {
            docs = docs.with_tag_cache(TagCache::new(graph));
        }

        info!(target: "startup", "folio services started docs={} libraries={} tag_cache={}", backend.len(), roles.libraries().len(), config.tag_cache_enabled);
        Ok(Self {
            sessions: SessionStore::new(config.inactivity_window()),
            verifier: Arc::new(LocalCredentialVerifier::new(facts)),
            config,
            roles,
            authz,
            backend,
            sequences,
            docs,
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        let counters = self.sequences.counters().into_iter().map(|((l, t), n)| (l, t, n)).collect();
        Snapshot::new(self.backend.documents(), self.roles.state(), counters)
    }

    /// Persist to the configured snapshot path; no-op without one.
    pub fn save(&self) -> AppResult<()> {
        if let Some(p) = &self.config.snapshot_path {
            save_snapshot(p, &self.snapshot())?;
        }
        Ok(())
    }

    pub fn shutdown(self) -> AppResult<()> {
        if let Some(c) = self.docs.tag_cache() {
            if !c.wait_idle(Duration::from_secs(5)) {
                warn!(target: "startup", "tag cache rebuilds still running at shutdown");
            }
        }
        self.save()?;
        info!(target: "startup", "folio services stopped");
        Ok(())
    }

    pub fn register_library(&self, library: Library) -> AppResult<()> { self.roles.register_library(library) }

    /// Register a user; the password, if any, is stored as an Argon2 hash.
    pub fn register_user(&self, username: &str, home_library: &str, password: Option<&str>) -> AppResult<()> {
        let password_hash = match password {
            Some(pw) => Some(security::hash_password(pw)?),
            None => None,
        };
        self.roles.register_user(UserRecord { username: username.to_string(), home_library: home_library.to_string(), password_hash })
    }

    pub fn login(&self, user: &str, secret: &str) -> AppResult<Session> {
        self.sessions.login(self.verifier.as_ref(), user, secret)
    }

    /// Resolve a session token into a request context.
    pub fn authenticate(&self, token: &str) -> AppResult<RequestContext> {
        self.sessions
            .validate(token)
            .map(RequestContext::new)
            .ok_or_else(|| AppError::forbidden("session_invalid".to_string(), "session token is invalid or expired".to_string()))
    }
}
