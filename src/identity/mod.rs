//! Role grants, sessions and the authorization engine.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod roles;
mod session;
mod provider;
mod audit;
mod request_context;
mod authorizer;

pub use principal::{Role, Verb, Library, LibraryKind, UserRecord, RoleGrant};
pub use roles::{RoleFacts, RoleStore, RoleState};
pub use session::{AccessStats, Session, SessionToken, SessionStore};
pub use provider::{CredentialVerifier, LocalCredentialVerifier};
pub use audit::{AuditEvent, AuditSink, FileAuditSink, MemoryAuditSink};
pub use request_context::RequestContext;
pub use authorizer::{
    Authorizer, GrantAuthority, grant_authority, is_ws_admin, is_db_admin, is_lib_admin,
    is_lib_author, is_lib_reader, is_lib_reviewer, authors_any_library,
};
