//! Role grant facts plus the library and user registries they reference.
//! Lookups here are exact matches; hierarchy and wildcard implication live in the
//! authorizer.

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::authorizer::{grant_authority, GrantAuthority};
use super::principal::{Library, Role, RoleGrant, UserRecord};
use crate::error::{AppError, AppResult};
use crate::ident::{self, ALL_DOMAINS, SYSTEM_LIBRARY};

/// Read-only view over stored role facts used by authorization and visibility.
pub trait RoleFacts: Send + Sync {
    fn has_role(&self, role: Role, library: &str, user: &str) -> bool;
    /// Every (role, library) the user holds, wildcards included.
    fn roles_of(&self, user: &str) -> Vec<(Role, String)>;
    fn library(&self, name: &str) -> Option<Library>;
    fn user(&self, username: &str) -> Option<UserRecord>;
}

/// Serializable registry state; persisted inside store snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleState {
    pub libraries: BTreeMap<String, Library>,
    pub users: BTreeMap<String, UserRecord>,
    pub grants: Vec<RoleGrant>,
}

#[derive(Debug, Default)]
pub struct RoleStore {
    state: RwLock<RoleState>,
}

impl RoleStore {
    pub fn new() -> Self { Self::default() }

    pub fn from_state(state: RoleState) -> Self { Self { state: RwLock::new(state) } }

    pub fn state(&self) -> RoleState { self.state.read().clone() }

    /// Register a content library. Wildcard tokens are reserved and never registrable.
    pub fn register_library(&self, library: Library) -> AppResult<()> {
        if ident::is_wildcard_library(&library.name) {
            return Err(AppError::validation("reserved_library".to_string(), format!("'{}' is a reserved wildcard scope", library.name)));
        }
        ident::DocumentId::new(&library.name, "_", "_")?;
        let mut st = self.state.write();
        if st.libraries.contains_key(&library.name) {
            return Err(AppError::conflict("library_exists".to_string(), format!("library '{}' already registered", library.name)));
        }
        info!(target: "folio::roles", "register_library name='{}' kind={:?} public_read={}", library.name, library.kind, library.public_read);
        st.libraries.insert(library.name.clone(), library);
        Ok(())
    }

    /// Register a user whose home library must already exist.
    pub fn register_user(&self, user: UserRecord) -> AppResult<()> {
        ident::DocumentId::new(SYSTEM_LIBRARY, ident::USERS_TOPIC, &user.username)?;
        let mut st = self.state.write();
        if st.users.contains_key(&user.username) {
            return Err(AppError::conflict("user_exists".to_string(), format!("user '{}' already registered", user.username)));
        }
        if !st.libraries.contains_key(&user.home_library) {
            return Err(AppError::not_found("unknown_library".to_string(), format!("home library '{}' is not registered", user.home_library)));
        }
        info!(target: "folio::roles", "register_user user='{}' home='{}'", user.username, user.home_library);
        st.users.insert(user.username.clone(), user);
        Ok(())
    }

    /// Seed the first web-service administrator. Only valid while no SYSTEM admin exists.
    pub fn bootstrap_ws_admin(&self, username: &str) -> AppResult<()> {
        let mut st = self.state.write();
        if !st.users.contains_key(username) {
            return Err(AppError::not_found("unknown_user".to_string(), format!("user '{}' is not registered", username)));
        }
        if st.grants.iter().any(|g| g.role == Role::Admin && g.library == SYSTEM_LIBRARY) {
            return Err(AppError::conflict("already_bootstrapped".to_string(), "a web-service administrator already exists".to_string()));
        }
        st.grants.push(RoleGrant {
            role: Role::Admin,
            library: SYSTEM_LIBRARY.to_string(),
            username: username.to_string(),
            granted_by: "bootstrap".to_string(),
            granted_when: Utc::now(),
        });
        info!(target: "folio::roles", "bootstrap ws admin user='{}'", username);
        Ok(())
    }

    fn check_targets(&self, library: &str, user: &str) -> AppResult<()> {
        let st = self.state.read();
        if !ident::is_wildcard_library(library) && !st.libraries.contains_key(library) {
            return Err(AppError::not_found("unknown_library".to_string(), format!("library '{}' is not registered", library)));
        }
        if !st.users.contains_key(user) {
            return Err(AppError::not_found("unknown_user".to_string(), format!("user '{}' is not registered", user)));
        }
        Ok(())
    }

    fn check_authority(&self, requestor: &str, library: &str) -> AppResult<()> {
        match grant_authority(self, requestor, library) {
            GrantAuthority::Allowed => Ok(()),
            GrantAuthority::Denied(reason) => Err(AppError::forbidden(
                "grant_forbidden".to_string(),
                format!("'{}' may not manage roles on '{}': {}", requestor, library, reason),
            )),
        }
    }

    /// Record (role, library, user). Re-granting an existing fact has no further effect.
    pub fn grant_role(&self, requestor: &str, role: Role, library: &str, user: &str) -> AppResult<()> {
        self.check_authority(requestor, library)?;
        self.check_targets(library, user)?;
        let mut st = self.state.write();
        if st.grants.iter().any(|g| g.role == role && g.library == library && g.username == user) {
            debug!(target: "folio::roles", "grant_role noop role={} library='{}' user='{}'", role, library, user);
            return Ok(());
        }
        st.grants.push(RoleGrant {
            role,
            library: library.to_string(),
            username: user.to_string(),
            granted_by: requestor.to_string(),
            granted_when: Utc::now(),
        });
        info!(target: "folio::roles", "grant_role role={} library='{}' user='{}' by='{}'", role, library, user, requestor);
        Ok(())
    }

    /// Remove (role, library, user). Revoking an absent fact succeeds without effect.
    pub fn revoke_role(&self, requestor: &str, role: Role, library: &str, user: &str) -> AppResult<()> {
        self.check_authority(requestor, library)?;
        self.check_targets(library, user)?;
        let mut st = self.state.write();
        let before = st.grants.len();
        st.grants.retain(|g| !(g.role == role && g.library == library && g.username == user));
        if st.grants.len() != before {
            info!(target: "folio::roles", "revoke_role role={} library='{}' user='{}' by='{}'", role, library, user, requestor);
        }
        Ok(())
    }

    pub fn grants_for(&self, user: &str) -> Vec<RoleGrant> {
        self.state.read().grants.iter().filter(|g| g.username == user).cloned().collect()
    }

    pub fn grants_in(&self, library: &str) -> Vec<RoleGrant> {
        self.state.read().grants.iter().filter(|g| g.library == library).cloned().collect()
    }

    pub fn libraries(&self) -> Vec<Library> {
        self.state.read().libraries.values().cloned().collect()
    }

    pub fn is_registered_library(&self, name: &str) -> bool {
        self.state.read().libraries.contains_key(name)
    }

    /// Whether `library` names a concrete, registered content library.
    pub fn is_concrete_library(&self, name: &str) -> bool {
        name != ALL_DOMAINS && name != SYSTEM_LIBRARY && self.is_registered_library(name)
    }
}

impl RoleFacts for RoleStore {
    fn has_role(&self, role: Role, library: &str, user: &str) -> bool {
        self.state.read().grants.iter().any(|g| g.role == role && g.library == library && g.username == user)
    }

    fn roles_of(&self, user: &str) -> Vec<(Role, String)> {
        self.state.read().grants.iter().filter(|g| g.username == user).map(|g| (g.role, g.library.clone())).collect()
    }

    fn library(&self, name: &str) -> Option<Library> {
        self.state.read().libraries.get(name).cloned()
    }

    fn user(&self, username: &str) -> Option<UserRecord> {
        self.state.read().users.get(username).cloned()
    }
}

#[cfg(test)]
#[path = "roles_tests.rs"]
mod roles_tests;
