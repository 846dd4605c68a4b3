use std::sync::Arc;

use super::roles::RoleFacts;
use crate::security;

/// External credential check; consulted only by the session store.
pub trait CredentialVerifier: Send + Sync {
    fn authenticate(&self, user: &str, secret: &str) -> bool;

    /// Whether `user` names an account this verifier holds credentials for.
    fn knows(&self, user: &str) -> bool;
}

/// Verifies against Argon2 hashes held on locally registered users.
pub struct LocalCredentialVerifier {
    facts: Arc<dyn RoleFacts>,
}

impl LocalCredentialVerifier {
    pub fn new(facts: Arc<dyn RoleFacts>) -> Self { Self { facts } }
}

impl CredentialVerifier for LocalCredentialVerifier {
    fn authenticate(&self, user: &str, secret: &str) -> bool {
        match self.facts.user(user).and_then(|u| u.password_hash) {
            Some(phc) => security::verify_password(&phc, secret),
            None => false,
        }
    }

    fn knows(&self, user: &str) -> bool { self.facts.user(user).is_some() }
}
