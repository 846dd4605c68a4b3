use std::collections::{HashMap, HashSet};

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::provider::CredentialVerifier;
use crate::error::{AppError, AppResult};

pub type SessionToken = String;

/// Per-user access activity, mutated on every authentication attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessStats {
    pub last_access: Option<DateTime<Utc>>,
    pub access_count: u64,
    pub failed_login_count: u64,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: SessionToken,
    pub username: String,
    pub issued_at: DateTime<Utc>,
}

fn gen_id() -> AppResult<String> {
    gen_id_with(getrandom::getrandom)
}

/// 32 random bytes, URL-safe base64. A failing entropy source fails the caller; it never
/// falls back to a predictable buffer.
fn gen_id_with(fill: impl FnOnce(&mut [u8]) -> Result<(), getrandom::Error>) -> AppResult<String> {
    let mut buf = [0u8; 32];
    fill(&mut buf).map_err(|e| AppError::unavailable("rng_unavailable".to_string(), format!("no entropy for session token: {}", e)))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Access tracking plus opaque session tokens. Expiry is driven by inactivity, not by
/// token age: a token stays valid while its user keeps authenticating. Logged-out and
/// expired tokens are dropped outright; tokens are random, so none is ever reissued.
pub struct SessionStore {
    inactivity: Duration,
    stats: RwLock<HashMap<String, AccessStats>>,
    sessions: RwLock<HashMap<SessionToken, Session>>,
    user_index: RwLock<HashMap<String, HashSet<SessionToken>>>,
}

impl SessionStore {
    pub fn new(inactivity: Duration) -> Self {
        Self {
            inactivity,
            stats: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            user_index: RwLock::new(HashMap::new()),
        }
    }

    pub fn inactivity_window(&self) -> Duration { self.inactivity }

    pub fn record_access(&self, user: &str, success: bool) {
        self.record_access_at(user, success, Utc::now())
    }

    /// Successful attempts refresh the access instant and clear the failure streak;
    /// failures only bump the failure counter.
    pub fn record_access_at(&self, user: &str, success: bool, now: DateTime<Utc>) {
        let mut m = self.stats.write();
        let st = m.entry(user.to_string()).or_default();
        if success {
            st.last_access = Some(now);
            st.access_count += 1;
            st.failed_login_count = 0;
        } else {
            st.failed_login_count += 1;
        }
        debug!(target: "folio::session", "record_access user='{}' success={} count={} failed={}", user, success, st.access_count, st.failed_login_count);
    }

    pub fn stats(&self, user: &str) -> Option<AccessStats> {
        self.stats.read().get(user).cloned()
    }

    pub fn session_expired(&self, user: &str) -> bool {
        self.session_expired_at(user, Utc::now())
    }

    /// True when the last recorded access is older than the inactivity window, and
    /// always true for a user with no recorded access.
    pub fn session_expired_at(&self, user: &str, now: DateTime<Utc>) -> bool {
        match self.stats.read().get(user).and_then(|s| s.last_access) {
            Some(last) => now - last > self.inactivity,
            None => true,
        }
    }

    /// Authenticate through the verifier, record the outcome and issue a token. Attempts
    /// against names the verifier does not know leave no stats behind.
    pub fn login(&self, verifier: &dyn CredentialVerifier, user: &str, secret: &str) -> AppResult<Session> {
        let ok = verifier.authenticate(user, secret);
        if ok || verifier.knows(user) {
            self.record_access(user, ok);
        }
        if !ok {
            return Err(AppError::forbidden("invalid_credentials".to_string(), format!("authentication failed for '{}'", user)));
        }
        self.issue(user)
    }

    pub fn issue(&self, user: &str) -> AppResult<Session> {
        let sess = Session {
            session_id: gen_id()?,
            token: gen_id()?,
            username: user.to_string(),
            issued_at: Utc::now(),
        };
        self.sessions.write().insert(sess.token.clone(), sess.clone());
        self.user_index.write().entry(user.to_string()).or_default().insert(sess.token.clone());
        info!(target: "folio::session", "session.issue user='{}' sid={}", user, sess.session_id);
        Ok(sess)
    }

    /// Resolve a token to its user unless it was dropped or the user's session expired.
    pub fn validate(&self, token: &str) -> Option<String> {
        let user = self.sessions.read().get(token).map(|s| s.username.clone())?;
        if self.session_expired(&user) {
            self.drop_token(token);
            return None;
        }
        Some(user)
    }

    fn drop_token(&self, token: &str) -> Option<Session> {
        let sess = self.sessions.write().remove(token)?;
        let mut idx = self.user_index.write();
        if let Some(set) = idx.get_mut(&sess.username) {
            set.remove(token);
            if set.is_empty() { idx.remove(&sess.username); }
        }
        Some(sess)
    }

    pub fn logout(&self, token: &str) -> bool {
        self.drop_token(token).is_some()
    }

    /// Live session count; expired tokens count until they are next presented.
    pub fn live_sessions(&self) -> usize { self.sessions.read().len() }

    pub fn revoke_user(&self, user: &str) -> usize {
        let tokens = self.user_index.write().remove(user).unwrap_or_default();
        let mut count = 0usize;
        let mut s = self.sessions.write();
        for t in tokens.iter() {
            if s.remove(t).is_some() { count += 1; }
        }
        info!(target: "folio::session", "session.revoke user='{}' count={}", user, count);
        count
    }
}
