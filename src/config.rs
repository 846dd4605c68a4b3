//! Runtime configuration.
//!
//! Layers, lowest to highest: built-in defaults, JSON file, `FOLIO_*` environment
//! variables, command-line overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_READABLE_SCOPES: &[&str] = &["docs", "login", "links", "nlp", "ontology", "linguistics"];
pub const DEFAULT_ADMIN_PATH_PREFIXES: &[&str] = &["admin", "system", "users"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FolioConfig {
    /// Session expires after this many seconds without a successful access.
    pub inactivity_window_secs: u64,
    /// Generic scopes any authenticated user may read (and, if they author anywhere, write).
    pub readable_scopes: Vec<String>,
    /// Leading path segments treated as administrative resources.
    pub admin_path_prefixes: Vec<String>,

    pub backend_connect_attempts: u32,
    pub backend_connect_backoff_ms: u64,

    pub tag_cache_enabled: bool,

    pub snapshot_path: Option<PathBuf>,
    pub audit_log_path: Option<PathBuf>,

    /// Forces every authorization check to pass. Test builds only.
    #[cfg(any(test, feature = "test-override"))]
    pub allow_all_override: bool,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            inactivity_window_secs: 1800,
            readable_scopes: DEFAULT_READABLE_SCOPES.iter().map(|s| s.to_string()).collect(),
            admin_path_prefixes: DEFAULT_ADMIN_PATH_PREFIXES.iter().map(|s| s.to_string()).collect(),
            backend_connect_attempts: 5,
            backend_connect_backoff_ms: 500,
            tag_cache_enabled: true,
            snapshot_path: None,
            audit_log_path: None,
            #[cfg(any(test, feature = "test-override"))]
            allow_all_override: false,
        }
    }
}

/// Sparse overrides; unset fields inherit from the layer below.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FolioConfigOverrides {
    pub inactivity_window_secs: Option<u64>,
    pub readable_scopes: Option<Vec<String>>,
    pub admin_path_prefixes: Option<Vec<String>>,
    pub backend_connect_attempts: Option<u32>,
    pub backend_connect_backoff_ms: Option<u64>,
    pub tag_cache_enabled: Option<bool>,
    pub snapshot_path: Option<PathBuf>,
    pub audit_log_path: Option<PathBuf>,
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',').map(|p| p.trim()).filter(|p| !p.is_empty()).map(|p| p.to_string()).collect()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl FolioConfigOverrides {
    /// Collect overrides from a variable lookup (normally `std::env::var`).
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Self {
        Self {
            inactivity_window_secs: get("FOLIO_INACTIVITY_SECS").and_then(|v| v.trim().parse().ok()),
            readable_scopes: get("FOLIO_READABLE_SCOPES").map(|v| split_list(&v)),
            admin_path_prefixes: get("FOLIO_ADMIN_PATHS").map(|v| split_list(&v)),
            backend_connect_attempts: get("FOLIO_CONNECT_ATTEMPTS").and_then(|v| v.trim().parse().ok()),
            backend_connect_backoff_ms: get("FOLIO_CONNECT_BACKOFF_MS").and_then(|v| v.trim().parse().ok()),
            tag_cache_enabled: get("FOLIO_TAG_CACHE").and_then(|v| parse_bool(&v)),
            snapshot_path: get("FOLIO_SNAPSHOT").filter(|v| !v.trim().is_empty()).map(PathBuf::from),
            audit_log_path: get("FOLIO_AUDIT_LOG").filter(|v| !v.trim().is_empty()).map(PathBuf::from),
        }
    }

    pub fn from_env() -> Self { Self::from_lookup(|k| std::env::var(k).ok()) }
}

impl FolioConfig {
    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn apply(mut self, o: &FolioConfigOverrides) -> Self {
        if let Some(v) = o.inactivity_window_secs { self.inactivity_window_secs = v; }
        if let Some(v) = &o.readable_scopes { self.readable_scopes = v.clone(); }
        if let Some(v) = &o.admin_path_prefixes { self.admin_path_prefixes = v.clone(); }
        if let Some(v) = o.backend_connect_attempts { self.backend_connect_attempts = v; }
        if let Some(v) = o.backend_connect_backoff_ms { self.backend_connect_backoff_ms = v; }
        if let Some(v) = o.tag_cache_enabled { self.tag_cache_enabled = v; }
        if let Some(v) = &o.snapshot_path { self.snapshot_path = Some(v.clone()); }
        if let Some(v) = &o.audit_log_path { self.audit_log_path = Some(v.clone()); }
        self
    }

    /// defaults <- optional file <- environment <- `cli`.
    pub fn resolve(file: Option<&Path>, cli: &FolioConfigOverrides) -> anyhow::Result<Self> {
        let base = match file {
            Some(p) => Self::load_file(p)?,
            None => Self::default(),
        };
        Ok(base.apply(&FolioConfigOverrides::from_env()).apply(cli))
    }

    pub fn inactivity_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.inactivity_window_secs.min(i64::MAX as u64) as i64)
    }

    pub fn connect_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.backend_connect_backoff_ms)
    }
}
