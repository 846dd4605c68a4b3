//! Whole-state snapshot: documents, role/user/library registries and sequence counters
//! in one bincode file, written to a temp file and renamed into place.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::document::Document;
use crate::identity::RoleState;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub created_ms: i64,
    pub documents: Vec<Document>,
    pub roles: RoleState,
    /// (library, topic, last issued ordinal)
    pub counters: Vec<(String, String, u64)>,
}

impl Snapshot {
    pub fn new(documents: Vec<Document>, roles: RoleState, mut counters: Vec<(String, String, u64)>) -> Self {
        counters.sort();
        let created_ms = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0);
        Self { version: SNAPSHOT_VERSION, created_ms, documents, roles, counters }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".tmp");
    PathBuf::from(s)
}

pub fn save_snapshot(path: &Path, snap: &Snapshot) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() { std::fs::create_dir_all(parent)?; }
    }
    let bytes = bincode::serialize(snap)?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    info!(target: "folio::storage", "snapshot saved path={} docs={} counters={}", path.display(), snap.documents.len(), snap.counters.len());
    Ok(())
}

/// `Ok(None)` when no snapshot exists yet.
pub fn load_snapshot(path: &Path) -> anyhow::Result<Option<Snapshot>> {
    if !path.exists() { return Ok(None); }
    let bytes = std::fs::read(path)?;
    let snap: Snapshot = bincode::deserialize(&bytes)?;
    if snap.version != SNAPSHOT_VERSION {
        anyhow::bail!("unsupported snapshot version {} in {}", snap.version, path.display());
    }
    info!(target: "folio::storage", "snapshot loaded path={} docs={}", path.display(), snap.documents.len());
    Ok(Some(snap))
}
