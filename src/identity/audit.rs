//! Audit sinks for authorization denials. Sinks must not panic and never block the
//! decision path on failure.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

use super::principal::Verb;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub ts: DateTime<Utc>,
    pub user: String,
    pub verb: Verb,
    pub library: String,
    pub allow: bool,
    pub reason: String,
}

impl AuditEvent {
    pub fn denied(user: &str, verb: Verb, library: &str, reason: &str) -> Self {
        Self {
            ts: Utc::now(),
            user: user.to_string(),
            verb,
            library: library.to_string(),
            allow: false,
            reason: reason.to_string(),
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, ev: &AuditEvent);
}

/// JSON-lines file sink.
pub struct FileAuditSink {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileAuditSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), guard: Mutex::new(()) }
    }

    fn append(&self, ev: &AuditEvent) -> anyhow::Result<()> {
        let line = serde_json::to_string(ev).context("serialize audit event")?;
        let _g = self.guard.lock();
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        writeln!(&mut f, "{}", line).context("write audit line")?;
        Ok(())
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, ev: &AuditEvent) {
        if let Err(e) = self.append(ev) {
            warn!(target: "folio::audit", "audit line lost path={} user='{}' library='{}': {:#}", self.path.display(), ev.user, ev.library, e);
        }
    }
}

/// Keeps events in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self { Self::default() }
    pub fn events(&self) -> Vec<AuditEvent> { self.events.lock().clone() }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, ev: &AuditEvent) {
        self.events.lock().push(ev.clone());
    }
}
