//! Backend graph store seam plus the in-process reference backend and snapshots.

pub mod document;
pub mod memory;
pub mod snapshot;

use std::time::Duration;

use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::search::ast::CompiledQuery;

pub use document::{Document, LinkEnds};
pub use memory::MemoryGraph;
pub use snapshot::Snapshot;

/// Graph store consumed by the document façade. Implementations must fail a query against
/// a down backend with `BackendUnavailable` and never retry on their own.
pub trait GraphBackend: Send + Sync {
    fn execute_query(&self, query: &CompiledQuery) -> AppResult<Vec<serde_json::Value>>;
    fn connection_ok(&self) -> bool;
}

/// Startup-only probe: up to `attempts` checks separated by a fixed `backoff`.
pub fn connect_with_retry(backend: &dyn GraphBackend, attempts: u32, backoff: Duration) -> AppResult<()> {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        if backend.connection_ok() {
            info!(target: "startup", "backend connection ok (attempt {}/{})", attempt, attempts);
            return Ok(());
        }
        warn!(target: "startup", "backend not reachable (attempt {}/{})", attempt, attempts);
        if attempt < attempts {
            std::thread::sleep(backoff);
        }
    }
    Err(AppError::unavailable(
        "backend_connect".to_string(),
        format!("backend unreachable after {} attempt(s)", attempts),
    ))
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod storage_tests;
