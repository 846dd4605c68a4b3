//! Per-library tag dropdown cache. Rebuilds run on a detached thread, off the write path.
//!
//! Each library holds two entries: tags of every record, and tags of PUBLIC records only
//! for readers under the visibility filter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::search::compiler::compile_tags;
use crate::storage::GraphBackend;

pub struct TagCache {
    backend: Arc<dyn GraphBackend>,
    /// (library, public_only) -> sorted distinct tags
    entries: RwLock<HashMap<(String, bool), Vec<String>>>,
    /// library -> another rebuild was requested while one was running
    pending: Mutex<HashMap<String, bool>>,
}

impl TagCache {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Arc<Self> {
        Arc::new(Self { backend, entries: RwLock::new(HashMap::new()), pending: Mutex::new(HashMap::new()) })
    }

    pub fn get(&self, library: &str, public_only: bool) -> Option<Vec<String>> {
        self.entries.read().get(&(library.to_string(), public_only)).cloned()
    }

    /// Query the backend and replace one cached entry.
    pub fn rebuild(&self, library: &str, public_only: bool) -> AppResult<Vec<String>> {
        let rows = self.backend.execute_query(&compile_tags(library, public_only))?;
        let tags = tag_column(&rows);
        self.entries.write().insert((library.to_string(), public_only), tags.clone());
        debug!(target: "folio::docstore", "tag cache rebuilt library='{}' public_only={} tags={}", library, public_only, tags.len());
        Ok(tags)
    }

    fn rebuild_both(&self, library: &str) -> AppResult<()> {
        self.rebuild(library, false)?;
        self.rebuild(library, true)?;
        Ok(())
    }

    /// Fire-and-forget. Triggers that land while a rebuild for the same library is
    /// running collapse into a single follow-up pass.
    pub fn schedule_rebuild(self: &Arc<Self>, library: &str) {
        {
            let mut p = self.pending.lock();
            if let Some(rerun) = p.get_mut(library) {
                *rerun = true;
                return;
            }
            p.insert(library.to_string(), false);
        }
        let this = Arc::clone(self);
        let library = library.to_string();
        std::thread::spawn(move || loop {
            if let Err(e) = this.rebuild_both(&library) {
                warn!(target: "folio::docstore", "tag cache rebuild failed library='{}': {}", library, e);
            }
            let mut p = this.pending.lock();
            match p.get_mut(&library) {
                Some(rerun) if *rerun => *rerun = false,
                _ => {
                    p.remove(&library);
                    break;
                }
            }
        });
    }

    pub fn is_idle(&self) -> bool { self.pending.lock().is_empty() }

    /// Block until no rebuild is running or `timeout` elapses. Used by shutdown and tests.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_idle() {
            if Instant::now() >= deadline { return false; }
            std::thread::sleep(Duration::from_millis(5));
        }
        true
    }
}

/// Pull the `tag` column out of distinct-tag rows.
pub(crate) fn tag_column(rows: &[serde_json::Value]) -> Vec<String> {
    rows.iter().filter_map(|r| r.get("tag").and_then(|t| t.as_str()).map(|t| t.to_string())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryGraph;

    #[test]
    fn rebuild_on_empty_library_caches_nothing() {
        let g: Arc<dyn GraphBackend> = Arc::new(MemoryGraph::new());
        let c = TagCache::new(g);
        assert!(c.get("en_us_demo", false).is_none());
        assert_eq!(c.rebuild("en_us_demo", false).unwrap(), Vec::<String>::new());
        assert_eq!(c.get("en_us_demo", false), Some(vec![]));
        assert!(c.get("en_us_demo", true).is_none());
    }

    #[test]
    fn redundant_triggers_settle() {
        let g: Arc<dyn GraphBackend> = Arc::new(MemoryGraph::new());
        let c = TagCache::new(g);
        for _ in 0..20 { c.schedule_rebuild("en_us_demo"); }
        assert!(c.wait_idle(Duration::from_secs(5)));
        assert_eq!(c.get("en_us_demo", false), Some(vec![]));
        assert_eq!(c.get("en_us_demo", true), Some(vec![]));
    }

    #[test]
    fn failed_rebuild_keeps_previous_entry() {
        let g = Arc::new(MemoryGraph::new());
        let c = TagCache::new(g.clone());
        c.rebuild("en_us_demo", false).unwrap();
        g.set_available(false);
        assert!(c.rebuild("en_us_demo", false).is_err());
        assert_eq!(c.get("en_us_demo", false), Some(vec![]));
    }
}
