//! Lazily loaded worksheets
//!
//! Each worksheet part gets one load-once slot. The first access decodes
//! and densifies the sheet; every later access, from any thread, gets the
//! same shared instance.

use crate::error::Error;
use crate::worksheet::Worksheet;
use ahash::AHashMap;
use log::debug;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// A loaded worksheet shared between all users of a workbook
pub type SharedWorksheet = Arc<RwLock<Worksheet>>;

/// Per-part cache of decoded worksheets
#[derive(Debug, Default)]
pub struct WorksheetStore {
    slots: Mutex<AHashMap<String, Arc<OnceCell<SharedWorksheet>>>>,
}

impl WorksheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the worksheet stored at `path`, running `loader` on first use.
    ///
    /// Concurrent first accesses run `loader` once; the others wait for it.
    /// A failed load leaves the slot empty so a later call can retry.
    pub fn get_or_load<F, E>(&self, path: &str, loader: F) -> Result<SharedWorksheet, E>
    where
        F: FnOnce() -> Result<Worksheet, E>,
        E: From<Error>,
    {
        let slot = self.slot(path);
        slot.get_or_try_init(|| {
            let mut ws = loader()?;
            ws.densify()?;
            debug!("loaded worksheet {path}");
            Ok(Arc::new(RwLock::new(ws)))
        })
        .cloned()
    }

    /// The worksheet at `path` if it has been loaded
    pub fn get(&self, path: &str) -> Option<SharedWorksheet> {
        self.slots.lock().get(path)?.get().cloned()
    }

    /// Install `ws` at `path`, replacing anything cached there.
    pub fn insert(&self, path: &str, ws: Worksheet) -> SharedWorksheet {
        let shared = Arc::new(RwLock::new(ws));
        let cell = OnceCell::new();
        let _ = cell.set(shared.clone());
        self.slots.lock().insert(path.to_string(), Arc::new(cell));
        shared
    }

    /// All loaded worksheets, ordered by part path
    pub fn loaded(&self) -> Vec<(String, SharedWorksheet)> {
        let slots = self.slots.lock();
        let mut loaded: Vec<(String, SharedWorksheet)> = slots
            .iter()
            .filter_map(|(path, slot)| Some((path.clone(), slot.get()?.clone())))
            .collect();
        loaded.sort_by(|a, b| a.0.cmp(&b.0));
        loaded
    }

    /// Drop the cached worksheet at `path`.
    pub fn evict(&self, path: &str) -> Option<SharedWorksheet> {
        self.slots.lock().remove(path)?.get().cloned()
    }

    fn slot(&self, path: &str) -> Arc<OnceCell<SharedWorksheet>> {
        self.slots
            .lock()
            .entry(path.to_string())
            .or_default()
            .clone()
    }
}
