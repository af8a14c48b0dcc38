//! Shared state behind every handle of one tree: the node arena plus, for a
//! connected tree, where and how to write it.

use crate::arena::Arena;
use crate::error::{Error, Result};
use crate::flush::{AsyncFlushWorker, FlushPolicy};
use crate::persist::atomic_write;
use crate::serializer::{SerializeOptions, Serializer};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Where a connected tree persists itself.
pub(crate) struct SyncTarget {
    pub(crate) path: PathBuf,
    pub(crate) serializer: Arc<dyn Serializer>,
    pub(crate) options: SerializeOptions,
    pub(crate) policy: FlushPolicy,
}

/// What the caller has to do after a mutation was recorded.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum AfterMutation {
    Done,
    PokeWorker,
}

pub(crate) struct TreeState {
    pub(crate) arena: Arena,
    pub(crate) sync: Option<SyncTarget>,
    pub(crate) dirty: bool,
}

impl TreeState {
    pub(crate) fn type_name(&self) -> &'static str {
        if self.sync.is_some() {
            "AutoSync"
        } else {
            "AutoDict"
        }
    }

    /// Record a real mutation and persist according to the flush policy.
    pub(crate) fn on_mutation(&mut self) -> Result<AfterMutation> {
        let Some(policy) = self.sync.as_ref().map(|s| s.policy.clone()) else {
            return Ok(AfterMutation::Done);
        };
        self.dirty = true;
        match policy {
            FlushPolicy::Immediate => {
                self.save_root()?;
                Ok(AfterMutation::Done)
            }
            FlushPolicy::Async(_) => Ok(AfterMutation::PokeWorker),
            FlushPolicy::Manual => Ok(AfterMutation::Done),
        }
    }

    /// Serialize the whole tree and overwrite the config file.
    pub(crate) fn save_root(&mut self) -> Result<()> {
        let sync = self
            .sync
            .as_ref()
            .ok_or_else(|| Error::Config("missing config file".into()))?;
        let data = self.arena.to_map(self.arena.root());
        let text = sync.serializer.serialize(&data, &sync.options)?;
        atomic_write(&sync.path, text.as_bytes())?;
        self.dirty = false;
        tracing::debug!(path = %sync.path.display(), bytes = text.len(), "saved tree");
        Ok(())
    }

    /// Write only if something changed since the last save.
    pub(crate) fn save_if_dirty(&mut self) -> Result<()> {
        if self.dirty {
            self.save_root()
        } else {
            Ok(())
        }
    }
}

/// Owned by every handle of a tree through an `Arc`. Dropping the last handle
/// stops the worker and writes whatever is still pending.
pub(crate) struct Tree {
    pub(crate) state: Arc<Mutex<TreeState>>,
    pub(crate) worker: Mutex<Option<AsyncFlushWorker>>,
}

impl Tree {
    pub(crate) fn new(state: TreeState) -> Self {
        let name = state
            .sync
            .as_ref()
            .map(|s| format!("json-autosync:{}", s.path.display()));
        let interval = match state.sync.as_ref().map(|s| &s.policy) {
            Some(FlushPolicy::Async(interval)) => Some(*interval),
            _ => None,
        };
        let state = Arc::new(Mutex::new(state));

        let worker = match (interval, name) {
            (Some(interval), Some(name)) => {
                let shared = Arc::clone(&state);
                Some(AsyncFlushWorker::start(name, interval, move || {
                    if let Err(e) = shared.lock().save_if_dirty() {
                        tracing::warn!(error = %e, "background save failed");
                    }
                }))
            }
            _ => None,
        };

        Self {
            state,
            worker: Mutex::new(worker),
        }
    }

    pub(crate) fn poke(&self) {
        if let Some(w) = self.worker.lock().as_ref() {
            w.trigger();
        }
    }
}

impl Drop for Tree {
    fn drop(&mut self) {
        let Some(worker) = self.worker.get_mut().take() else {
            return;
        };
        drop(worker);
        if let Err(e) = self.state.lock().save_if_dirty() {
            tracing::warn!(error = %e, "final save failed");
        }
    }
}
