//! Extension → serializer lookup table.
//!
//! [`connect`](crate::connect) consults the process-wide table; builders can
//! be handed a private [`Registry`] instead.

use crate::error::{Error, Result};
use crate::serializer::{PrettyJson, Serializer};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Maps file extensions to serializers. Unknown extensions fall back to
/// [`PrettyJson`].
#[derive(Clone)]
pub struct Registry {
    by_ext: HashMap<String, Arc<dyn Serializer>>,
    fallback: Arc<dyn Serializer>,
}

impl Registry {
    /// A table with only the default JSON serializer.
    pub fn new() -> Self {
        let fallback: Arc<dyn Serializer> = Arc::new(PrettyJson);
        let mut by_ext = HashMap::new();
        by_ext.insert(PrettyJson::EXTENSION.to_string(), Arc::clone(&fallback));
        Self { by_ext, fallback }
    }

    /// Claim `serializer.extension()` for `serializer`, replacing any earlier
    /// claim. Serializers that declare no extension are rejected.
    pub fn register(&mut self, serializer: Arc<dyn Serializer>) -> Result<()> {
        let ext = normalize(serializer.extension());
        if ext.is_empty() {
            return Err(Error::Config(
                "serializer does not declare a file extension".into(),
            ));
        }
        tracing::debug!(ext = %ext, "registered serializer");
        self.by_ext.insert(ext, serializer);
        Ok(())
    }

    /// Serializer for `ext`, or the default when nothing claims it.
    #[must_use]
    pub fn lookup(&self, ext: Option<&str>) -> Arc<dyn Serializer> {
        ext.map(normalize)
            .and_then(|e| self.by_ext.get(&e).cloned())
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// `true` if some serializer claims `ext`.
    #[must_use]
    pub fn contains(&self, ext: &str) -> bool {
        self.by_ext.contains_key(&normalize(ext))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut exts: Vec<&String> = self.by_ext.keys().collect();
        exts.sort();
        f.debug_struct("Registry").field("extensions", &exts).finish()
    }
}

fn normalize(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

fn global() -> &'static RwLock<Registry> {
    static GLOBAL: OnceLock<RwLock<Registry>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(Registry::new()))
}

/// Register `serializer` in the process-wide table used by
/// [`connect`](crate::connect).
pub fn register(serializer: Arc<dyn Serializer>) -> Result<()> {
    global().write().register(serializer)
}

/// Look up `ext` in the process-wide table.
#[must_use]
pub fn lookup(ext: Option<&str>) -> Arc<dyn Serializer> {
    global().read().lookup(ext)
}
