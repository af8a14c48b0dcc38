//! Connect factory: pick a serializer, load the file, hand back the root.

use crate::arena::Arena;
use crate::error::{Error, Result};
use crate::flush::FlushPolicy;
use crate::node::Node;
use crate::persist::load;
use crate::registry::{self, Registry};
use crate::serializer::{SerializeOptions, Serializer};
use crate::tree::{SyncTarget, TreeState};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Connect to `path` with the defaults: serializer picked by extension,
/// 2-space indent, a write on every change.
///
/// Nothing is written until the first real mutation.
///
/// ```rust,no_run
/// use json_autosync::connect;
///
/// let config = connect("config.json").unwrap();
/// config.set("root", "/var/www/html").unwrap();
/// ```
pub fn connect(path: impl AsRef<Path>) -> Result<Node> {
    AutoSyncBuilder::new(path).build()
}

/// Configures and connects an auto-syncing tree.
///
/// ```rust,no_run
/// use json_autosync::{AutoSyncBuilder, FlushPolicy};
/// use std::time::Duration;
///
/// let config = AutoSyncBuilder::new("settings.conf")
///     .file_type("json")
///     .indent(Some(4))
///     .policy(FlushPolicy::Async(Duration::from_millis(50)))
///     .build()
///     .unwrap();
/// ```
pub struct AutoSyncBuilder {
    path: PathBuf,
    file_type: Option<String>,
    serializer: Option<Arc<dyn Serializer>>,
    registry: Option<Arc<Registry>>,
    options: SerializeOptions,
    policy: FlushPolicy,
}

impl AutoSyncBuilder {
    /// Start configuring a tree backed by `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file_type: None,
            serializer: None,
            registry: None,
            options: SerializeOptions::default(),
            policy: FlushPolicy::Immediate,
        }
    }

    /// Pick the serializer by this tag instead of the path's extension.
    pub fn file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    /// Use this serializer, skipping the lookup entirely.
    pub fn serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Look serializers up in `registry` instead of the process-wide table.
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Spaces per nesting level (default 2). `None` writes a single line.
    pub fn indent(mut self, indent: Option<usize>) -> Self {
        self.options.indent = indent;
        self
    }

    /// Set the flush policy (default: [`FlushPolicy::Immediate`]).
    pub fn policy(mut self, policy: FlushPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Load the file if it exists and return the root node.
    pub fn build(self) -> Result<Node> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::Config("missing config file".into()));
        }

        let serializer = match self.serializer {
            Some(s) => s,
            None => {
                let ext = self
                    .file_type
                    .as_deref()
                    .or_else(|| self.path.extension().and_then(|e| e.to_str()));
                match &self.registry {
                    Some(r) => r.lookup(ext),
                    None => registry::lookup(ext),
                }
            }
        };

        let data = load(&self.path, serializer.as_ref())?;
        tracing::debug!(
            path = %self.path.display(),
            format = serializer.extension(),
            keys = data.len(),
            "connected"
        );

        Ok(Node::from_state(TreeState {
            arena: Arena::from_map(data),
            sync: Some(SyncTarget {
                path: self.path,
                serializer,
                options: self.options,
                policy: self.policy,
            }),
            dirty: false,
        }))
    }
}

impl std::fmt::Debug for AutoSyncBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSyncBuilder")
            .field("path", &self.path)
            .field("file_type", &self.file_type)
            .field("options", &self.options)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
