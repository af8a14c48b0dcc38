//! The auto-vivifying node handle and the capabilities it carries.
//!
//! A [`Node`] is a cheap, clonable handle to one level of a tree. Reading a
//! missing key through [`Node::get`], [`Node::child`] or [`Node::at`] creates
//! an empty child on the spot, so deep paths can be written without building
//! the intermediate levels first:
//!
//! ```
//! use json_autosync::Node;
//! use serde_json::json;
//!
//! let tree = Node::new();
//! tree.at(["this", "is", "a"]).unwrap().set("test", "success").unwrap();
//! assert_eq!(tree, json!({"this": {"is": {"a": {"test": "success"}}}}));
//! ```
//!
//! Vivifying never counts as a change. Only [`set`](Node::set),
//! [`delete`](Node::delete), [`extend`](Node::extend) and
//! [`clear`](Node::clear) do, and on a connected tree each of them saves the
//! whole tree exactly once (under [`FlushPolicy::Immediate`]).
//!
//! [`FlushPolicy::Immediate`]: crate::FlushPolicy::Immediate

use crate::arena::{Arena, NodeId, Slot};
use crate::error::{Error, Result};
use crate::serializer::{kind_of, PrettyJson, SerializeOptions, Serializer};
use crate::tree::{AfterMutation, Tree, TreeState};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Anything that knows the root of the tree it belongs to.
pub trait TraceRoot {
    /// Handle to the root of this tree.
    fn root(&self) -> Node;

    /// `true` when this node is its own root.
    fn is_root(&self) -> bool;
}

/// Anything that persists its tree to a file.
pub trait AutoSave: TraceRoot {
    /// Path of the backing file, if the tree was connected to one.
    fn config_file(&self) -> Option<PathBuf>;

    /// Write the whole tree now. Only the root may save.
    fn save(&self) -> Result<()>;

    /// Block until every pending change is on disk. Callable from any node.
    fn flush(&self) -> Result<()>;
}

/// One level of an auto-vivifying tree.
///
/// Clones are handles to the same node, not copies. Use [`Node::ptr_eq`] for
/// identity and `==` for content.
#[derive(Clone)]
pub struct Node {
    tree: Arc<Tree>,
    id: NodeId,
}

/// What a key holds: a nested node or a leaf value.
#[derive(Debug, Clone)]
pub enum Item {
    /// Nested mapping.
    Node(Node),
    /// String, number, bool, null or array.
    Value(Value),
}

fn detached() -> Error {
    Error::State("node is detached from its tree".into())
}

impl Node {
    /// Empty in-memory tree (an `AutoDict`). It never touches the disk.
    pub fn new() -> Self {
        Self::from_state(TreeState {
            arena: Arena::new(),
            sync: None,
            dirty: false,
        })
    }

    /// In-memory tree seeded from a JSON object. Nested objects become nodes.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::from_state(TreeState {
                arena: Arena::from_map(map),
                sync: None,
                dirty: false,
            })),
            other => Err(Error::Type(format!(
                "a tree can only be built from an object, not {}",
                kind_of(&other)
            ))),
        }
    }

    pub(crate) fn from_state(state: TreeState) -> Self {
        let id = state.arena.root();
        Self {
            tree: Arc::new(Tree::new(state)),
            id,
        }
    }

    fn handle(&self, id: NodeId) -> Node {
        Node {
            tree: Arc::clone(&self.tree),
            id,
        }
    }

    fn item(&self, slot: Slot) -> Item {
        match slot {
            Slot::Leaf(v) => Item::Value(v),
            Slot::Node(id) => Item::Node(self.handle(id)),
        }
    }

    /// Same node of the same tree.
    #[must_use]
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Arc::ptr_eq(&a.tree, &b.tree) && a.id == b.id
    }

    // ---- vivifying reads ----

    /// Value under `key`. A missing key gets an empty child node, which is
    /// stored and returned; asking again returns that same node.
    pub fn get(&self, key: &str) -> Result<Item> {
        let slot = self
            .tree
            .state
            .lock()
            .arena
            .vivify(self.id, key)
            .ok_or_else(detached)?;
        Ok(self.item(slot))
    }

    /// Like [`get`](Self::get) but insists on a nested node.
    pub fn child(&self, key: &str) -> Result<Node> {
        match self.get(key)? {
            Item::Node(node) => Ok(node),
            Item::Value(v) => Err(Error::Type(format!(
                "key `{key}` holds {}, not a mapping",
                kind_of(&v)
            ))),
        }
    }

    /// Walk `path` from this node, vivifying every missing level.
    pub fn at<I, K>(&self, path: I) -> Result<Node>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut state = self.tree.state.lock();
        let mut cursor = self.id;
        for key in path {
            let key = key.as_ref();
            match state.arena.vivify(cursor, key).ok_or_else(detached)? {
                Slot::Node(next) => cursor = next,
                Slot::Leaf(v) => {
                    return Err(Error::Type(format!(
                        "key `{key}` holds {}, not a mapping",
                        kind_of(&v)
                    )))
                }
            }
        }
        if !state.arena.is_live(cursor) {
            return Err(detached());
        }
        Ok(self.handle(cursor))
    }

    // ---- plain reads ----

    /// Value under `key` without creating anything.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<Item> {
        let slot = {
            let state = self.tree.state.lock();
            state.arena.node(self.id)?.entries.get(key)?.clone()
        };
        Some(self.item(slot))
    }

    /// `true` if the key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        let state = self.tree.state.lock();
        state
            .arena
            .node(self.id)
            .is_some_and(|n| n.entries.contains_key(key))
    }

    /// Snapshot of the keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let state = self.tree.state.lock();
        state
            .arena
            .node(self.id)
            .map(|n| n.entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of all entries, sorted by key.
    #[must_use]
    pub fn iter(&self) -> Vec<(String, Item)> {
        let slots: Vec<(String, Slot)> = {
            let state = self.tree.state.lock();
            match state.arena.node(self.id) {
                Some(n) => n
                    .entries
                    .iter()
                    .map(|(k, s)| (k.clone(), s.clone()))
                    .collect(),
                None => Vec::new(),
            }
        };
        slots
            .into_iter()
            .map(|(k, s)| (k, self.item(s)))
            .collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.tree.state.lock();
        state.arena.node(self.id).map_or(0, |n| n.entries.len())
    }

    /// `true` when the node has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Plain JSON copy of this subtree.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.tree.state.lock().arena.to_value(self.id)
    }

    /// Keys leading from the root to this node. Empty for the root.
    #[must_use]
    pub fn key_path(&self) -> Vec<String> {
        self.tree.state.lock().arena.key_path(self.id)
    }

    /// `true` once the node was deleted, replaced or pruned.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        !self.tree.state.lock().arena.is_live(self.id)
    }

    /// Render this subtree with the tree's serializer and options.
    pub fn serialize(&self) -> Result<String> {
        let state = self.tree.state.lock();
        let data = state.arena.to_map(self.id);
        match &state.sync {
            Some(sync) => sync.serializer.serialize(&data, &sync.options),
            None => PrettyJson.serialize(&data, &SerializeOptions::default()),
        }
    }

    // ---- writes ----

    /// Store `value` under `key`, returning what was there before. Objects are
    /// turned into nodes of this tree, empty ones included.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        let key = key.into();
        let value = value.into();
        self.mutate(|arena, id| {
            let previous = arena.insert(id, key, value);
            (previous, true)
        })
    }

    /// Remove `key`. Branches left empty above it are pruned up to the root.
    /// Removing a missing key changes nothing and writes nothing: the call
    /// returns `Ok(None)` without saving, unlike a delete that removed
    /// something, which always saves exactly once.
    pub fn delete(&self, key: &str) -> Result<Option<Value>> {
        self.mutate(|arena, id| {
            let removed = arena.remove(id, key);
            let changed = removed.is_some();
            (removed, changed)
        })
    }

    /// Set several keys with a single save at the end.
    pub fn extend<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.mutate(|arena, id| {
            let mut changed = false;
            for (k, v) in entries {
                arena.insert(id, k.into(), v.into());
                changed = true;
            }
            ((), changed)
        })
    }

    /// Drop every entry of this node. A non-root node is then pruned.
    pub fn clear(&self) -> Result<()> {
        self.mutate(|arena, id| ((), arena.clear(id)))
    }

    fn mutate<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Arena, NodeId) -> (R, bool),
    {
        let (out, after) = {
            let mut state = self.tree.state.lock();
            if !state.arena.is_live(self.id) {
                return Err(detached());
            }
            let (out, changed) = f(&mut state.arena, self.id);
            if !changed {
                return Ok(out);
            }
            let after = state.on_mutation()?;
            (out, after)
        };
        if after == AfterMutation::PokeWorker {
            self.tree.poke();
        }
        Ok(out)
    }
}

impl TraceRoot for Node {
    fn root(&self) -> Node {
        let root = {
            let state = self.tree.state.lock();
            state
                .arena
                .node(self.id)
                .map_or_else(|| state.arena.root(), |n| n.root)
        };
        self.handle(root)
    }

    fn is_root(&self) -> bool {
        self.tree.state.lock().arena.is_root(self.id)
    }
}

impl AutoSave for Node {
    fn config_file(&self) -> Option<PathBuf> {
        let state = self.tree.state.lock();
        state.sync.as_ref().map(|s| s.path.clone())
    }

    fn save(&self) -> Result<()> {
        let mut state = self.tree.state.lock();
        if !state.arena.is_root(self.id) {
            return Err(Error::State("wrong node attempted to save".into()));
        }
        state.save_root()
    }

    fn flush(&self) -> Result<()> {
        self.tree.state.lock().save_if_dirty()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        if Node::ptr_eq(self, other) {
            return true;
        }
        let theirs = other.to_value();
        self == &theirs
    }
}

impl PartialEq<Value> for Node {
    fn eq(&self, other: &Value) -> bool {
        self.tree.state.lock().arena.eq_value(self.id, other)
    }
}

impl PartialEq<Node> for Value {
    fn eq(&self, other: &Node) -> bool {
        other == self
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (value, wrapper) = {
            let state = self.tree.state.lock();
            let wrapper = state.arena.is_root(self.id).then(|| state.type_name());
            (state.arena.to_value(self.id), wrapper)
        };
        match wrapper {
            Some(name) => write!(f, "{name}({value})"),
            None => write!(f, "{value}"),
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl Item {
    /// The nested node, if this is one.
    #[must_use]
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Item::Node(n) => Some(n),
            Item::Value(_) => None,
        }
    }

    /// The leaf value, if this is one.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Item::Node(_) => None,
            Item::Value(v) => Some(v),
        }
    }

    /// Plain JSON copy, nodes included.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Item::Node(n) => n.to_value(),
            Item::Value(v) => v,
        }
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Item) -> bool {
        match (self, other) {
            (Item::Node(a), Item::Node(b)) => a == b,
            (Item::Value(a), Item::Value(b)) => a == b,
            (Item::Node(n), Item::Value(v)) | (Item::Value(v), Item::Node(n)) => n == v,
        }
    }
}

impl PartialEq<Value> for Item {
    fn eq(&self, other: &Value) -> bool {
        match self {
            Item::Node(n) => n == other,
            Item::Value(v) => v == other,
        }
    }
}

impl PartialEq<&str> for Item {
    fn eq(&self, other: &&str) -> bool {
        self.as_value().and_then(Value::as_str) == Some(*other)
    }
}
