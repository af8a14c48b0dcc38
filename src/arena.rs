//! Node storage for one tree.
//!
//! Nodes live in a slab indexed by [`NodeId`]. Each node keeps the id of the
//! tree's root and a link to the slot that holds it in its parent, so any node
//! can find its root or be unlinked without walking down from the top. Ids
//! carry a generation; freeing a node bumps it so stale handles are detected
//! instead of silently aliasing a reused slot.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId {
    index: usize,
    generation: u32,
}

/// What a key maps to inside a node.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Leaf(Value),
    Node(NodeId),
}

#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) root: NodeId,
    pub(crate) parent: Option<(NodeId, String)>,
    pub(crate) entries: BTreeMap<String, Slot>,
}

#[derive(Debug)]
struct Cell {
    generation: u32,
    data: Option<NodeData>,
}

#[derive(Debug)]
pub(crate) struct Arena {
    cells: Vec<Cell>,
    free: Vec<usize>,
    root: NodeId,
}

impl Arena {
    /// An arena holding a single empty root.
    pub(crate) fn new() -> Self {
        let root = NodeId {
            index: 0,
            generation: 0,
        };
        let cell = Cell {
            generation: 0,
            data: Some(NodeData {
                root,
                parent: None,
                entries: BTreeMap::new(),
            }),
        };
        Self {
            cells: vec![cell],
            free: Vec::new(),
            root,
        }
    }

    /// An arena whose root is seeded from `map`.
    pub(crate) fn from_map(map: Map<String, Value>) -> Self {
        let mut arena = Self::new();
        let root = arena.root;
        for (key, value) in map {
            arena.insert(root, key, value);
        }
        arena
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.cells
            .get(id.index)
            .filter(|c| c.generation == id.generation)
            .and_then(|c| c.data.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.cells
            .get_mut(id.index)
            .filter(|c| c.generation == id.generation)
            .and_then(|c| c.data.as_mut())
    }

    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub(crate) fn is_root(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.root == id)
    }

    fn alloc(&mut self, parent: NodeId, key: &str) -> NodeId {
        let data = NodeData {
            root: self.root,
            parent: Some((parent, key.to_string())),
            entries: BTreeMap::new(),
        };
        match self.free.pop() {
            Some(index) => {
                let cell = &mut self.cells[index];
                cell.data = Some(data);
                NodeId {
                    index,
                    generation: cell.generation,
                }
            }
            None => {
                self.cells.push(Cell {
                    generation: 0,
                    data: Some(data),
                });
                NodeId {
                    index: self.cells.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Free `id` and everything below it.
    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(cell) = self.cells.get_mut(next.index) else {
                continue;
            };
            if cell.generation != next.generation {
                continue;
            }
            if let Some(data) = cell.data.take() {
                cell.generation = cell.generation.wrapping_add(1);
                self.free.push(next.index);
                stack.extend(data.entries.into_values().filter_map(|s| match s {
                    Slot::Node(child) => Some(child),
                    Slot::Leaf(_) => None,
                }));
            }
        }
    }

    /// Existing slot under `key`, or a fresh empty child stored there.
    /// `None` only when `id` is not live.
    pub(crate) fn vivify(&mut self, id: NodeId, key: &str) -> Option<Slot> {
        if let Some(slot) = self.node(id)?.entries.get(key) {
            return Some(slot.clone());
        }
        let child = self.alloc(id, key);
        self.node_mut(id)?
            .entries
            .insert(key.to_string(), Slot::Node(child));
        tracing::trace!(key, "vivified child node");
        Some(Slot::Node(child))
    }

    /// Store `value` under `key`, turning objects into child nodes. Returns the
    /// previous contents of the key. The caller checks `id` is live.
    pub(crate) fn insert(&mut self, id: NodeId, key: String, value: Value) -> Option<Value> {
        let slot = match value {
            Value::Object(map) => {
                let child = self.alloc(id, &key);
                for (k, v) in map {
                    self.insert(child, k, v);
                }
                Slot::Node(child)
            }
            leaf => Slot::Leaf(leaf),
        };
        let previous = self.node_mut(id)?.entries.insert(key, slot)?;
        Some(self.take_slot(previous))
    }

    /// Remove `key` from `id`, then prune `id` and its ancestors while they
    /// are empty. The root is never pruned.
    pub(crate) fn remove(&mut self, id: NodeId, key: &str) -> Option<Value> {
        let slot = self.node_mut(id)?.entries.remove(key)?;
        let removed = self.take_slot(slot);
        self.prune(id);
        Some(removed)
    }

    /// Drop every entry of `id`, then prune it. Returns `false` when there was
    /// nothing to clear.
    pub(crate) fn clear(&mut self, id: NodeId) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        if node.entries.is_empty() {
            return false;
        }
        let entries = std::mem::take(&mut node.entries);
        for slot in entries.into_values() {
            if let Slot::Node(child) = slot {
                self.release(child);
            }
        }
        self.prune(id);
        true
    }

    fn prune(&mut self, mut id: NodeId) {
        loop {
            let Some(node) = self.node(id) else { return };
            if node.root == id || !node.entries.is_empty() {
                return;
            }
            let Some((parent, key)) = node.parent.clone() else {
                return;
            };
            if let Some(p) = self.node_mut(parent) {
                p.entries.remove(&key);
            }
            self.release(id);
            tracing::trace!(key = %key, "pruned empty branch");
            id = parent;
        }
    }

    fn take_slot(&mut self, slot: Slot) -> Value {
        match slot {
            Slot::Leaf(v) => v,
            Slot::Node(child) => {
                let value = self.to_value(child);
                self.release(child);
                value
            }
        }
    }

    /// Plain JSON copy of the subtree at `id`. Detached ids read as `{}`.
    pub(crate) fn to_map(&self, id: NodeId) -> Map<String, Value> {
        let Some(node) = self.node(id) else {
            return Map::new();
        };
        node.entries
            .iter()
            .map(|(k, slot)| (k.clone(), self.slot_value(slot)))
            .collect()
    }

    pub(crate) fn to_value(&self, id: NodeId) -> Value {
        Value::Object(self.to_map(id))
    }

    pub(crate) fn slot_value(&self, slot: &Slot) -> Value {
        match slot {
            Slot::Leaf(v) => v.clone(),
            Slot::Node(child) => self.to_value(*child),
        }
    }

    /// Keys from the root down to `id`.
    pub(crate) fn key_path(&self, id: NodeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut cursor = id;
        while let Some((parent, key)) = self.node(cursor).and_then(|n| n.parent.as_ref()) {
            path.push(key.clone());
            cursor = *parent;
        }
        path.reverse();
        path
    }

    /// `true` if the subtree at `id` equals `other`, without copying it.
    pub(crate) fn eq_value(&self, id: NodeId, other: &Value) -> bool {
        let Value::Object(map) = other else {
            return false;
        };
        let entries = match self.node(id) {
            Some(n) => &n.entries,
            None => return map.is_empty(),
        };
        entries.len() == map.len()
            && entries.iter().all(|(k, slot)| match (slot, map.get(k)) {
                (Slot::Leaf(v), Some(o)) => v == o,
                (Slot::Node(child), Some(o)) => self.eq_value(*child, o),
                (_, None) => false,
            })
    }
}
