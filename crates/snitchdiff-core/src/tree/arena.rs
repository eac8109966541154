//! Arena-backed diff tree
//!
//! Nodes live in one flat `Vec` addressed by [`NodeIdx`]; child lists are
//! index vectors. The structure (which children a node has, their order and
//! side markers) is fixed at build time. Only view state changes afterwards:
//! expanded/collapsed, labels and coordinates.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use crate::errors::{DiffError, Result};
use crate::geometry::Point;
use crate::model::{NodeKey, NodeMap, Side, StructureFrame};
use crate::store::NodeStore;
use crate::tree::label::{placeholder, LabelView};

/// Index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(usize);

impl NodeIdx {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Child state of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Children {
    Leaf,
    /// Children are visible
    Expanded(Vec<NodeIdx>),
    /// Children are hidden but kept, in the same order
    Collapsed(Vec<NodeIdx>),
}

impl Children {
    /// Every child, visible or not
    pub fn ids(&self) -> &[NodeIdx] {
        match self {
            Children::Leaf => &[],
            Children::Expanded(ids) | Children::Collapsed(ids) => ids,
        }
    }

    /// Children that take part in layout
    pub fn visible(&self) -> &[NodeIdx] {
        match self {
            Children::Expanded(ids) => ids,
            _ => &[],
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, Children::Expanded(_))
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self, Children::Collapsed(_))
    }

    fn hide(&mut self) -> bool {
        match self {
            Children::Expanded(ids) => {
                *self = Children::Collapsed(std::mem::take(ids));
                true
            }
            _ => false,
        }
    }

    fn show(&mut self) -> bool {
        match self {
            Children::Collapsed(ids) => {
                *self = Children::Expanded(std::mem::take(ids));
                true
            }
            _ => false,
        }
    }
}

/// A node of the diff tree with its view state
#[derive(Debug, Clone)]
pub struct ViewNode {
    pub key: NodeKey,
    pub side: Side,
    pub parent: Option<NodeIdx>,
    pub depth: usize,
    pub children: Children,
    /// Slot of this node's record in the node store
    pub store_index: usize,
    pub label: String,
    /// Position from the latest layout pass
    pub position: Point,
    /// Position at the end of the previous render; transitions start here
    pub previous: Point,
}

/// The in-memory hierarchy of one diff
#[derive(Debug, Clone)]
pub struct DiffTree {
    nodes: Vec<ViewNode>,
    by_key: HashMap<NodeKey, NodeIdx>,
    max_label_len: usize,
}

impl DiffTree {
    /// Build the arena from a structure frame
    ///
    /// Siblings are ordered by entity type, then entity id. Labels start as
    /// placeholders.
    ///
    /// # Errors
    ///
    /// Node-map violations (`MissingNodeMapping`, `NodeIndexOutOfRange`),
    /// `DuplicateNode` when an entity appears twice and `InvalidStructure`
    /// when two entities share one store slot.
    pub fn build(frame: &StructureFrame, nodemap: &NodeMap, node_count: usize) -> Result<Self> {
        nodemap.validate(frame, node_count)?;

        let mut tree = DiffTree {
            nodes: Vec::with_capacity(frame.count()),
            by_key: HashMap::new(),
            max_label_len: 0,
        };

        let mut slots = HashSet::new();
        let root = tree.alloc(frame, nodemap, &mut slots, None, 0)?;
        let mut stack = vec![(root, frame)];
        while let Some((idx, frame)) = stack.pop() {
            let mut kids: Vec<&StructureFrame> = frame.children.iter().collect();
            kids.sort_by(|a, b| a.model.cmp(&b.model).then_with(|| a.id.cmp(&b.id)));

            let depth = tree.nodes[idx.0].depth + 1;
            let mut ids = Vec::with_capacity(kids.len());
            for kid in kids {
                let kid_idx = tree.alloc(kid, nodemap, &mut slots, Some(idx), depth)?;
                ids.push(kid_idx);
                stack.push((kid_idx, kid));
            }
            if !ids.is_empty() {
                tree.nodes[idx.0].children = Children::Expanded(ids);
            }
        }

        Ok(tree)
    }

    fn alloc(
        &mut self,
        frame: &StructureFrame,
        nodemap: &NodeMap,
        slots: &mut HashSet<usize>,
        parent: Option<NodeIdx>,
        depth: usize,
    ) -> Result<NodeIdx> {
        let key = frame.key();
        if self.by_key.contains_key(&key) {
            return Err(DiffError::DuplicateNode {
                entity_type: key.entity_type,
                entity_id: key.entity_id,
            });
        }
        let store_index = nodemap
            .index_of(&frame.model, &frame.id)
            .ok_or_else(|| DiffError::MissingNodeMapping {
                entity_type: frame.model.clone(),
                entity_id: frame.id.clone(),
            })?;
        if !slots.insert(store_index) {
            return Err(DiffError::InvalidStructure {
                reason: format!("{} shares node store slot {} with another node", key, store_index),
            });
        }

        let idx = NodeIdx(self.nodes.len());
        let label = placeholder(&key);
        self.max_label_len = self.max_label_len.max(label.chars().count());
        self.by_key.insert(key.clone(), idx);
        self.nodes.push(ViewNode {
            key,
            side: frame.side,
            parent,
            depth,
            children: Children::Leaf,
            store_index,
            label,
            position: Point::ORIGIN,
            previous: Point::ORIGIN,
        });
        Ok(idx)
    }

    pub fn root(&self) -> NodeIdx {
        NodeIdx(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, idx: NodeIdx) -> &ViewNode {
        &self.nodes[idx.0]
    }

    pub fn node_mut(&mut self, idx: NodeIdx) -> &mut ViewNode {
        &mut self.nodes[idx.0]
    }

    pub fn find(&self, key: &NodeKey) -> Option<NodeIdx> {
        self.by_key.get(key).copied()
    }

    /// Like [`Self::find`], as an error for unknown keys
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` if the key is not in this tree.
    pub fn require(&self, key: &NodeKey) -> Result<NodeIdx> {
        self.find(key).ok_or_else(|| DiffError::UnknownNode {
            entity_type: key.entity_type.clone(),
            entity_id: key.entity_id.clone(),
        })
    }

    /// Every node index, in arena order
    pub fn all(&self) -> impl Iterator<Item = NodeIdx> {
        (0..self.nodes.len()).map(NodeIdx)
    }

    /// Visible nodes in pre-order, siblings in sorted order
    pub fn visible(&self) -> Vec<NodeIdx> {
        let mut out = Vec::new();
        if self.nodes.is_empty() {
            return out;
        }
        let mut stack = vec![self.root()];
        while let Some(idx) = stack.pop() {
            out.push(idx);
            stack.extend(self.nodes[idx.0].children.visible().iter().rev());
        }
        out
    }

    /// Longest label length (in chars) observed over the whole tree,
    /// hidden nodes included
    pub fn max_label_len(&self) -> usize {
        self.max_label_len
    }

    /// Hide all descendants of `idx`, keeping the subtree
    ///
    /// Nodes that are already collapsed are left untouched, as are their
    /// hidden descendants.
    pub fn collapse(&mut self, idx: NodeIdx) {
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            let children = &mut self.nodes[i.0].children;
            if children.hide() {
                stack.extend_from_slice(children.ids());
            }
        }
    }

    /// Restore every hidden level below `idx`
    pub fn expand(&mut self, idx: NodeIdx) {
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            let children = &mut self.nodes[i.0].children;
            if children.show() {
                stack.extend_from_slice(children.ids());
            }
        }
    }

    /// Restore only the direct children of `idx`
    pub fn expand_one(&mut self, idx: NodeIdx) -> bool {
        self.nodes[idx.0].children.show()
    }

    /// Flip exactly one level: show hidden children or hide visible ones
    ///
    /// Returns false for leaves.
    pub fn toggle(&mut self, idx: NodeIdx) -> bool {
        let children = &mut self.nodes[idx.0].children;
        children.hide() || children.show()
    }

    /// Collapse every child subtree of the root, leaving the root's own
    /// children visible
    pub fn collapse_below_root(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        let kids = self.nodes[0].children.visible().to_vec();
        for kid in kids {
            self.collapse(kid);
        }
    }

    /// Recompute labels from the node store
    ///
    /// With `range`, only nodes whose store slot falls inside it are looked
    /// at. Returns the nodes whose label text changed. Structure and
    /// positions are never touched.
    pub fn relabel(
        &mut self,
        store: &NodeStore,
        view: &LabelView,
        range: Option<Range<usize>>,
    ) -> Vec<NodeIdx> {
        let mut changed = Vec::new();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if let Some(range) = &range {
                if !range.contains(&node.store_index) {
                    continue;
                }
            }
            let label = view.label(&node.key, store.get(node.store_index));
            if label != node.label {
                self.max_label_len = self.max_label_len.max(label.chars().count());
                node.label = label;
                changed.push(NodeIdx(i));
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> (StructureFrame, NodeMap) {
        let frame = StructureFrame::new("environment", "env", Side::Both)
            .with_child(
                StructureFrame::new("host", "b", Side::Both)
                    .with_child(StructureFrame::new("device", "eth1", Side::Left))
                    .with_child(StructureFrame::new("device", "eth0", Side::Right)),
            )
            .with_child(StructureFrame::new("host", "a", Side::Left))
            .with_child(StructureFrame::new("configfile", "z", Side::Right));
        let mut map = NodeMap::new();
        for (i, (t, id)) in [
            ("environment", "env"),
            ("host", "b"),
            ("device", "eth1"),
            ("device", "eth0"),
            ("host", "a"),
            ("configfile", "z"),
        ]
        .iter()
        .enumerate()
        {
            map.insert(t, id, i);
        }
        (frame, map)
    }

    fn keys(tree: &DiffTree, ids: &[NodeIdx]) -> Vec<String> {
        ids.iter().map(|i| tree.node(*i).key.to_string()).collect()
    }

    #[test]
    fn test_build_sorts_siblings_by_type_then_id() {
        let (frame, map) = frame();
        let tree = DiffTree::build(&frame, &map, 6).unwrap();

        assert_eq!(
            keys(&tree, &tree.visible()),
            vec![
                "environment:env",
                "configfile:z",
                "host:a",
                "host:b",
                "device:eth0",
                "device:eth1"
            ]
        );
        assert_eq!(tree.node(tree.root()).depth, 0);
        let eth0 = tree.find(&NodeKey::new("device", "eth0")).unwrap();
        assert_eq!(tree.node(eth0).depth, 2);
        assert_eq!(tree.node(eth0).store_index, 3);
    }

    #[test]
    fn test_build_rejects_duplicate_entity() {
        let frame = StructureFrame::new("host", "h", Side::Both)
            .with_child(StructureFrame::new("device", "d", Side::Left))
            .with_child(StructureFrame::new("device", "d", Side::Right));
        let mut map = NodeMap::new();
        map.insert("host", "h", 0);
        map.insert("device", "d", 1);

        let result = DiffTree::build(&frame, &map, 2);
        assert!(matches!(result, Err(DiffError::DuplicateNode { .. })));
    }

    #[test]
    fn test_build_rejects_shared_store_slot() {
        let frame = StructureFrame::new("host", "h", Side::Both)
            .with_child(StructureFrame::new("device", "eth0", Side::Left))
            .with_child(StructureFrame::new("device", "eth1", Side::Right));
        let mut map = NodeMap::new();
        map.insert("host", "h", 0);
        map.insert("device", "eth0", 1);
        map.insert("device", "eth1", 1);

        let result = DiffTree::build(&frame, &map, 2);
        assert!(matches!(result, Err(DiffError::InvalidStructure { .. })));
    }

    #[test]
    fn test_collapse_hides_subtree_and_expand_restores() {
        let (frame, map) = frame();
        let mut tree = DiffTree::build(&frame, &map, 6).unwrap();
        let root = tree.root();
        let before = tree.node(root).children.clone();

        tree.collapse(root);
        assert_eq!(tree.visible(), vec![root]);
        let host_b = tree.find(&NodeKey::new("host", "b")).unwrap();
        assert!(tree.node(host_b).children.is_collapsed());

        tree.expand(root);
        assert_eq!(tree.node(root).children, before);
        assert_eq!(tree.visible().len(), 6);
    }

    #[test]
    fn test_collapse_is_idempotent() {
        let (frame, map) = frame();
        let mut tree = DiffTree::build(&frame, &map, 6).unwrap();
        let root = tree.root();

        tree.collapse(root);
        let once = tree.node(root).children.clone();
        tree.collapse(root);
        assert_eq!(tree.node(root).children, once);
    }

    #[test]
    fn test_toggle_flips_one_level_only() {
        let (frame, map) = frame();
        let mut tree = DiffTree::build(&frame, &map, 6).unwrap();
        tree.collapse_below_root();
        assert_eq!(tree.visible().len(), 4);

        let host_b = tree.find(&NodeKey::new("host", "b")).unwrap();
        assert!(tree.toggle(host_b));
        assert_eq!(tree.visible().len(), 6);

        assert!(tree.toggle(host_b));
        assert_eq!(tree.visible().len(), 4);

        let leaf = tree.find(&NodeKey::new("host", "a")).unwrap();
        assert!(!tree.toggle(leaf));
    }

    #[test]
    fn test_toggle_after_recursive_collapse_keeps_grandchildren_hidden() {
        let (frame, map) = frame();
        let mut tree = DiffTree::build(&frame, &map, 6).unwrap();
        let root = tree.root();
        tree.collapse(root);

        tree.toggle(root);

        // root's children are back, host:b's children stay hidden
        assert_eq!(tree.visible().len(), 4);
    }
}
