// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cullable nodes: the arena-backed hierarchy behind a [`CullTree`][crate::CullTree].
//!
//! Nodes live in one contiguous arena owned by the tree. The `fan_out`
//! children of a node are allocated together and occupy consecutive slots
//! starting at `first_child`, so a child is addressed as `first_child + slot`
//! where `slot` is the index of its cell in [`Mbr::subdivide`].

use alloc::vec::Vec;
use core::fmt::Debug;

use smallvec::SmallVec;

use crate::config::CullConfig;
use crate::drawable::DrawableId;
use crate::error::CullError;
use crate::types::Mbr;

/// Index of a node within its tree.
///
/// Nodes are never freed individually, so an id stays valid until the tree
/// is cleared or dropped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const ROOT: Self = Self(0);

    #[allow(
        clippy::cast_possible_truncation,
        reason = "Node ids are 32-bit; a tree with more than u32::MAX nodes is not supported."
    )]
    const fn new(idx: usize) -> Self {
        Self(idx as u32)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A drawable held directly by a node, with the local bounds it was inserted with.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Entry {
    pub(crate) id: DrawableId,
    pub(crate) mbr: Mbr,
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) mbr: Mbr,
    pub(crate) depth: u32,
    pub(crate) first_child: Option<NodeId>,
    /// Insertion order is preserved across splits and removals.
    pub(crate) drawables: SmallVec<[Entry; 4]>,
}

impl Node {
    fn new(mbr: Mbr, depth: u32) -> Self {
        Self {
            mbr,
            depth,
            first_child: None,
            drawables: SmallVec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct NodeArena {
    nodes: Vec<Node>,
    fan_out: usize,
}

impl NodeArena {
    pub(crate) fn new(root: Mbr, fan_out: usize) -> Self {
        let mut nodes = Vec::new();
        nodes.push(Node::new(root, 0));
        Self { nodes, fan_out }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn fan_out(&self) -> usize {
        self.fan_out
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.idx()]
    }

    pub(crate) fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::new(i), n))
    }

    /// Child `slot` of a subdivided node.
    #[inline]
    pub(crate) fn child_of(&self, first_child: NodeId, slot: usize) -> NodeId {
        debug_assert!(slot < self.fan_out, "child slot past fan-out");
        NodeId::new(first_child.idx() + slot)
    }

    /// Children of `id` in slot order; empty for a leaf.
    pub(crate) fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let first = self.node(id).first_child;
        let count = if first.is_some() { self.fan_out } else { 0 };
        (0..count).filter_map(move |slot| first.map(|f| self.child_of(f, slot)))
    }

    /// Pre-order walk of the subtree rooted at `id`, children in slot order.
    pub(crate) fn subtree(&self, id: NodeId) -> Subtree<'_> {
        let mut stack = SmallVec::new();
        stack.push(id);
        Subtree { arena: self, stack }
    }

    /// Drop every node but the root and empty the root's list.
    pub(crate) fn clear(&mut self) {
        self.nodes.truncate(1);
        let root = &mut self.nodes[NodeId::ROOT.idx()];
        root.first_child = None;
        root.drawables.clear();
    }

    /// Insert a drawable into the subtree rooted at `start`; returns the node now holding it.
    ///
    /// The drawable descends while it fits exactly one child cell. A childless
    /// node below `max_depth` whose list has reached `split_threshold` splits
    /// first and pushes its fitting drawables down. Drawables that straddle a
    /// cell boundary stay at the lowest node that fully contains them.
    pub(crate) fn add_drawable(
        &mut self,
        config: &CullConfig,
        start: NodeId,
        mbr: Mbr,
        id: DrawableId,
    ) -> NodeId {
        debug_assert_eq!(config.fan_out, self.fan_out, "fan-out changed after construction");
        let mut at = start;
        loop {
            let node = &self.nodes[at.idx()];
            let slot = if node.depth >= config.max_depth {
                None
            } else {
                node.mbr.unique_cell(self.fan_out, &mbr)
            };
            let (first_child, held) = (node.first_child, node.drawables.len());
            let Some(slot) = slot else {
                self.nodes[at.idx()].drawables.push(Entry { id, mbr });
                return at;
            };
            let first = match first_child {
                Some(first) => first,
                None if held < config.split_threshold => {
                    self.nodes[at.idx()].drawables.push(Entry { id, mbr });
                    return at;
                }
                None => self.split(at),
            };
            at = self.child_of(first, slot);
        }
    }

    /// Allocate the children of a leaf and push down every drawable that fits one of them.
    fn split(&mut self, at: NodeId) -> NodeId {
        let parent = &self.nodes[at.idx()];
        debug_assert!(parent.first_child.is_none(), "split of an already split node");
        let depth = parent.depth + 1;
        let parent_mbr = parent.mbr;
        let cells = parent_mbr.subdivide(self.fan_out);

        let first = NodeId::new(self.nodes.len());
        self.nodes
            .extend(cells.into_iter().map(|cell| Node::new(cell, depth)));

        let entries = core::mem::take(&mut self.nodes[at.idx()].drawables);
        let mut kept = SmallVec::new();
        let mut moved = 0_usize;
        for entry in entries {
            match parent_mbr.unique_cell(self.fan_out, &entry.mbr) {
                Some(slot) => {
                    let child = self.child_of(first, slot);
                    self.nodes[child.idx()].drawables.push(entry);
                    moved += 1;
                }
                None => kept.push(entry),
            }
        }

        let node = &mut self.nodes[at.idx()];
        node.drawables = kept;
        node.first_child = Some(first);
        log::debug!(
            "split node {} at depth {}: pushed down {moved}, kept {}",
            at.0,
            depth - 1,
            node.drawables.len()
        );
        first
    }

    /// Look for `id` on the path its bounds select from the root.
    pub(crate) fn find_along(&self, mbr: &Mbr, id: DrawableId) -> Option<(NodeId, usize)> {
        let mut at = NodeId::ROOT;
        loop {
            let node = self.node(at);
            if let Some(pos) = node.drawables.iter().position(|e| e.id == id) {
                return Some((at, pos));
            }
            let first = node.first_child?;
            let slot = node.mbr.unique_cell(self.fan_out, mbr)?;
            at = self.child_of(first, slot);
        }
    }

    /// Look for `id` in every node.
    pub(crate) fn find_anywhere(&self, id: DrawableId) -> Option<(NodeId, usize)> {
        self.nodes().find_map(|(nid, node)| {
            node.drawables
                .iter()
                .position(|e| e.id == id)
                .map(|pos| (nid, pos))
        })
    }

    /// Remove the entry at `pos` of a node's list, keeping the order of the rest.
    pub(crate) fn take(&mut self, at: NodeId, pos: usize) -> Entry {
        self.nodes[at.idx()].drawables.remove(pos)
    }
}

/// Pre-order node walk; see [`NodeArena::subtree`].
#[derive(Clone, Debug)]
pub(crate) struct Subtree<'a> {
    arena: &'a NodeArena,
    stack: SmallVec<[NodeId; 16]>,
}

impl Iterator for Subtree<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if let Some(first) = self.arena.node(id).first_child {
            for slot in (0..self.arena.fan_out).rev() {
                self.stack.push(self.arena.child_of(first, slot));
            }
        }
        Some(id)
    }
}

/// Read-only view of one node of a cull tree.
///
/// Obtained from [`CullTree::root`][crate::CullTree::root] and navigated with
/// [`child`][Self::child] or [`children`][Self::children].
#[derive(Copy, Clone)]
pub struct Cullable<'a> {
    arena: &'a NodeArena,
    id: NodeId,
}

impl Debug for Cullable<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let node = self.arena.node(self.id);
        f.debug_struct("Cullable")
            .field("id", &self.id)
            .field("mbr", &node.mbr)
            .field("depth", &node.depth)
            .field("drawables", &node.drawables.len())
            .field("has_children", &node.first_child.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> Cullable<'a> {
    pub(crate) fn new(arena: &'a NodeArena, id: NodeId) -> Self {
        Self { arena, id }
    }

    fn node(&self) -> &'a Node {
        self.arena.node(self.id)
    }

    /// This node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Spatial extent of this node.
    pub fn mbr(&self) -> Mbr {
        self.node().mbr
    }

    /// Subdivision depth; the root is 0.
    pub fn depth(&self) -> u32 {
        self.node().depth
    }

    /// Drawables held directly by this node, in insertion order.
    pub fn drawables(&self) -> impl Iterator<Item = DrawableId> + use<'a> {
        self.node().drawables.iter().map(|e| e.id)
    }

    /// Drawables held directly by this node together with their local bounds.
    pub fn drawables_with_bounds(&self) -> impl Iterator<Item = (DrawableId, Mbr)> + use<'a> {
        self.node().drawables.iter().map(|e| (e.id, e.mbr))
    }

    /// Every drawable below this node, excluding its own list.
    ///
    /// Children are visited depth-first in slot order; each node's own list
    /// comes before its descendants'.
    pub fn child_drawables(&self) -> impl Iterator<Item = DrawableId> + use<'a> {
        let arena = self.arena;
        arena
            .children(self.id)
            .flat_map(move |child| arena.subtree(child))
            .flat_map(move |id| arena.node(id).drawables.iter().map(|e| e.id))
    }

    /// Whether this node has been subdivided.
    pub fn has_children(&self) -> bool {
        self.node().first_child.is_some()
    }

    /// Whether neither this node nor any descendant holds a drawable.
    pub fn is_empty(&self) -> bool {
        self.arena
            .subtree(self.id)
            .all(|id| self.arena.node(id).drawables.is_empty())
    }

    /// Child `index`, in [`Mbr::subdivide`] order.
    ///
    /// Fails with [`CullError::OutOfRange`] when `index` is past the fan-out
    /// or this node has no children.
    pub fn child(&self, index: usize) -> Result<Self, CullError> {
        match self.node().first_child {
            Some(first) if index < self.arena.fan_out() => {
                Ok(Self::new(self.arena, self.arena.child_of(first, index)))
            }
            first => Err(CullError::OutOfRange {
                index,
                len: if first.is_some() { self.arena.fan_out() } else { 0 },
            }),
        }
    }

    /// Children in slot order; empty for a leaf.
    pub fn children(&self) -> impl Iterator<Item = Self> + use<'a> {
        let arena = self.arena;
        arena.children(self.id).map(move |id| Self::new(arena, id))
    }

    /// Number of nodes in this subtree, including this one.
    pub fn count_nodes(&self) -> usize {
        self.arena.subtree(self.id).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn quad(max_depth: u32, split_threshold: usize) -> (NodeArena, CullConfig) {
        let config = CullConfig::new(max_depth).with_split_threshold(split_threshold);
        (NodeArena::new(Mbr::new(0., 0., 100., 100.), 4), config)
    }

    fn ids(it: impl Iterator<Item = DrawableId>) -> Vec<u64> {
        it.map(|d| d.0).collect()
    }

    #[test]
    fn fills_root_until_threshold() {
        let (mut arena, config) = quad(3, 2);
        arena.add_drawable(&config, NodeId::ROOT, Mbr::new(1., 1., 2., 2.), DrawableId(1));
        arena.add_drawable(&config, NodeId::ROOT, Mbr::new(60., 1., 61., 2.), DrawableId(2));
        let root = Cullable::new(&arena, NodeId::ROOT);
        assert!(!root.has_children());
        assert_eq!(ids(root.drawables()), vec![1, 2]);
        assert_eq!(root.count_nodes(), 1);
    }

    #[test]
    fn split_pushes_down_and_keeps_straddlers() {
        let (mut arena, config) = quad(3, 2);
        arena.add_drawable(&config, NodeId::ROOT, Mbr::new(40., 40., 60., 60.), DrawableId(1));
        arena.add_drawable(&config, NodeId::ROOT, Mbr::new(1., 1., 2., 2.), DrawableId(2));
        let holder =
            arena.add_drawable(&config, NodeId::ROOT, Mbr::new(60., 60., 61., 61.), DrawableId(3));

        let root = Cullable::new(&arena, NodeId::ROOT);
        assert!(root.has_children());
        assert_eq!(ids(root.drawables()), vec![1]);
        assert_eq!(ids(root.child(0).unwrap().drawables()), vec![2]);
        assert_eq!(root.child(3).unwrap().id(), holder);
        assert_eq!(ids(root.child_drawables()), vec![2, 3]);
        assert_eq!(root.count_nodes(), 5);
    }

    #[test]
    fn max_depth_nodes_never_split() {
        let (mut arena, config) = quad(0, 1);
        for i in 0..10_u32 {
            let x = f64::from(i) * 5.;
            arena.add_drawable(
                &config,
                NodeId::ROOT,
                Mbr::new(x, x, x + 1., x + 1.),
                DrawableId(i.into()),
            );
        }
        let root = Cullable::new(&arena, NodeId::ROOT);
        assert!(!root.has_children());
        assert_eq!(root.drawables().count(), 10);
    }

    #[test]
    fn deep_descent_respects_depth_bound() {
        let (mut arena, config) = quad(3, 1);
        // All drawables crowd the lower-left corner so every level splits.
        for i in 0..8_u32 {
            let x = f64::from(i) * 0.1;
            arena.add_drawable(
                &config,
                NodeId::ROOT,
                Mbr::new(x, x, x + 0.05, x + 0.05),
                DrawableId(i.into()),
            );
        }
        let max = arena.nodes().map(|(_, n)| n.depth).max().unwrap();
        assert_eq!(max, 3);
        for (_, node) in arena.nodes() {
            if node.depth == config.max_depth {
                assert!(node.first_child.is_none());
            }
        }
    }

    #[test]
    fn child_index_errors() {
        let (mut arena, config) = quad(3, 1);
        let root = Cullable::new(&arena, NodeId::ROOT);
        assert_eq!(
            root.child(0).unwrap_err(),
            CullError::OutOfRange { index: 0, len: 0 }
        );

        arena.add_drawable(&config, NodeId::ROOT, Mbr::new(1., 1., 2., 2.), DrawableId(1));
        arena.add_drawable(&config, NodeId::ROOT, Mbr::new(3., 3., 4., 4.), DrawableId(2));
        let root = Cullable::new(&arena, NodeId::ROOT);
        assert!(root.child(3).is_ok());
        assert_eq!(
            root.child(4).unwrap_err(),
            CullError::OutOfRange { index: 4, len: 4 }
        );
    }

    #[test]
    fn emptiness_looks_at_descendants() {
        let (mut arena, config) = quad(3, 1);
        arena.add_drawable(&config, NodeId::ROOT, Mbr::new(1., 1., 2., 2.), DrawableId(1));
        arena.add_drawable(&config, NodeId::ROOT, Mbr::new(3., 3., 4., 4.), DrawableId(2));
        let root = Cullable::new(&arena, NodeId::ROOT);
        assert!(root.drawables().next().is_none());
        assert!(!root.is_empty());
        assert!(root.child(1).unwrap().is_empty());

        let (at, pos) = arena.find_anywhere(DrawableId(1)).unwrap();
        arena.take(at, pos);
        let (at, pos) = arena.find_anywhere(DrawableId(2)).unwrap();
        arena.take(at, pos);
        assert!(Cullable::new(&arena, NodeId::ROOT).is_empty());
    }

    #[test]
    fn find_along_follows_bounds() {
        let (mut arena, config) = quad(3, 1);
        let a = Mbr::new(1., 1., 2., 2.);
        let b = Mbr::new(70., 70., 71., 71.);
        arena.add_drawable(&config, NodeId::ROOT, a, DrawableId(1));
        let held = arena.add_drawable(&config, NodeId::ROOT, b, DrawableId(2));
        assert_eq!(arena.find_along(&b, DrawableId(2)), Some((held, 0)));
        // Searching with the wrong bounds misses it.
        assert_eq!(arena.find_along(&a, DrawableId(2)), None);
        assert_eq!(arena.find_anywhere(DrawableId(2)), Some((held, 0)));
    }

    #[test]
    fn clear_resets_to_root() {
        let (mut arena, config) = quad(3, 1);
        arena.add_drawable(&config, NodeId::ROOT, Mbr::new(1., 1., 2., 2.), DrawableId(1));
        arena.add_drawable(&config, NodeId::ROOT, Mbr::new(3., 3., 4., 4.), DrawableId(2));
        assert!(arena.len() > 1);
        arena.clear();
        assert_eq!(arena.len(), 1);
        assert!(Cullable::new(&arena, NodeId::ROOT).is_empty());
    }
}
