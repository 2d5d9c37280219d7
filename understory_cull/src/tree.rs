// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The cull tree: insertion, removal, and per-frame visibility queries.

use core::fmt::Debug;

use hashbrown::HashSet;
use smallvec::SmallVec;

use crate::config::CullConfig;
use crate::coord::{CoordSystemAdapter, IdentityAdapter};
use crate::drawable::{DrawableId, DrawableRef};
use crate::error::{CullError, GeometryFault};
use crate::node::{Cullable, Entry, NodeArena, NodeId};
use crate::types::Mbr;
use crate::view::{Containment, ViewRegion};

/// Spatial hierarchy deciding which drawables a frame needs to draw.
///
/// The tree covers a fixed world extent given at construction. Drawables are
/// inserted with their geographic extent, projected through the tree's
/// [`CoordSystemAdapter`], and stored at the deepest node whose cell fully
/// contains them. Each drawable id is held by exactly one node.
///
/// The type parameter `A` is the coordinate adapter. It defaults to
/// [`IdentityAdapter`]; any `Fn(GeoCoord) -> Point` works as well.
///
/// ## Example
///
/// ```rust
/// use understory_cull::{CullConfig, CullTree, DrawableId, IdentityAdapter, Mbr};
///
/// let config = CullConfig::new(3).with_split_threshold(2);
/// let mut tree =
///     CullTree::with_config(IdentityAdapter, Mbr::new(0.0, 0.0, 100.0, 100.0), config).unwrap();
///
/// tree.insert_local(DrawableId(1), Mbr::new(10.0, 10.0, 12.0, 12.0)).unwrap();
/// tree.insert_local(DrawableId(2), Mbr::new(80.0, 80.0, 82.0, 82.0)).unwrap();
///
/// let visible: Vec<_> = tree.query_visible(Mbr::new(0.0, 0.0, 50.0, 50.0)).collect();
/// assert_eq!(visible, [DrawableId(1)]);
/// ```
pub struct CullTree<A = IdentityAdapter> {
    adapter: A,
    config: CullConfig,
    arena: NodeArena,
    /// Every drawable currently held, for duplicate detection and fast misses.
    members: HashSet<DrawableId>,
}

impl<A> Debug for CullTree<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CullTree")
            .field("world_extent", &self.world_extent())
            .field("config", &self.config)
            .field("nodes", &self.arena.len())
            .field("drawables", &self.members.len())
            .finish_non_exhaustive()
    }
}

/// Shape and occupancy summary of a cull tree.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CullStats {
    /// Total nodes, including the root.
    pub nodes: usize,
    /// Nodes without children.
    pub leaves: usize,
    /// Drawables held across all nodes.
    pub drawables: usize,
    /// Drawables held by the root (straddlers of the first split, or everything before it).
    pub root_drawables: usize,
    /// Largest direct list held by any one node.
    pub max_direct: usize,
    /// Depth of the deepest node.
    pub deepest: u32,
}

impl<A> CullTree<A> {
    /// The world extent covered by the root node.
    pub fn world_extent(&self) -> Mbr {
        self.arena.node(NodeId::ROOT).mbr
    }

    /// The subdivision policy.
    pub fn config(&self) -> &CullConfig {
        &self.config
    }

    /// The coordinate adapter used to project drawables.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// The root node.
    pub fn root(&self) -> Cullable<'_> {
        Cullable::new(&self.arena, NodeId::ROOT)
    }

    /// Number of drawables held.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no drawable is held anywhere in the tree.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Total number of nodes, including the root.
    pub fn count_nodes(&self) -> usize {
        self.arena.len()
    }

    /// Whether `id` is held by the tree.
    pub fn contains(&self, id: DrawableId) -> bool {
        self.members.contains(&id)
    }

    /// The node currently holding `id`, found by scanning every node.
    pub fn holder_of(&self, id: DrawableId) -> Option<Cullable<'_>> {
        if !self.members.contains(&id) {
            return None;
        }
        self.arena
            .find_anywhere(id)
            .map(|(at, _)| Cullable::new(&self.arena, at))
    }

    /// Insert a drawable with precomputed local bounds.
    ///
    /// Fails without touching the tree if the bounds are not finite, are
    /// inverted, or miss the world extent entirely, or if `id` is already
    /// held. Bounds that only partly overlap the world extent are accepted
    /// and kept at the root.
    pub fn insert_local(&mut self, id: DrawableId, mbr: Mbr) -> Result<(), CullError> {
        self.check_bounds(&mbr)?;
        if self.members.contains(&id) {
            return Err(CullError::AlreadyPresent(id));
        }
        let holder = self
            .arena
            .add_drawable(&self.config, NodeId::ROOT, mbr, id);
        self.members.insert(id);
        log::trace!("inserted drawable {id} into node {holder:?}");
        Ok(())
    }

    /// Remove a drawable using the local bounds it was inserted with.
    ///
    /// The search follows the cells those bounds select. If the drawable is
    /// not on that path (its bounds were changed after insertion) every node
    /// is scanned instead. Returns whether the drawable was held.
    pub fn remove_local(&mut self, id: DrawableId, mbr: Mbr) -> Result<bool, CullError> {
        self.check_bounds(&mbr)?;
        if !self.members.contains(&id) {
            return Ok(false);
        }
        let found = self.arena.find_along(&mbr, id).or_else(|| {
            log::warn!("drawable {id} is not where its bounds {mbr:?} lead; scanning all nodes");
            self.arena.find_anywhere(id)
        });
        let (at, pos) =
            found.expect("cull tree invariant violated: member missing from every node");
        self.arena.take(at, pos);
        self.members.remove(&id);
        log::trace!("removed drawable {id} from node {at:?}");
        Ok(true)
    }

    /// Remove a drawable by id alone, scanning every node.
    pub fn remove_id(&mut self, id: DrawableId) -> bool {
        if !self.members.remove(&id) {
            return false;
        }
        let (at, pos) = self
            .arena
            .find_anywhere(id)
            .expect("cull tree invariant violated: member missing from every node");
        self.arena.take(at, pos);
        true
    }

    /// Drop every drawable and every node below the root.
    ///
    /// The world extent and configuration are kept.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.members.clear();
    }

    /// Lazily yield the drawables visible in `view`.
    ///
    /// The traversal is depth-first: a node's own drawables come before its
    /// children's, children in slot order. Subtrees whose cell is outside the
    /// view are skipped without being visited; drawables of a partially
    /// visible node are tested individually. Dropping the iterator abandons
    /// the traversal. An empty tree or a view disjoint from the world yields
    /// nothing.
    pub fn query_visible<V: ViewRegion>(&self, view: V) -> Visible<'_, V> {
        Visible::new(&self.arena, view)
    }

    /// Visit the drawables visible in `view`, in the order of [`query_visible`][Self::query_visible].
    pub fn visit_visible<V: ViewRegion, F: FnMut(DrawableId)>(&self, view: V, mut f: F) {
        for id in self.query_visible(view) {
            f(id);
        }
    }

    /// Shape and occupancy summary.
    pub fn stats(&self) -> CullStats {
        let mut stats = CullStats {
            root_drawables: self.arena.node(NodeId::ROOT).drawables.len(),
            ..CullStats::default()
        };
        for (_, node) in self.arena.nodes() {
            stats.nodes += 1;
            if node.first_child.is_none() {
                stats.leaves += 1;
            }
            stats.drawables += node.drawables.len();
            stats.max_direct = stats.max_direct.max(node.drawables.len());
            stats.deepest = stats.deepest.max(node.depth);
        }
        stats
    }

    /// Log [`stats`][Self::stats] at `info`.
    pub fn dump_stats(&self) {
        let s = self.stats();
        log::info!(
            "cull tree: {} nodes ({} leaves, depth {}), {} drawables ({} at root, at most {} per node)",
            s.nodes,
            s.leaves,
            s.deepest,
            s.drawables,
            s.root_drawables,
            s.max_direct
        );
    }

    fn check_bounds(&self, mbr: &Mbr) -> Result<(), CullError> {
        mbr.check()?;
        if !self.world_extent().intersects(mbr) {
            return Err(GeometryFault::OutsideExtent.into());
        }
        Ok(())
    }
}

impl<A: CoordSystemAdapter> CullTree<A> {
    /// Create an empty tree over `root_mbr` with the default policy and the given depth limit.
    pub fn new(adapter: A, root_mbr: Mbr, max_depth: u32) -> Result<Self, CullError> {
        Self::with_config(adapter, root_mbr, CullConfig::new(max_depth))
    }

    /// Create an empty tree over `root_mbr` with an explicit policy.
    ///
    /// The root extent must be finite and ordered; the policy must pass
    /// [`CullConfig::validate`].
    pub fn with_config(adapter: A, root_mbr: Mbr, config: CullConfig) -> Result<Self, CullError> {
        config.validate()?;
        root_mbr.check()?;
        log::debug!("new cull tree over {root_mbr:?} with {config:?}");
        Ok(Self {
            adapter,
            config,
            arena: NodeArena::new(root_mbr, config.fan_out),
            members: HashSet::new(),
        })
    }

    /// Project a drawable's geographic extent into local bounds.
    pub fn local_mbr(&self, drawable: &DrawableRef) -> Result<Mbr, CullError> {
        self.adapter.local_mbr(&drawable.geo_bounds)
    }

    /// Insert a drawable, projecting its extent through the adapter.
    ///
    /// See [`insert_local`][Self::insert_local] for the failure cases.
    pub fn insert(&mut self, drawable: &DrawableRef) -> Result<(), CullError> {
        let mbr = self.local_mbr(drawable)?;
        self.insert_local(drawable.id, mbr)
    }

    /// Remove a drawable, projecting the extent it was inserted with.
    ///
    /// See [`remove_local`][Self::remove_local].
    pub fn remove(&mut self, drawable: &DrawableRef) -> Result<bool, CullError> {
        let mbr = self.local_mbr(drawable)?;
        self.remove_local(drawable.id, mbr)
    }
}

/// Lazy visibility traversal returned by [`CullTree::query_visible`].
///
/// Borrows the tree, so the tree cannot change while a traversal is alive.
pub struct Visible<'a, V> {
    arena: &'a NodeArena,
    view: V,
    /// Pending nodes and whether each is known to be fully inside the view.
    stack: SmallVec<[(NodeId, bool); 16]>,
    current: core::slice::Iter<'a, Entry>,
    inside: bool,
}

impl<V> Debug for Visible<'_, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Visible")
            .field("pending_nodes", &self.stack.len())
            .field("pending_drawables", &self.current.len())
            .finish_non_exhaustive()
    }
}

impl<'a, V: ViewRegion> Visible<'a, V> {
    fn new(arena: &'a NodeArena, view: V) -> Self {
        let mut stack = SmallVec::new();
        match view.classify(&arena.node(NodeId::ROOT).mbr) {
            Containment::Outside => {}
            Containment::Partial => stack.push((NodeId::ROOT, false)),
            Containment::Inside => stack.push((NodeId::ROOT, true)),
        }
        Self {
            arena,
            view,
            stack,
            current: core::slice::Iter::default(),
            inside: false,
        }
    }
}

impl<V: ViewRegion> Iterator for Visible<'_, V> {
    type Item = DrawableId;

    fn next(&mut self) -> Option<DrawableId> {
        loop {
            for entry in self.current.by_ref() {
                if self.inside || self.view.intersects(&entry.mbr) {
                    return Some(entry.id);
                }
            }

            let (at, inside) = self.stack.pop()?;
            let arena = self.arena;
            let node = arena.node(at);
            if let Some(first) = node.first_child {
                // Reverse so slot 0 is popped first.
                for slot in (0..arena.fan_out()).rev() {
                    let child = arena.child_of(first, slot);
                    if inside {
                        self.stack.push((child, true));
                        continue;
                    }
                    match self.view.classify(&arena.node(child).mbr) {
                        Containment::Outside => {}
                        Containment::Partial => self.stack.push((child, false)),
                        Containment::Inside => self.stack.push((child, true)),
                    }
                }
            }
            self.current = node.drawables.iter();
            self.inside = inside;
        }
    }
}
