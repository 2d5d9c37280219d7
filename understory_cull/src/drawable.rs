// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawable identifiers, geographic extents, and the renderer-owned registry.
//!
//! The cull tree never owns a drawable. It stores a [`DrawableId`] and the
//! drawable's local bounds; the rendering subsystem keeps the drawables
//! themselves in a [`DrawableRegistry`] and resolves ids returned by a query.
//! A drawable must be removed from the tree before it is destroyed; if it is
//! not, resolving its id reports [`CullError::DanglingReference`] rather than
//! handing out a stale object.

use hashbrown::HashMap;

use crate::error::CullError;

/// Stable identifier of a drawable owned by the rendering subsystem.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrawableId(pub u64);

impl core::fmt::Display for DrawableId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A geographic coordinate, opaque to the cull tree.
///
/// Only the [`CoordSystemAdapter`][crate::CoordSystemAdapter] interprets it.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoCoord {
    /// Longitude (x-like axis).
    pub lon: f64,
    /// Latitude (y-like axis).
    pub lat: f64,
}

impl GeoCoord {
    /// Create a coordinate from longitude and latitude.
    #[inline]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Geographic bounding box of a drawable: lower-left and upper-right corners.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoMbr {
    /// Lower-left corner.
    pub ll: GeoCoord,
    /// Upper-right corner.
    pub ur: GeoCoord,
}

impl GeoMbr {
    /// Create a geographic box from its two corners.
    #[inline]
    pub const fn new(ll: GeoCoord, ur: GeoCoord) -> Self {
        Self { ll, ur }
    }

    /// The four corners in counter-clockwise order starting at `ll`.
    pub fn corners(&self) -> [GeoCoord; 4] {
        [
            self.ll,
            GeoCoord::new(self.ur.lon, self.ll.lat),
            self.ur,
            GeoCoord::new(self.ll.lon, self.ur.lat),
        ]
    }
}

/// Non-owning reference to a drawable: its id plus its geographic extent.
///
/// The geometry is assumed immutable while the drawable is in a tree; to move
/// a drawable, remove it with its old extent and insert it again.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrawableRef {
    /// Identifier resolved through a [`DrawableRegistry`].
    pub id: DrawableId,
    /// Geographic extent, projected to local bounds at insertion.
    pub geo_bounds: GeoMbr,
}

impl DrawableRef {
    /// Create a reference from an id and extent.
    #[inline]
    pub const fn new(id: DrawableId, geo_bounds: GeoMbr) -> Self {
        Self { id, geo_bounds }
    }
}

/// Renderer-side owner of drawables, keyed by [`DrawableId`].
///
/// Ids handed out by [`register`][Self::register] are never reused.
#[derive(Clone, Debug)]
pub struct DrawableRegistry<D> {
    drawables: HashMap<DrawableId, D>,
    next_id: u64,
}

impl<D> Default for DrawableRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> DrawableRegistry<D> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            drawables: HashMap::new(),
            next_id: 1,
        }
    }

    /// Take ownership of a drawable and return its fresh id.
    pub fn register(&mut self, drawable: D) -> DrawableId {
        let id = DrawableId(self.next_id);
        self.next_id += 1;
        self.drawables.insert(id, drawable);
        id
    }

    /// Destroy a drawable, returning it.
    ///
    /// Callers must remove it from every cull tree first.
    pub fn destroy(&mut self, id: DrawableId) -> Option<D> {
        self.drawables.remove(&id)
    }

    /// Look up a live drawable.
    pub fn get(&self, id: DrawableId) -> Option<&D> {
        self.drawables.get(&id)
    }

    /// Look up a live drawable mutably.
    pub fn get_mut(&mut self, id: DrawableId) -> Option<&mut D> {
        self.drawables.get_mut(&id)
    }

    /// Resolve an id, reporting a destroyed drawable as a dangling reference.
    pub fn resolve(&self, id: DrawableId) -> Result<&D, CullError> {
        self.drawables
            .get(&id)
            .ok_or(CullError::DanglingReference(id))
    }

    /// Resolve a stream of ids (typically a visibility query) into drawables.
    ///
    /// Dangling ids are skipped and logged at `warn`.
    pub fn resolve_all<'a, I>(&'a self, ids: I) -> impl Iterator<Item = (DrawableId, &'a D)> + 'a
    where
        I: IntoIterator<Item = DrawableId>,
        I::IntoIter: 'a,
    {
        ids.into_iter().filter_map(move |id| match self.resolve(id) {
            Ok(d) => Some((id, d)),
            Err(err) => {
                log::warn!("skipping culled drawable: {err}");
                None
            }
        })
    }

    /// Number of live drawables.
    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    /// Whether no drawables are registered.
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }
}
