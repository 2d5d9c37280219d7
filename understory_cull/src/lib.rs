// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_cull --heading-base-level=0

//! Understory Cull: a lazily subdivided cull tree for globe and map drawables.
//!
//! A renderer asks one question every frame: which of the drawables it knows
//! about can possibly be seen? Understory Cull answers it with a hierarchy of
//! cells over a fixed world extent.
//!
//! - Insert and remove drawables by id together with their geographic extent.
//! - Extents are projected into the local display plane by a [`CoordSystemAdapter`].
//! - Nodes split on demand into a `fan_out` grid (a quad split by default) once they
//!   hold [`CullConfig::split_threshold`] drawables, down to [`CullConfig::max_depth`].
//! - Drawables that straddle a cell boundary stay at the lowest node that fully contains them.
//! - [`CullTree::query_visible`] walks the tree lazily, pruning subtrees outside the
//!   view and skipping per-drawable tests for subtrees fully inside it.
//!
//! The tree stores [`DrawableId`]s, never the drawables themselves. Owners keep
//! drawables in a [`DrawableRegistry`] (or anything else keyed by id) and resolve the
//! ids a query returns; an id whose drawable has gone away resolves to
//! [`CullError::DanglingReference`] instead of dangling memory.
//!
//! View regions implement [`ViewRegion`]. Plain rectangles ([`Mbr`] and
//! [`kurbo::Rect`]) work out of the box, and [`ViewFrustum`] covers the convex
//! footprint of a tilted camera.
//!
//! ## Features
//!
//! - `std` *(default)*: enables `std` support in `kurbo`.
//! - `libm`: `no_std` float support for `kurbo`.
//! - `serde`: `Serialize`/`Deserialize` for [`CullConfig`], [`Mbr`], and the drawable types.
//!
//! Diagnostics go through the [`log`] facade: splits at `debug`, inserts and
//! removals at `trace`, and removal fallbacks at `warn`.
//!
//! # Example
//!
//! ```rust
//! use understory_cull::{
//!     CullConfig, CullTree, DrawableId, DrawableRef, GeoCoord, GeoMbr, IdentityAdapter, Mbr,
//! };
//!
//! // A whole-world tree in degrees, splitting after two drawables per node.
//! let world = Mbr::new(-180.0, -90.0, 180.0, 90.0);
//! let config = CullConfig::new(8).with_split_threshold(2);
//! let mut tree = CullTree::with_config(IdentityAdapter, world, config).unwrap();
//!
//! let paris = DrawableRef::new(
//!     DrawableId(1),
//!     GeoMbr::new(GeoCoord::new(2.2, 48.8), GeoCoord::new(2.5, 48.9)),
//! );
//! let sydney = DrawableRef::new(
//!     DrawableId(2),
//!     GeoMbr::new(GeoCoord::new(151.0, -34.0), GeoCoord::new(151.3, -33.7)),
//! );
//! tree.insert(&paris).unwrap();
//! tree.insert(&sydney).unwrap();
//!
//! // Looking at Europe.
//! let view = Mbr::new(-10.0, 35.0, 30.0, 60.0);
//! let visible: Vec<_> = tree.query_visible(view).collect();
//! assert_eq!(visible, [DrawableId(1)]);
//!
//! assert_eq!(tree.remove(&paris), Ok(true));
//! assert_eq!(tree.query_visible(view).count(), 0);
//! ```

#![no_std]

extern crate alloc;

mod config;
mod coord;
mod drawable;
mod error;
mod node;
mod tree;
mod types;
pub(crate) mod util;
mod view;

pub use config::CullConfig;
pub use coord::{CoordSystemAdapter, IdentityAdapter};
pub use drawable::{DrawableId, DrawableRef, DrawableRegistry, GeoCoord, GeoMbr};
pub use error::{ConfigFault, CullError, GeometryFault};
pub use node::{Cullable, NodeId};
pub use tree::{CullStats, CullTree, Visible};
pub use types::Mbr;
pub use view::{Containment, ViewFrustum, ViewRegion};
