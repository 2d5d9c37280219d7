// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinate-system adapter: maps geographic coordinates into the local display frame.

use kurbo::Point;

use crate::drawable::{GeoCoord, GeoMbr};
use crate::error::{CullError, GeometryFault};
use crate::types::Mbr;

/// Projection from geographic coordinates to local display coordinates.
///
/// The cull tree treats this as a pure function and calls it once per corner
/// of a drawable's geographic extent on insert and remove.
pub trait CoordSystemAdapter {
    /// Project a geographic coordinate into the local frame.
    fn project_to_local(&self, geo: GeoCoord) -> Point;

    /// Local bounds of a geographic box.
    ///
    /// All four corners are projected, so projections that flip or shear an
    /// axis still yield a containing rectangle. Non-finite projections are
    /// rejected with [`GeometryFault::NonFinite`].
    fn local_mbr(&self, geo: &GeoMbr) -> Result<Mbr, CullError> {
        let corners = geo.corners().map(|c| self.project_to_local(c));
        if corners.iter().any(|p| !p.is_finite()) {
            return Err(GeometryFault::NonFinite.into());
        }
        Ok(corners[1..]
            .iter()
            .fold(Mbr::from_points(corners[0], corners[0]), |acc, p| {
                acc.union(&Mbr::from_points(*p, *p))
            }))
    }
}

impl<F> CoordSystemAdapter for F
where
    F: Fn(GeoCoord) -> Point,
{
    fn project_to_local(&self, geo: GeoCoord) -> Point {
        self(geo)
    }
}

/// Passes longitude through as x and latitude as y.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentityAdapter;

impl CoordSystemAdapter for IdentityAdapter {
    #[inline]
    fn project_to_local(&self, geo: GeoCoord) -> Point {
        Point::new(geo.lon, geo.lat)
    }
}
