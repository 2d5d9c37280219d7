// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View regions used to drive a culling pass.
//!
//! A query needs one thing from the view: given a node or drawable MBR, is it
//! outside, partially inside, or fully inside? [`Containment::Outside`] prunes
//! a whole subtree and [`Containment::Inside`] lets the traversal emit a
//! subtree without testing each drawable.

use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::error::{CullError, GeometryFault};
use crate::types::Mbr;

/// Result of classifying an MBR against a view region.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Containment {
    /// Entirely outside the view.
    Outside,
    /// Overlaps the view but is not contained by it.
    Partial,
    /// Entirely inside the view.
    Inside,
}

/// A region of local display space that drawables are culled against.
pub trait ViewRegion {
    /// Classify an MBR against this region.
    ///
    /// Implementations may be conservative: reporting `Partial` for an MBR
    /// that is actually outside is allowed, reporting `Outside` for one that
    /// overlaps is not.
    fn classify(&self, mbr: &Mbr) -> Containment;

    /// Whether the MBR is at least partially visible.
    #[inline]
    fn intersects(&self, mbr: &Mbr) -> bool {
        self.classify(mbr) != Containment::Outside
    }
}

impl ViewRegion for Mbr {
    fn classify(&self, mbr: &Mbr) -> Containment {
        if !self.intersects(mbr) {
            Containment::Outside
        } else if self.contains_mbr(mbr) {
            Containment::Inside
        } else {
            Containment::Partial
        }
    }
}

impl ViewRegion for Rect {
    fn classify(&self, mbr: &Mbr) -> Containment {
        Mbr::from(*self).classify(mbr)
    }
}

impl<V: ViewRegion + ?Sized> ViewRegion for &V {
    #[inline]
    fn classify(&self, mbr: &Mbr) -> Containment {
        (**self).classify(mbr)
    }
}

/// Inward-facing edge line: `nx * x + ny * y + d >= 0` on the inside.
#[derive(Copy, Clone, Debug, PartialEq)]
struct HalfPlane {
    nx: f64,
    ny: f64,
    d: f64,
}

impl HalfPlane {
    #[inline]
    fn eval(&self, x: f64, y: f64) -> f64 {
        self.nx * x + self.ny * y + self.d
    }
}

/// Convex footprint of a camera frustum on the local display plane.
///
/// Built from the corners of a convex polygon in either winding order;
/// concave and self-intersecting polygons are rejected. An MBR
/// is tested per edge with the positive/negative vertex rule, which is exact
/// for rejection against each edge and conservative at the polygon's corners.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewFrustum {
    edges: SmallVec<[HalfPlane; 4]>,
    bounds: Mbr,
}

impl ViewFrustum {
    /// Build a frustum footprint from the corners of a convex polygon.
    ///
    /// Fails with [`GeometryFault::NonFinite`] for non-finite corners, with
    /// [`GeometryFault::Degenerate`] for fewer than three corners or zero area,
    /// and with [`GeometryFault::NonConvex`] when some corner lies outside the
    /// line of an edge (concave or self-intersecting polygons).
    pub fn from_points(corners: &[Point]) -> Result<Self, CullError> {
        if corners.iter().any(|p| !p.is_finite()) {
            return Err(GeometryFault::NonFinite.into());
        }
        if corners.len() < 3 {
            return Err(GeometryFault::Degenerate.into());
        }

        let n = corners.len();
        let twice_area: f64 = (0..n)
            .map(|i| {
                let a = corners[i];
                let b = corners[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum();
        if twice_area == 0.0 {
            return Err(GeometryFault::Degenerate.into());
        }
        // Counter-clockwise polygons keep their interior on the left of each edge.
        let sign = if twice_area > 0.0 { 1.0 } else { -1.0 };

        let mut edges: SmallVec<[HalfPlane; 4]> = SmallVec::with_capacity(n);
        let mut bounds = Mbr::from_points(corners[0], corners[0]);
        for i in 0..n {
            let a = corners[i];
            let b = corners[(i + 1) % n];
            bounds = bounds.union(&Mbr::from_points(b, b));
            let nx = -(b.y - a.y) * sign;
            let ny = (b.x - a.x) * sign;
            edges.push(HalfPlane {
                nx,
                ny,
                d: -(nx * a.x + ny * a.y),
            });
        }

        // Every corner must sit on the inner side of every edge line.
        let tolerance = 1e-12 * (bounds.width() + bounds.height());
        for (i, e) in edges.iter().enumerate() {
            let slack = tolerance * (e.nx.abs() + e.ny.abs());
            let outside = corners
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i && j != (i + 1) % n)
                .any(|(_, p)| e.eval(p.x, p.y) < -slack);
            if outside {
                return Err(GeometryFault::NonConvex.into());
            }
        }
        Ok(Self { edges, bounds })
    }

    /// Bounding rectangle of the footprint.
    pub fn bounds(&self) -> Mbr {
        self.bounds
    }
}

impl ViewRegion for ViewFrustum {
    fn classify(&self, mbr: &Mbr) -> Containment {
        if !self.bounds.intersects(mbr) {
            return Containment::Outside;
        }
        let mut all_inside = true;
        for e in &self.edges {
            // Corner furthest along the inward normal.
            let px = if e.nx >= 0.0 { mbr.max_x } else { mbr.min_x };
            let py = if e.ny >= 0.0 { mbr.max_y } else { mbr.min_y };
            if e.eval(px, py) < 0.0 {
                return Containment::Outside;
            }
            // Corner furthest against it.
            let qx = if e.nx >= 0.0 { mbr.min_x } else { mbr.max_x };
            let qy = if e.ny >= 0.0 { mbr.min_y } else { mbr.max_y };
            if e.eval(qx, qy) < 0.0 {
                all_inside = false;
            }
        }
        if all_inside {
            Containment::Inside
        } else {
            Containment::Partial
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mbr_classification() {
        let view = Mbr::new(0., 0., 10., 10.);
        assert_eq!(view.classify(&Mbr::new(2., 2., 3., 3.)), Containment::Inside);
        assert_eq!(view.classify(&Mbr::new(8., 8., 12., 12.)), Containment::Partial);
        assert_eq!(view.classify(&Mbr::new(10., 10., 12., 12.)), Containment::Partial);
        assert_eq!(view.classify(&Mbr::new(11., 0., 12., 1.)), Containment::Outside);
    }

    #[test]
    fn rect_matches_mbr() {
        let rect = Rect::new(0., 0., 10., 10.);
        let probe = Mbr::new(8., 8., 12., 12.);
        assert_eq!(rect.classify(&probe), Mbr::from(rect).classify(&probe));
    }

    #[test]
    fn frustum_winding_does_not_matter() {
        let ccw = [
            Point::new(0., 0.),
            Point::new(10., 0.),
            Point::new(10., 10.),
            Point::new(0., 10.),
        ];
        let mut cw = ccw;
        cw.reverse();
        let a = ViewFrustum::from_points(&ccw).unwrap();
        let b = ViewFrustum::from_points(&cw).unwrap();
        for probe in [
            Mbr::new(2., 2., 3., 3.),
            Mbr::new(8., 8., 12., 12.),
            Mbr::new(20., 20., 30., 30.),
        ] {
            assert_eq!(a.classify(&probe), b.classify(&probe));
            assert_eq!(a.classify(&probe), Mbr::new(0., 0., 10., 10.).classify(&probe));
        }
    }

    #[test]
    fn trapezoid_footprint() {
        // Looking "up" the y axis: narrow near edge, wide far edge.
        let f = ViewFrustum::from_points(&[
            Point::new(4., 0.),
            Point::new(6., 0.),
            Point::new(10., 10.),
            Point::new(0., 10.),
        ])
        .unwrap();
        assert_eq!(f.bounds(), Mbr::new(0., 0., 10., 10.));
        assert_eq!(f.classify(&Mbr::new(4.5, 1., 5.5, 2.)), Containment::Inside);
        // Inside the bounds but beside the narrow near edge.
        assert_eq!(f.classify(&Mbr::new(0., 0., 1., 1.)), Containment::Outside);
        assert_eq!(f.classify(&Mbr::new(0., 8., 1., 9.)), Containment::Partial);
    }

    #[test]
    fn degenerate_polygons_are_rejected() {
        assert_eq!(
            ViewFrustum::from_points(&[Point::new(0., 0.), Point::new(1., 1.)]),
            Err(CullError::InvalidGeometry(GeometryFault::Degenerate))
        );
        assert_eq!(
            ViewFrustum::from_points(&[
                Point::new(0., 0.),
                Point::new(1., 1.),
                Point::new(2., 2.),
            ]),
            Err(CullError::InvalidGeometry(GeometryFault::Degenerate))
        );
        assert_eq!(
            ViewFrustum::from_points(&[
                Point::new(0., 0.),
                Point::new(f64::NAN, 1.),
                Point::new(2., 0.),
            ]),
            Err(CullError::InvalidGeometry(GeometryFault::NonFinite))
        );
    }

    #[test]
    fn concave_polygons_are_rejected() {
        // Notched square: the corner at (5, 2) points inwards.
        let notched = [
            Point::new(0., 0.),
            Point::new(10., 0.),
            Point::new(10., 10.),
            Point::new(5., 2.),
            Point::new(0., 10.),
        ];
        assert_eq!(
            ViewFrustum::from_points(&notched),
            Err(CullError::InvalidGeometry(GeometryFault::NonConvex))
        );

        // Pentagram: turns one way throughout but winds twice.
        let star = [
            Point::new(0., 10.),
            Point::new(5.9, -8.1),
            Point::new(-9.5, 3.1),
            Point::new(9.5, 3.1),
            Point::new(-5.9, -8.1),
        ];
        assert_eq!(
            ViewFrustum::from_points(&star),
            Err(CullError::InvalidGeometry(GeometryFault::NonConvex))
        );
    }

    #[test]
    fn collinear_corner_is_still_convex() {
        let f = ViewFrustum::from_points(&[
            Point::new(0., 0.),
            Point::new(5., 0.),
            Point::new(10., 0.),
            Point::new(10., 10.),
            Point::new(0., 10.),
        ])
        .unwrap();
        assert_eq!(f.classify(&Mbr::new(1., 1., 1.5, 1.5)), Containment::Inside);
    }
}
