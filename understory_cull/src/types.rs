// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimum bounding rectangles in local display coordinates.

use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::error::GeometryFault;
use crate::util::grid_shape;

/// Axis-aligned minimum bounding rectangle (MBR) in local display coordinates.
///
/// Coordinates are post-projection, not raw geographic values. A well-formed
/// `Mbr` has `min_x <= max_x` and `min_y <= max_y`; zero-area rectangles are
/// allowed so point-like drawables can be indexed.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mbr {
    /// Minimum x (left)
    pub min_x: f64,
    /// Minimum y (bottom)
    pub min_y: f64,
    /// Maximum x (right)
    pub max_x: f64,
    /// Maximum y (top)
    pub max_y: f64,
}

impl Mbr {
    /// Create a new MBR from min/max corners.
    ///
    /// The corners are taken as given; use [`Mbr::from_points`] when the
    /// ordering of the inputs is not known.
    #[inline(always)]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The smallest MBR containing both points.
    #[inline]
    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// Validate the rectangle: all coordinates finite and corners ordered.
    pub fn check(&self) -> Result<(), GeometryFault> {
        let finite = self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite();
        if !finite {
            return Err(GeometryFault::NonFinite);
        }
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return Err(GeometryFault::Inverted);
        }
        Ok(())
    }

    /// Width along x.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height along y.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Area of the rectangle; zero for degenerate or inverted rectangles.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> Point {
        Point::new(
            0.5 * (self.min_x + self.max_x),
            0.5 * (self.min_y + self.max_y),
        )
    }

    /// Whether this MBR contains the point. Edges are inclusive.
    #[inline]
    pub fn contains(&self, pt: Point) -> bool {
        self.min_x <= pt.x && self.min_y <= pt.y && pt.x <= self.max_x && pt.y <= self.max_y
    }

    /// Whether `other` lies entirely within this MBR. Edges are inclusive.
    #[inline]
    pub fn contains_mbr(&self, other: &Self) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }

    /// Determines whether this MBR overlaps another on both axes.
    ///
    /// Touching edges count as intersecting, so a drawable lying exactly on a
    /// split boundary is never excluded by either side.
    ///
    /// # Examples
    ///
    /// ```
    /// use understory_cull::Mbr;
    ///
    /// let a = Mbr::new(0.0, 0.0, 10.0, 10.0);
    /// assert!(a.intersects(&Mbr::new(10.0, 0.0, 20.0, 10.0)));
    /// assert!(!a.intersects(&Mbr::new(11.0, 0.0, 20.0, 10.0)));
    /// ```
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Area of the overlap between two MBRs, zero when they are disjoint or only touch.
    #[inline]
    pub fn overlap_area(&self, other: &Self) -> f64 {
        let w = self.max_x.min(other.max_x) - self.min_x.max(other.min_x);
        let h = self.max_y.min(other.max_y) - self.min_y.max(other.min_y);
        if w <= 0.0 || h <= 0.0 { 0.0 } else { w * h }
    }

    /// The smallest MBR enclosing both.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Split into `count` equal, non-overlapping cells that tile this MBR exactly.
    ///
    /// Cells form a `cols × rows` grid (see [`Mbr::unique_cell`]) and are
    /// returned row-major: rows by ascending y, then columns by ascending x.
    /// Neighbouring cells share bit-identical edges. For a quad split of
    /// `[0,0]-[100,100]` that is `[0,0]-[50,50]`, `[50,0]-[100,50]`,
    /// `[0,50]-[50,100]`, `[50,50]-[100,100]`.
    pub fn subdivide(&self, count: usize) -> SmallVec<[Self; 4]> {
        let (cols, rows) = grid_shape(count);
        let mut out = SmallVec::with_capacity(count);
        for row in 0..rows {
            let min_y = split_at(self.min_y, self.max_y, rows, row);
            let max_y = split_at(self.min_y, self.max_y, rows, row + 1);
            for col in 0..cols {
                let min_x = split_at(self.min_x, self.max_x, cols, col);
                let max_x = split_at(self.min_x, self.max_x, cols, col + 1);
                out.push(Self::new(min_x, min_y, max_x, max_y));
            }
        }
        out
    }

    /// Index of the single cell of [`Mbr::subdivide(count)`][Mbr::subdivide] that fully contains `inner`.
    ///
    /// Returns `None` when no cell contains `inner`, or when more than one does
    /// (a degenerate `inner` lying exactly on a shared edge).
    pub fn unique_cell(&self, count: usize, inner: &Self) -> Option<usize> {
        let (cols, rows) = grid_shape(count);
        let col = unique_span(self.min_x, self.max_x, cols, inner.min_x, inner.max_x)?;
        let row = unique_span(self.min_y, self.max_y, rows, inner.min_y, inner.max_y)?;
        Some(row * cols + col)
    }
}

/// Boundary `i` of `parts` equal spans over `[lo, hi]`. The last boundary is `hi` exactly.
#[inline]
fn split_at(lo: f64, hi: f64, parts: usize, i: usize) -> f64 {
    if i >= parts {
        hi
    } else {
        lo + (hi - lo) * (i as f64) / (parts as f64)
    }
}

fn unique_span(lo: f64, hi: f64, parts: usize, a: f64, b: f64) -> Option<usize> {
    let mut found = None;
    for i in 0..parts {
        let s0 = split_at(lo, hi, parts, i);
        let s1 = split_at(lo, hi, parts, i + 1);
        if s0 <= a && b <= s1 {
            if found.is_some() {
                return None;
            }
            found = Some(i);
        }
    }
    found
}

impl From<Rect> for Mbr {
    fn from(r: Rect) -> Self {
        Self::from_points(Point::new(r.x0, r.y0), Point::new(r.x1, r.y1))
    }
}

impl From<Mbr> for Rect {
    fn from(m: Mbr) -> Self {
        Self::new(m.min_x, m.min_y, m.max_x, m.max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_subdivision_order() {
        let cells = Mbr::new(0., 0., 100., 100.).subdivide(4);
        assert_eq!(
            cells.as_slice(),
            &[
                Mbr::new(0., 0., 50., 50.),
                Mbr::new(50., 0., 100., 50.),
                Mbr::new(0., 50., 50., 100.),
                Mbr::new(50., 50., 100., 100.),
            ]
        );
    }

    #[test]
    fn subdivision_tiles_parent() {
        let parent = Mbr::new(-3.5, 1.25, 17.0, 9.75);
        for count in [1, 2, 3, 4, 6, 9, 16] {
            let cells = parent.subdivide(count);
            assert_eq!(cells.len(), count);

            let covered = cells.iter().fold(cells[0], |acc, c| acc.union(c));
            assert_eq!(covered, parent);

            let total: f64 = cells.iter().map(Mbr::area).sum();
            assert!((total - parent.area()).abs() < 1e-9);

            for (i, a) in cells.iter().enumerate() {
                for b in &cells[i + 1..] {
                    assert_eq!(a.overlap_area(b), 0.0);
                }
            }

            // Deterministic for identical input.
            assert_eq!(cells, parent.subdivide(count));
        }
    }

    #[test]
    fn subdivide_zero_is_empty() {
        assert!(Mbr::new(0., 0., 1., 1.).subdivide(0).is_empty());
    }

    #[test]
    fn unique_cell_matches_subdivide() {
        let parent = Mbr::new(0., 0., 100., 100.);
        let cells = parent.subdivide(4);
        let inner = Mbr::new(60., 10., 70., 20.);
        let slot = parent.unique_cell(4, &inner).unwrap();
        assert_eq!(slot, 1);
        assert!(cells[slot].contains_mbr(&inner));

        // Straddles the vertical midline.
        assert_eq!(parent.unique_cell(4, &Mbr::new(40., 40., 60., 60.)), None);
        // A point exactly on the midline fits two cells, so none is unique.
        assert_eq!(parent.unique_cell(4, &Mbr::new(50., 10., 50., 10.)), None);
        // Outside the parent entirely.
        assert_eq!(parent.unique_cell(4, &Mbr::new(150., 10., 160., 20.)), None);
    }

    #[test]
    fn touching_edges_intersect() {
        let a = Mbr::new(0., 0., 10., 10.);
        assert!(a.intersects(&Mbr::new(10., 10., 20., 20.)));
        assert!(!a.intersects(&Mbr::new(10.5, 0., 20., 10.)));
        assert_eq!(a.overlap_area(&Mbr::new(10., 0., 20., 10.)), 0.0);
        assert_eq!(a.overlap_area(&Mbr::new(5., 5., 20., 20.)), 25.0);
    }

    #[test]
    fn contains_point_and_mbr() {
        let a = Mbr::new(0., 0., 10., 10.);
        assert!(a.contains(Point::new(10., 0.)));
        assert!(!a.contains(Point::new(10.1, 0.)));
        assert!(a.contains_mbr(&Mbr::new(2., 2., 2., 2.)));
        assert!(!a.contains_mbr(&Mbr::new(2., 2., 12., 3.)));
    }

    #[test]
    fn check_reports_faults() {
        assert_eq!(Mbr::new(0., 0., 0., 0.).check(), Ok(()));
        assert_eq!(
            Mbr::new(0., f64::NAN, 1., 1.).check(),
            Err(GeometryFault::NonFinite)
        );
        assert_eq!(
            Mbr::new(0., 0., f64::INFINITY, 1.).check(),
            Err(GeometryFault::NonFinite)
        );
        assert_eq!(Mbr::new(2., 0., 1., 1.).check(), Err(GeometryFault::Inverted));
    }

    #[test]
    fn rect_round_trip_normalizes() {
        let m = Mbr::from(Rect::new(10., 20., 0., 5.));
        assert_eq!(m, Mbr::new(0., 5., 10., 20.));
        assert_eq!(Rect::from(m), Rect::new(0., 5., 10., 20.));
    }
}
