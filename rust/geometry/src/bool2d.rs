// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Boolean Operations and Clipping
//!
//! Polygon booleans run through the i_overlay crate on [`Region2D`] values.
//! Cross-sections, triangle footprints and wall silhouettes are all expressed
//! as regions in some plane's local frame, so every cut in the crate reduces
//! to a union, difference or intersection here.
//!
//! Segment and half-plane clipping against convex rings are implemented
//! directly; they are needed for slicing faces and do not require a full
//! boolean pass.

use crate::error::{Error, Result};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::{Point2, Vector2};

/// Epsilon for floating point comparisons in 2D operations
pub const EPSILON_2D: f64 = 1e-9;

/// Minimum area threshold - polygons smaller than this are considered degenerate
pub const MIN_AREA_THRESHOLD: f64 = 1e-10;

/// An open ring of points (the closing edge is implicit)
pub type Contour = Vec<Point2<f64>>;

/// A polygon with holes. The outer ring is counter-clockwise, holes are clockwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon2D {
    pub outer: Contour,
    pub holes: Vec<Contour>,
}

/// A set of disjoint polygons; the empty set is the "empty geometry" value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region2D {
    pub polygons: Vec<Polygon2D>,
}

impl Polygon2D {
    pub fn new(outer: Contour) -> Self {
        Self {
            outer: ensure_ccw(&outer),
            holes: Vec::new(),
        }
    }

    pub fn area(&self) -> f64 {
        let holes: f64 = self
            .holes
            .iter()
            .map(|h| compute_signed_area(h).abs())
            .sum();
        compute_signed_area(&self.outer).abs() - holes
    }

    pub fn contains_point(&self, p: &Point2<f64>) -> bool {
        point_in_contour(p, &self.outer) && !self.holes.iter().any(|h| point_in_contour(p, h))
    }
}

impl Region2D {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Region covering a single ring, empty if the ring is degenerate
    pub fn from_contour(contour: &[Point2<f64>]) -> Self {
        if !is_valid_contour(contour) {
            return Self::empty();
        }
        Self {
            polygons: vec![Polygon2D::new(contour.to_vec())],
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn area(&self) -> f64 {
        self.polygons.iter().map(Polygon2D::area).sum()
    }

    pub fn contains_point(&self, p: &Point2<f64>) -> bool {
        self.polygons.iter().any(|poly| poly.contains_point(p))
    }

    /// Bounds of all outer rings
    pub fn bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let mut result: Option<(Point2<f64>, Point2<f64>)> = None;
        for poly in &self.polygons {
            if let Some((min, max)) = contour_bounds(&poly.outer) {
                result = Some(match result {
                    None => (min, max),
                    Some((a, b)) => (
                        Point2::new(a.x.min(min.x), a.y.min(min.y)),
                        Point2::new(b.x.max(max.x), b.y.max(max.y)),
                    ),
                });
            }
        }
        result
    }

    fn is_finite(&self) -> bool {
        self.polygons.iter().all(|poly| {
            std::iter::once(&poly.outer)
                .chain(poly.holes.iter())
                .flatten()
                .all(|p| p.x.is_finite() && p.y.is_finite())
        })
    }

    /// Convert to i_overlay path format
    fn to_paths(&self) -> Vec<Vec<[f64; 2]>> {
        let mut paths = Vec::new();
        for poly in &self.polygons {
            paths.push(contour_to_path(&ensure_ccw(&poly.outer)));
            for hole in &poly.holes {
                paths.push(contour_to_path(&ensure_cw(hole)));
            }
        }
        paths
    }

    /// Convert i_overlay result shapes back into a region
    ///
    /// i_overlay returns Vec<Vec<Vec<[f64; 2]>>> where:
    /// - Outer Vec: list of shapes
    /// - Middle Vec: list of contours per shape (first is outer, rest are holes)
    /// - Inner Vec: list of points per contour
    fn from_shapes(shapes: &[Vec<Vec<[f64; 2]>>]) -> Self {
        let mut polygons = Vec::with_capacity(shapes.len());

        for shape in shapes {
            let Some(outer) = shape.first() else {
                continue;
            };
            let outer = path_to_contour(outer);
            if !is_valid_contour(&outer) {
                continue;
            }

            let holes = shape
                .iter()
                .skip(1)
                .map(|c| path_to_contour(c))
                .filter(|c| is_valid_contour(c))
                .map(|c| ensure_cw(&c))
                .collect();

            polygons.push(Polygon2D {
                outer: ensure_ccw(&outer),
                holes,
            });
        }

        Self { polygons }
    }
}

/// Union of two regions
pub fn union(a: &Region2D, b: &Region2D) -> Result<Region2D> {
    if a.is_empty() {
        return Ok(b.clone());
    }
    if b.is_empty() {
        return Ok(a.clone());
    }
    overlay(a, b, OverlayRule::Union)
}

/// Boolean difference: `a - b`
pub fn difference(a: &Region2D, b: &Region2D) -> Result<Region2D> {
    if a.is_empty() || b.is_empty() {
        return Ok(a.clone());
    }
    overlay(a, b, OverlayRule::Difference)
}

/// Intersection of two regions
pub fn intersection(a: &Region2D, b: &Region2D) -> Result<Region2D> {
    if a.is_empty() || b.is_empty() {
        return Ok(Region2D::empty());
    }
    overlay(a, b, OverlayRule::Intersect)
}

/// Whether two regions share more than `min_area` of area
pub fn overlaps(a: &Region2D, b: &Region2D, min_area: f64) -> Result<bool> {
    match (a.bounds(), b.bounds()) {
        (Some((a_min, a_max)), Some((b_min, b_max))) => {
            if !bounds_overlap(&a_min, &a_max, &b_min, &b_max) {
                return Ok(false);
            }
        }
        _ => return Ok(false),
    }
    Ok(intersection(a, b)?.area() > min_area.max(MIN_AREA_THRESHOLD))
}

fn overlay(subject: &Region2D, clip: &Region2D, rule: OverlayRule) -> Result<Region2D> {
    if !subject.is_finite() || !clip.is_finite() {
        return Err(Error::BooleanError(
            "Operand contains non-finite coordinates".to_string(),
        ));
    }

    let subject_paths = subject.to_paths();
    let clip_paths = clip.to_paths();

    let shapes = subject_paths.overlay(&clip_paths, rule, FillRule::EvenOdd);

    Ok(Region2D::from_shapes(&shapes))
}

/// Clip the segment `a -> b` against a convex ring.
///
/// Returns the parameter span `(t0, t1)` (with `0 <= t0 <= t1 <= 1`) of the
/// part of the segment inside the ring. The ring boundary counts as inside,
/// with `EPSILON_2D` slack. Either winding is accepted.
pub fn clip_segment(
    a: &Point2<f64>,
    b: &Point2<f64>,
    contour: &[Point2<f64>],
) -> Option<(f64, f64)> {
    let n = contour.len();
    if n < 3 {
        return None;
    }

    let orientation = if compute_signed_area(contour) >= 0.0 {
        1.0
    } else {
        -1.0
    };
    let d = b - a;
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;

    for i in 0..n {
        let c = contour[i];
        let edge = contour[(i + 1) % n] - c;
        let len = edge.norm();
        if len <= EPSILON_2D {
            continue;
        }

        // Inward normal (left of the edge for a counter-clockwise ring)
        let inward = Vector2::new(-edge.y, edge.x) * (orientation / len);
        let num = (a - c).dot(&inward) + EPSILON_2D;
        let den = d.dot(&inward);

        if den.abs() <= f64::EPSILON {
            if num < 0.0 {
                return None;
            }
            continue;
        }

        let t = -num / den;
        if den > 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }

    Some((t0, t1))
}

/// Clip a convex ring against a half-plane, keeping the side opposite to
/// `outward` (points with `(p - point) . outward <= 0`).
pub fn clip_convex(
    contour: &[Point2<f64>],
    point: &Point2<f64>,
    outward: &Vector2<f64>,
) -> Contour {
    let n = contour.len();
    let mut result = Vec::with_capacity(n + 1);

    for i in 0..n {
        let current = contour[i];
        let next = contour[(i + 1) % n];
        let dc = (current - point).dot(outward);
        let dn = (next - point).dot(outward);

        if dc <= 0.0 {
            result.push(current);
        }
        if (dc < 0.0 && dn > 0.0) || (dc > 0.0 && dn < 0.0) {
            let t = dc / (dc - dn);
            result.push(current + (next - current) * t);
        }
    }

    result
}

/// Check if a contour is valid (has area, not degenerate)
pub fn is_valid_contour(contour: &[Point2<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let area = compute_signed_area(contour).abs();
    area > MIN_AREA_THRESHOLD
}

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn compute_signed_area(contour: &[Point2<f64>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = contour.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i].x * contour[j].y;
        area -= contour[j].x * contour[i].y;
    }

    area * 0.5
}

/// Ensure contour has counter-clockwise winding (positive area)
pub fn ensure_ccw(contour: &[Point2<f64>]) -> Contour {
    if compute_signed_area(contour) < 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Ensure contour has clockwise winding (for holes)
pub fn ensure_cw(contour: &[Point2<f64>]) -> Contour {
    if compute_signed_area(contour) > 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Check if a polygon is convex (all cross products have same sign)
pub fn is_convex(points: &[Point2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let n = points.len();
    let mut sign = 0i8;

    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);

        if cross.abs() > MIN_AREA_THRESHOLD {
            let current_sign = if cross > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current_sign;
            } else if sign != current_sign {
                return false;
            }
        }
    }

    true
}

/// Check if a point is inside a contour using ray casting
pub fn point_in_contour(point: &Point2<f64>, contour: &[Point2<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = contour.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = &contour[i];
        let pj = &contour[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Compute bounding box of a contour
pub fn contour_bounds(contour: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    let first = contour.first()?;
    let mut min = *first;
    let mut max = *first;

    for p in contour.iter().skip(1) {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }

    Some((min, max))
}

/// Check if two bounding boxes overlap
pub fn bounds_overlap(
    a_min: &Point2<f64>,
    a_max: &Point2<f64>,
    b_min: &Point2<f64>,
    b_max: &Point2<f64>,
) -> bool {
    a_min.x <= b_max.x && a_max.x >= b_min.x && a_min.y <= b_max.y && a_max.y >= b_min.y
}

/// Convert a Point2 contour to i_overlay path format
fn contour_to_path(contour: &[Point2<f64>]) -> Vec<[f64; 2]> {
    contour.iter().map(|p| [p.x, p.y]).collect()
}

fn path_to_contour(path: &[[f64; 2]]) -> Contour {
    path.iter().map(|p| Point2::new(p[0], p[1])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Contour {
        vec![
            Point2::new(x0, y0),
            Point2::new(x0 + size, y0),
            Point2::new(x0 + size, y0 + size),
            Point2::new(x0, y0 + size),
        ]
    }

    #[test]
    fn test_compute_signed_area_cw() {
        let mut contour = square(0.0, 0.0, 1.0);
        contour.reverse();
        let area = compute_signed_area(&contour);
        assert!((area + 1.0).abs() < EPSILON_2D);
        assert!(compute_signed_area(&ensure_ccw(&contour)) > 0.0);
    }

    #[test]
    fn test_difference_creates_hole() {
        let outer = Region2D::from_contour(&square(0.0, 0.0, 10.0));
        let hole = Region2D::from_contour(&square(4.0, 4.0, 2.0));

        let result = difference(&outer, &hole).unwrap();
        assert_eq!(result.polygons.len(), 1);
        assert_eq!(result.polygons[0].holes.len(), 1);
        assert!((result.area() - 96.0).abs() < 1e-6);
        assert!(!result.contains_point(&Point2::new(5.0, 5.0)));
        assert!(result.contains_point(&Point2::new(1.0, 1.0)));
    }

    #[test]
    fn test_union_and_intersection() {
        let a = Region2D::from_contour(&square(0.0, 0.0, 2.0));
        let b = Region2D::from_contour(&square(1.0, 1.0, 2.0));

        let u = union(&a, &b).unwrap();
        assert!((u.area() - 7.0).abs() < 1e-6);

        let i = intersection(&a, &b).unwrap();
        assert!((i.area() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_operands() {
        let a = Region2D::from_contour(&square(0.0, 0.0, 1.0));
        let empty = Region2D::empty();
        assert_eq!(union(&empty, &a).unwrap(), a);
        assert_eq!(difference(&a, &empty).unwrap(), a);
        assert!(intersection(&a, &empty).unwrap().is_empty());
        assert!(difference(&empty, &a).unwrap().is_empty());
    }

    #[test]
    fn test_non_finite_is_an_error() {
        let a = Region2D::from_contour(&square(0.0, 0.0, 1.0));
        let bad = Region2D {
            polygons: vec![Polygon2D {
                outer: vec![
                    Point2::new(0.0, 0.0),
                    Point2::new(f64::NAN, 0.0),
                    Point2::new(1.0, 1.0),
                ],
                holes: Vec::new(),
            }],
        };
        assert!(matches!(
            difference(&a, &bad),
            Err(Error::BooleanError(_))
        ));
    }

    #[test]
    fn test_overlaps_touching_squares() {
        let a = Region2D::from_contour(&square(0.0, 0.0, 1.0));
        let b = Region2D::from_contour(&square(1.0, 0.0, 1.0));
        let c = Region2D::from_contour(&square(0.5, 0.0, 1.0));
        assert!(!overlaps(&a, &b, 0.0).unwrap());
        assert!(overlaps(&a, &c, 0.0).unwrap());
    }

    #[test]
    fn test_clip_segment_through_square() {
        let contour = square(0.0, 0.0, 1.0);
        let (t0, t1) =
            clip_segment(&Point2::new(-1.0, 0.5), &Point2::new(3.0, 0.5), &contour).unwrap();
        assert!((t0 - 0.25).abs() < 1e-6);
        assert!((t1 - 0.5).abs() < 1e-6);

        assert!(clip_segment(&Point2::new(-1.0, 2.0), &Point2::new(3.0, 2.0), &contour).is_none());
    }

    #[test]
    fn test_clip_segment_along_boundary() {
        let mut contour = square(0.0, 0.0, 1.0);
        contour.reverse();
        let (t0, t1) =
            clip_segment(&Point2::new(-1.0, 1.0), &Point2::new(2.0, 1.0), &contour).unwrap();
        assert!((t0 - 1.0 / 3.0).abs() < 1e-6);
        assert!((t1 - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_clip_convex_half_plane() {
        let contour = square(0.0, 0.0, 2.0);
        let clipped = clip_convex(&contour, &Point2::new(1.0, 0.0), &Vector2::new(1.0, 0.0));
        assert!((compute_signed_area(&clipped) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_is_convex() {
        assert!(is_convex(&square(0.0, 0.0, 1.0)));
        let notch = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(1.0, 0.5),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        assert!(!is_convex(&notch));
    }

    #[test]
    fn test_point_in_contour() {
        let contour = square(0.0, 0.0, 10.0);
        assert!(point_in_contour(&Point2::new(5.0, 5.0), &contour));
        assert!(!point_in_contour(&Point2::new(15.0, 5.0), &contour));
        assert!(!point_in_contour(&Point2::new(-1.0, 5.0), &contour));
    }
}
