// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Regular n-gon prisms, the primary hole shape
//!
//! A prism is a regular polygon inscribed in a circle of `radius`, lying in
//! its face plane and extruded without limit along the face normal (the
//! axis). Slicing uses the lateral edges directly: vertex `i` of a section is
//! where lateral edge `i` pierces the plane, so section edge `i` lies on side
//! wall `i`.

use crate::bool2d::{clip_segment, is_valid_contour, point_in_contour, Contour};
use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::plane::Plane;
use crate::transform::MeshTransform;
use crate::volume::ConvexCutter;
use nalgebra::{Point2, Point3, Vector3};
use std::f64::consts::TAU;

/// Planes closer than this to the axis direction are sliced as parallel
pub const PARALLEL_EPSILON: f64 = 1e-4;

/// Extra length, beyond the radius, of the chord search segment
const CHORD_REACH: f64 = 10.0;

/// Half-width of a parallel section when no interest area is given
const PARALLEL_MIN_HALF_WIDTH: f64 = 0.001;

/// Padding added along the axis to a parallel section
const PARALLEL_MARGIN: f64 = 0.1;

/// Minimum chord length for a parallel section
const CHORD_EPSILON: f64 = 1e-9;

/// A regular polygonal prism, unbounded along its axis
#[derive(Debug, Clone, PartialEq)]
pub struct Prism {
    face_plane: Plane,
    radius: f64,
    polygon: Vec<Point2<f64>>,
}

impl Prism {
    /// Create a prism whose face polygon is centred at `origin`, facing `axis`
    pub fn new(origin: Point3<f64>, axis: Vector3<f64>, radius: f64, sides: usize) -> Result<Prism> {
        if sides < 3 {
            return Err(Error::InvalidVolume(format!(
                "Prism needs at least 3 sides, got {}",
                sides
            )));
        }
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(Error::InvalidVolume(format!(
                "Prism radius must be positive, got {}",
                radius
            )));
        }
        if !(axis.norm() > 1e-12) {
            return Err(Error::InvalidVolume("Prism axis is zero".to_string()));
        }

        Ok(Prism {
            face_plane: Plane::new(origin, axis),
            radius,
            polygon: inscribe_circle(radius, sides),
        })
    }

    #[inline]
    pub fn origin(&self) -> Point3<f64> {
        self.face_plane.origin()
    }

    /// Unit axis direction
    #[inline]
    pub fn axis(&self) -> Vector3<f64> {
        self.face_plane.normal()
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[inline]
    pub fn sides(&self) -> usize {
        self.polygon.len()
    }

    #[inline]
    pub fn face_plane(&self) -> &Plane {
        &self.face_plane
    }

    /// The face polygon in face-plane coordinates
    #[inline]
    pub fn polygon(&self) -> &[Point2<f64>] {
        &self.polygon
    }

    /// The same prism with its radius reduced by `delta`
    pub fn shrunk(&self, delta: f64) -> Prism {
        let radius = (self.radius - delta).max(self.radius * 0.5);
        Prism {
            face_plane: self.face_plane,
            radius,
            polygon: inscribe_circle(radius, self.sides()),
        }
    }

    /// Whether `plane` runs along the axis
    #[inline]
    pub fn is_parallel(&self, plane: &Plane) -> bool {
        self.axis().dot(&plane.normal()).abs() <= PARALLEL_EPSILON
    }

    /// Point of face polygon vertex `i` (the start of lateral edge `i`)
    #[inline]
    pub fn lateral_point(&self, i: usize) -> Point3<f64> {
        let n = self.sides();
        self.face_plane.to_world_space(&self.polygon[i % n])
    }

    /// Plane of side wall `i`, spanned by polygon edge `i` and the axis.
    ///
    /// Local x runs along the edge and local y along `-axis`; the normal
    /// points towards the axis.
    pub fn wall_plane(&self, i: usize) -> Plane {
        let a = self.lateral_point(i);
        let b = self.lateral_point(i + 1);
        Plane::from_axes(a, b - a, -self.axis())
    }

    /// Strict containment in the infinite prism
    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        point_in_contour(&self.face_plane.to_plane_space(p), &self.polygon)
    }

    /// Cheap rejection: `false` when `bounds` is too far from the axis to touch
    pub fn may_touch(&self, bounds: &Aabb) -> bool {
        let v = bounds.center() - self.origin();
        let axis = self.axis();
        let off_axis = v - axis * v.dot(&axis);
        off_axis.norm() <= self.radius + bounds.half_diagonal()
    }

    /// Cross-section with `plane` in the plane's local frame.
    ///
    /// For planes crossing the axis, vertex `i` lies on lateral edge `i`.
    /// For planes along the axis the section is a rectangle over the chord
    /// the plane cuts from the face polygon, extended along the axis to cover
    /// `interest` (also in `plane`'s frame).
    pub fn slice(&self, plane: &Plane, interest: &[Point2<f64>]) -> Option<Contour> {
        if self.is_parallel(plane) {
            return self.parallel_slice(plane, interest);
        }

        let axis = self.axis();
        let section: Contour = (0..self.sides())
            .map(|i| plane.line_intersect(&self.lateral_point(i), &axis))
            .collect::<Option<_>>()?;

        if is_valid_contour(&section) {
            Some(section)
        } else {
            None
        }
    }

    fn parallel_slice(&self, plane: &Plane, interest: &[Point2<f64>]) -> Option<Contour> {
        let axis = self.axis();

        // Line where `plane` crosses the face plane, in face coordinates
        let along = axis.cross(&plane.normal());
        let anchor = self.face_plane.intersect_line(&plane.origin(), &axis)?;
        let anchor = self.face_plane.to_plane_space(&anchor);
        let dir = self.face_plane.dir_to_plane_space(&along);
        if dir.norm() <= CHORD_EPSILON {
            return None;
        }
        let dir = dir.normalize();

        // Centre the search segment on the foot of the polygon centre
        let foot = anchor - dir * anchor.coords.dot(&dir);
        let reach = self.radius + CHORD_REACH;
        let a = foot - dir * reach;
        let b = foot + dir * reach;

        let (t0, t1) = clip_segment(&a, &b, &self.polygon)?;
        let c0 = a + (b - a) * t0;
        let c1 = a + (b - a) * t1;
        if (c1 - c0).norm() <= CHORD_EPSILON {
            return None;
        }

        let c0 = plane.to_plane_space(&self.face_plane.to_world_space(&c0));
        let c1 = plane.to_plane_space(&self.face_plane.to_world_space(&c1));
        let up = plane.dir_to_plane_space(&axis).normalize();

        let (mut lo, mut hi) = if interest.is_empty() {
            (-PARALLEL_MIN_HALF_WIDTH, PARALLEL_MIN_HALF_WIDTH)
        } else {
            (f64::MAX, f64::MIN)
        };
        for p in interest {
            let t = (p - c0).dot(&up);
            lo = lo.min(t);
            hi = hi.max(t);
        }
        lo -= PARALLEL_MARGIN;
        hi += PARALLEL_MARGIN;

        Some(vec![c0 + up * lo, c1 + up * lo, c1 + up * hi, c0 + up * hi])
    }

    /// Express a world-space prism in the local space of a transformed mesh
    pub fn to_mesh_space(&self, transform: &MeshTransform) -> Result<Prism> {
        Prism::new(
            transform.point_to_mesh_space(&self.origin()),
            transform.dir_to_mesh_space(&self.axis()),
            transform.scale_to_mesh_space(self.radius),
            self.sides(),
        )
    }
}

impl ConvexCutter for Prism {
    fn cross_section(&self, plane: &Plane, interest: &[Point2<f64>]) -> Option<Contour> {
        self.slice(plane, interest)
    }

    fn may_intersect(&self, bounds: &Aabb) -> bool {
        self.may_touch(bounds)
    }
}

/// Regular polygon with vertex `i` at angle `2 * pi * i / sides`
fn inscribe_circle(radius: f64, sides: usize) -> Vec<Point2<f64>> {
    (0..sides)
        .map(|i| {
            let angle = TAU * i as f64 / sides as f64;
            Point2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bool2d::compute_signed_area;
    use approx::assert_relative_eq;

    fn octagon_prism() -> Prism {
        Prism::new(Point3::new(2.0, 0.0, 0.0), Vector3::new(-1.0, 0.0, 0.0), 0.1, 8).unwrap()
    }

    #[test]
    fn test_new_validates() {
        let origin = Point3::origin();
        assert!(Prism::new(origin, Vector3::z(), 1.0, 2).is_err());
        assert!(Prism::new(origin, Vector3::z(), 0.0, 6).is_err());
        assert!(Prism::new(origin, Vector3::zeros(), 1.0, 6).is_err());
    }

    #[test]
    fn test_slice_vertices_on_lateral_edges() {
        let prism = octagon_prism();
        let plane = Plane::new(Point3::new(0.5, 0.0, 0.0), Vector3::new(1.0, 0.2, 0.1));
        let section = prism.slice(&plane, &[]).unwrap();
        assert_eq!(section.len(), 8);

        for (i, q) in section.iter().enumerate() {
            let world = plane.to_world_space(q);
            let start = prism.lateral_point(i);
            let offset = world - start;
            let along = offset.dot(&prism.axis());
            assert!((offset - prism.axis() * along).norm() < 1e-9);
        }
    }

    #[test]
    fn test_perpendicular_slice_area() {
        let prism = octagon_prism();
        let plane = Plane::new(Point3::new(0.5, 0.0, 0.0), Vector3::x());
        let section = prism.slice(&plane, &[]).unwrap();
        let expected = 0.5 * 8.0 * 0.01 * (TAU / 8.0).sin();
        assert!((compute_signed_area(&section).abs() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_slice_covers_interest() {
        let prism = Prism::new(Point3::new(0.0, 0.0, 5.0), -Vector3::z(), 1.0, 4).unwrap();
        // The plane y = 0 contains the axis
        let plane = Plane::new(Point3::origin(), Vector3::y());
        let interest: Vec<Point2<f64>> = [
            Point3::new(-2.0, 0.0, -1.0),
            Point3::new(2.0, 0.0, -1.0),
            Point3::new(2.0, 0.0, 1.0),
        ]
        .iter()
        .map(|p| plane.to_plane_space(p))
        .collect();

        let section = prism.slice(&plane, &interest).unwrap();
        let world: Vec<Point3<f64>> = section.iter().map(|q| plane.to_world_space(q)).collect();
        let (min_z, max_z) = world
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.z), hi.max(p.z)));
        let (min_x, max_x) = world
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));

        assert!((min_z - -1.1).abs() < 1e-9);
        assert!((max_z - 1.1).abs() < 1e-9);
        // Chord of a square with vertices on the axes, through its centre
        assert!((min_x + 1.0).abs() < 1e-9);
        assert!((max_x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_slice_missing_polygon() {
        let prism = Prism::new(Point3::origin(), Vector3::z(), 1.0, 6).unwrap();
        let plane = Plane::new(Point3::new(0.0, 3.0, 0.0), Vector3::y());
        assert!(prism.slice(&plane, &[]).is_none());
    }

    #[test]
    fn test_wall_plane_faces_axis() {
        let prism = octagon_prism();
        for i in 0..prism.sides() {
            let wall = prism.wall_plane(i);
            let mid = nalgebra::center(&prism.lateral_point(i), &prism.lateral_point(i + 1));
            let to_axis = prism.origin() - mid;
            assert!(wall.normal().dot(&to_axis) > 0.0);
            assert_relative_eq!(wall.unit_y(), -prism.axis(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_shrunk_and_contains() {
        let prism = octagon_prism();
        let small = prism.shrunk(1e-4);
        assert!((small.radius() - (0.1 - 1e-4)).abs() < 1e-15);
        assert!(prism.contains_point(&Point3::new(-3.0, 0.05, 0.0)));
        assert!(!prism.contains_point(&Point3::new(0.0, 0.2, 0.0)));
    }
}
