// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planes with a local 2D coordinate frame
//!
//! Every planar operation in the crate (slicing, 2D booleans, triangulation)
//! runs in the local frame of a [`Plane`]. The frame is derived
//! deterministically from the normal so that two planes built from the same
//! normal always share the same in-plane axes.

use nalgebra::{Point2, Point3, Rotation3, Unit, Vector2, Vector3};

/// Tolerance for parallel tests and line/plane intersections
pub const PLANE_EPSILON: f64 = 1e-6;

/// An oriented plane with an orthonormal in-plane basis
///
/// `unit_x`, `unit_y` and `normal` are unit length, mutually perpendicular
/// and right-handed (`unit_x × unit_y = normal`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    origin: Point3<f64>,
    normal: Vector3<f64>,
    unit_x: Vector3<f64>,
    unit_y: Vector3<f64>,
}

/// A line in a plane's local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line2D {
    pub point: Point2<f64>,
    /// Unit direction
    pub direction: Vector2<f64>,
}

impl Line2D {
    #[inline]
    pub fn at(&self, t: f64) -> Point2<f64> {
        self.point + self.direction * t
    }

    /// Parameter of the orthogonal projection of `p` onto the line
    #[inline]
    pub fn parameter_of(&self, p: &Point2<f64>) -> f64 {
        (p - self.point).dot(&self.direction)
    }
}

impl Plane {
    /// Create a plane from a point and a (not necessarily unit) normal.
    ///
    /// The normal must be non-zero.
    pub fn new(origin: Point3<f64>, normal: Vector3<f64>) -> Self {
        let normal = normal.normalize();

        // Find the axis least parallel to the normal for a stable cross product
        let abs_x = normal.x.abs();
        let abs_y = normal.y.abs();
        let abs_z = normal.z.abs();

        let reference = if abs_x <= abs_y && abs_x <= abs_z {
            Vector3::new(1.0, 0.0, 0.0)
        } else if abs_y <= abs_z {
            Vector3::new(0.0, 1.0, 0.0)
        } else {
            Vector3::new(0.0, 0.0, 1.0)
        };

        let unit_x = normal.cross(&reference).normalize();
        let unit_y = normal.cross(&unit_x).normalize();

        Self {
            origin,
            normal,
            unit_x,
            unit_y,
        }
    }

    /// Create a plane from explicit in-plane axes.
    ///
    /// `unit_y` is re-orthogonalised against `unit_x`; the normal is
    /// `unit_x × unit_y`. The axes must not be parallel.
    pub fn from_axes(origin: Point3<f64>, unit_x: Vector3<f64>, unit_y: Vector3<f64>) -> Self {
        let unit_x = unit_x.normalize();
        let normal = unit_x.cross(&unit_y).normalize();
        let unit_y = normal.cross(&unit_x);

        Self {
            origin,
            normal,
            unit_x,
            unit_y,
        }
    }

    #[inline]
    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    #[inline]
    pub fn unit_x(&self) -> Vector3<f64> {
        self.unit_x
    }

    #[inline]
    pub fn unit_y(&self) -> Vector3<f64> {
        self.unit_y
    }

    /// Same plane facing the other way. Swapping the in-plane axes keeps the
    /// frame right-handed, which mirrors local coordinates.
    #[inline]
    pub fn flipped(&self) -> Plane {
        Plane {
            origin: self.origin,
            normal: -self.normal,
            unit_x: self.unit_y,
            unit_y: self.unit_x,
        }
    }

    /// Express a world point in local coordinates (drops the normal component)
    #[inline]
    pub fn to_plane_space(&self, p: &Point3<f64>) -> Point2<f64> {
        let v = p - self.origin;
        Point2::new(v.dot(&self.unit_x), v.dot(&self.unit_y))
    }

    /// Lift a local point back into world space
    #[inline]
    pub fn to_world_space(&self, q: &Point2<f64>) -> Point3<f64> {
        self.origin + self.unit_x * q.x + self.unit_y * q.y
    }

    /// Express a world direction in local coordinates
    #[inline]
    pub fn dir_to_plane_space(&self, d: &Vector3<f64>) -> Vector2<f64> {
        Vector2::new(d.dot(&self.unit_x), d.dot(&self.unit_y))
    }

    /// Lift a local direction back into world space
    #[inline]
    pub fn dir_to_world_space(&self, d: &Vector2<f64>) -> Vector3<f64> {
        self.unit_x * d.x + self.unit_y * d.y
    }

    /// Orthogonal projection of `p` onto the plane, in local coordinates
    #[inline]
    pub fn project(&self, p: &Point3<f64>) -> Point2<f64> {
        self.to_plane_space(p)
    }

    /// Closest point on the plane
    #[inline]
    pub fn closest_point(&self, p: &Point3<f64>) -> Point3<f64> {
        p - self.normal * self.signed_distance(p)
    }

    /// Signed distance (positive on the normal side)
    #[inline]
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        (p - self.origin).dot(&self.normal)
    }

    #[inline]
    pub fn is_parallel_to_direction(&self, direction: &Vector3<f64>) -> bool {
        self.normal.dot(&direction.normalize()).abs() <= PLANE_EPSILON
    }

    #[inline]
    pub fn is_parallel(&self, other: &Plane) -> bool {
        self.normal.cross(&other.normal).norm_squared() <= PLANE_EPSILON * PLANE_EPSILON
    }

    /// Parallel and within `PLANE_EPSILON` of each other (either orientation)
    #[inline]
    pub fn is_coplanar(&self, other: &Plane) -> bool {
        self.is_parallel(other) && self.signed_distance(&other.origin).abs() <= PLANE_EPSILON
    }

    /// World point where the line `point + t * direction` meets the plane
    pub fn intersect_line(
        &self,
        point: &Point3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<Point3<f64>> {
        let denom = self.normal.dot(direction);
        if denom.abs() <= PLANE_EPSILON {
            return None;
        }
        let t = (self.origin - point).dot(&self.normal) / denom;
        Some(point + direction * t)
    }

    /// Local point where the line `point + t * direction` meets the plane
    #[inline]
    pub fn line_intersect(
        &self,
        point: &Point3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<Point2<f64>> {
        self.intersect_line(point, direction)
            .map(|hit| self.to_plane_space(&hit))
    }

    /// Line of intersection with `other`, in this plane's local coordinates.
    /// `None` when the planes are parallel.
    pub fn intersection(&self, other: &Plane) -> Option<Line2D> {
        let direction = self.normal.cross(&other.normal);
        if direction.norm_squared() <= PLANE_EPSILON * PLANE_EPSILON {
            return None;
        }

        // Walk inside `other`, perpendicular to the shared line, until we hit this plane
        let across = direction.cross(&other.normal) / direction.norm();
        let hit = self.intersect_line(&other.origin, &across)?;

        let local_dir = self.dir_to_plane_space(&direction);
        let len = local_dir.norm();
        if len <= PLANE_EPSILON {
            return None;
        }

        Some(Line2D {
            point: self.to_plane_space(&hit),
            direction: local_dir / len,
        })
    }

    /// Rotate the plane by `angle` radians around the axis through `target`
    pub fn rotate_around(&mut self, target: &Point3<f64>, axis: &Vector3<f64>, angle: f64) {
        let rotation = Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle);
        self.origin = target + rotation * (self.origin - target);
        self.normal = rotation * self.normal;
        self.unit_x = rotation * self.unit_x;
        self.unit_y = rotation * self.unit_y;
    }

    /// Copy of this plane with its in-plane axes turned by `angle` radians
    pub fn spun(&self, angle: f64) -> Plane {
        let mut spun = *self;
        spun.rotate_around(&self.origin, &self.normal, angle);
        spun
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_orthonormal(plane: &Plane) {
        assert!((plane.unit_x().norm() - 1.0).abs() < 1e-12);
        assert!((plane.unit_y().norm() - 1.0).abs() < 1e-12);
        assert!((plane.normal().norm() - 1.0).abs() < 1e-12);
        assert!(plane.unit_x().dot(&plane.unit_y()).abs() < 1e-12);
        assert!(plane.unit_x().dot(&plane.normal()).abs() < 1e-12);
        let n = plane.unit_x().cross(&plane.unit_y());
        assert_relative_eq!(n, plane.normal(), epsilon = 1e-12);
    }

    #[test]
    fn test_basis_is_right_handed() {
        for normal in [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 2.0, -3.0),
        ] {
            assert_orthonormal(&Plane::new(Point3::new(0.5, -1.0, 2.0), normal));
        }
    }

    #[test]
    fn test_round_trip() {
        let plane = Plane::new(Point3::new(1.0, 2.0, 3.0), Vector3::new(0.3, -0.4, 0.8));
        let local = Point2::new(-2.5, 7.25);
        let world = plane.to_world_space(&local);
        assert!(plane.signed_distance(&world).abs() < 1e-12);
        assert_relative_eq!(plane.to_plane_space(&world), local, epsilon = 1e-9);
    }

    #[test]
    fn test_project_drops_normal_offset() {
        let plane = Plane::new(Point3::new(0.0, 0.0, 1.0), Vector3::z());
        let p = Point3::new(0.25, -3.0, 6.0);
        let closest = plane.closest_point(&p);
        assert_relative_eq!(closest, Point3::new(0.25, -3.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(plane.project(&p), plane.to_plane_space(&closest), epsilon = 1e-12);
    }

    #[test]
    fn test_directions() {
        let plane = Plane::new(Point3::new(3.0, 1.0, -2.0), Vector3::new(0.0, 1.0, 1.0));
        let d = plane.unit_x() * 2.0 - plane.unit_y();
        let local = plane.dir_to_plane_space(&d);
        assert_relative_eq!(local, Vector2::new(2.0, -1.0), epsilon = 1e-12);
        assert_relative_eq!(plane.dir_to_world_space(&local), d, epsilon = 1e-12);

        assert!(plane.is_parallel_to_direction(&d));
        assert!(!plane.is_parallel_to_direction(&plane.normal()));
    }

    #[test]
    fn test_from_axes() {
        let plane = Plane::from_axes(
            Point3::origin(),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, -1.0),
        );
        assert_orthonormal(&plane);
        assert_relative_eq!(plane.normal(), Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_line_intersect_parallel() {
        let plane = Plane::new(Point3::origin(), Vector3::z());
        assert!(plane
            .line_intersect(&Point3::new(0.0, 0.0, 1.0), &Vector3::x())
            .is_none());
        let hit = plane
            .intersect_line(&Point3::new(1.0, 2.0, 5.0), &Vector3::new(0.0, 0.0, -2.0))
            .unwrap();
        assert_relative_eq!(hit, Point3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_intersection_line_lies_on_both_planes() {
        let a = Plane::new(Point3::new(0.0, 0.0, 0.5), Vector3::z());
        let b = Plane::new(Point3::new(0.25, 0.0, 0.0), Vector3::new(1.0, 1.0, 0.0));
        let line = a.intersection(&b).unwrap();
        for t in [-1.0, 0.0, 2.0] {
            let p = a.to_world_space(&line.at(t));
            assert!(a.signed_distance(&p).abs() < 1e-9);
            assert!(b.signed_distance(&p).abs() < 1e-9);
        }
        assert!(a.intersection(&a.flipped()).is_none());
    }

    #[test]
    fn test_flipped_keeps_frame() {
        let plane = Plane::new(Point3::origin(), Vector3::new(0.0, 1.0, 1.0));
        let flipped = plane.flipped();
        assert_orthonormal(&flipped);
        assert_relative_eq!(flipped.normal(), -plane.normal(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotate_around() {
        let mut plane = Plane::new(Point3::new(1.0, 0.0, 0.0), Vector3::x());
        plane.rotate_around(&Point3::origin(), &Vector3::z(), std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(plane.origin(), Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(plane.normal(), Vector3::y(), epsilon = 1e-12);
        assert_orthonormal(&plane);
    }
}
