// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar convex faces and face/plane slicing

use crate::bool2d::{self, clip_segment, Contour, Region2D};
use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::plane::{Plane, PLANE_EPSILON};
use nalgebra::{Point2, Point3, Vector3};
use smallvec::SmallVec;

/// Distance the intersection line is extended past the face before clipping
const SLICE_MARGIN: f64 = 1.0;

/// Slices shorter than this collapse to a point
const POINT_EPSILON: f64 = 1e-7;

/// Result of slicing a face with a plane
///
/// A planar face meets another plane in at most a segment, so there is no
/// polygon case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slice2D {
    Empty,
    Point(Point2<f64>),
    Segment(Point2<f64>, Point2<f64>),
}

/// A closed convex planar polygon
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    plane: Plane,
    vertices: SmallVec<[Point3<f64>; 4]>,
    contour: SmallVec<[Point2<f64>; 4]>,
    bounds: Aabb,
}

impl Face {
    /// Build a face from a counter-clockwise (seen from the front) ring of
    /// coplanar points.
    pub fn from_points(points: &[Point3<f64>]) -> Result<Face> {
        if points.len() < 3 {
            return Err(Error::DegenerateGeometry(
                "Face needs at least 3 points".to_string(),
            ));
        }

        let normal = newell_normal(points);
        let len = normal.norm();
        if len <= 1e-12 {
            return Err(Error::DegenerateGeometry(
                "Face points are collinear".to_string(),
            ));
        }

        let plane = Plane::new(points[0], normal / len);
        if points
            .iter()
            .any(|p| plane.signed_distance(p).abs() > PLANE_EPSILON)
        {
            return Err(Error::DegenerateGeometry(
                "Face points are not coplanar".to_string(),
            ));
        }

        let face = Face::from_parts(plane, points.iter().copied().collect());
        if !bool2d::is_convex(&face.contour) {
            return Err(Error::DegenerateGeometry(
                "Face polygon must be convex".to_string(),
            ));
        }

        Ok(face)
    }

    /// Build a face from a ring given in `plane`'s local coordinates
    pub fn from_contour(contour: &[Point2<f64>], plane: Plane) -> Face {
        let vertices = contour.iter().map(|q| plane.to_world_space(q)).collect();
        Face::from_parts(plane, vertices)
    }

    pub(crate) fn from_parts(plane: Plane, vertices: SmallVec<[Point3<f64>; 4]>) -> Face {
        let contour = vertices.iter().map(|p| plane.to_plane_space(p)).collect();
        let bounds = Aabb::from_points(&vertices)
            .unwrap_or_else(|| Aabb::new(plane.origin(), plane.origin()));

        Face {
            plane,
            vertices,
            contour,
            bounds,
        }
    }

    #[inline]
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.plane.normal()
    }

    #[inline]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// The polygon in this face's local frame
    #[inline]
    pub fn contour(&self) -> &[Point2<f64>] {
        &self.contour
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn area(&self) -> f64 {
        bool2d::compute_signed_area(&self.contour).abs()
    }

    pub fn centroid(&self) -> Point3<f64> {
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / self.vertices.len() as f64)
    }

    /// The face polygon as a region in its own frame
    pub fn region(&self) -> Region2D {
        Region2D::from_contour(&self.contour)
    }

    /// The face polygon expressed in another plane's frame
    pub fn contour_in(&self, plane: &Plane) -> Contour {
        self.vertices
            .iter()
            .map(|p| plane.to_plane_space(p))
            .collect()
    }

    /// Same polygon facing the other way
    pub fn flipped(&self) -> Face {
        let vertices = self.vertices.iter().rev().copied().collect();
        Face::from_parts(self.plane.flipped(), vertices)
    }

    /// Slice this face with `slicer`, in the slicer's local frame
    pub fn slice(&self, slicer: &Plane) -> Slice2D {
        let to_slicer = |q: &Point2<f64>| slicer.to_plane_space(&self.plane.to_world_space(q));

        match self.slice_local(slicer) {
            Slice2D::Empty => Slice2D::Empty,
            Slice2D::Point(p) => Slice2D::Point(to_slicer(&p)),
            Slice2D::Segment(a, b) => Slice2D::Segment(to_slicer(&a), to_slicer(&b)),
        }
    }

    /// Slice this face with `slicer`, in this face's local frame
    pub fn slice_local(&self, slicer: &Plane) -> Slice2D {
        let Some(line) = self.plane.intersection(slicer) else {
            return Slice2D::Empty;
        };

        // Crop the infinite line to a segment spanning the polygon
        let (mut t_min, mut t_max) = (f64::MAX, f64::MIN);
        for p in &self.contour {
            let t = line.parameter_of(p);
            t_min = t_min.min(t);
            t_max = t_max.max(t);
        }
        let a = line.at(t_min - SLICE_MARGIN);
        let b = line.at(t_max + SLICE_MARGIN);

        let Some((t0, t1)) = clip_segment(&a, &b, &self.contour) else {
            return Slice2D::Empty;
        };

        let p0 = a + (b - a) * t0;
        let p1 = a + (b - a) * t1;
        if (p1 - p0).norm() <= POINT_EPSILON {
            Slice2D::Point(nalgebra::center(&p0, &p1))
        } else {
            Slice2D::Segment(p0, p1)
        }
    }
}

/// Polygon normal by Newell's method
fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let n = points.len();
    let mut normal = Vector3::<f64>::zeros();

    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    normal
}
