// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Convex volumes
//!
//! A [`Volume`] is a closed convex solid bounded by a list of outward-facing
//! [`Face`]s. Shapes (box, cube, pyramid) are plain constructors producing the
//! face list; the [`Prism`](crate::Prism) hole shape is a separate type with
//! its own slicing fast path. Both implement [`ConvexCutter`], which is all
//! the hole-punching code needs.

mod shapes;

use crate::bool2d::{
    self, clip_convex, compute_signed_area, ensure_ccw, Contour, Region2D, MIN_AREA_THRESHOLD,
};
use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::face::{Face, Slice2D};
use crate::plane::{Plane, PLANE_EPSILON};
use crate::prism::Prism;
use crate::triangle::Triangle;
use nalgebra::{Point2, Point3, Vector2, Vector3};
use tracing::debug;

/// Slack used when deciding whether a triangle already fits a box
const CONTAIN_TOLERANCE: f64 = 1e-9;

/// Padding around the projected bounds that seeds a cross-section
const SECTION_MARGIN: f64 = 1.0;

/// A convex solid that can cut triangles
pub trait ConvexCutter: Sync {
    /// Cross-section with `plane`, as a ring in the plane's local frame.
    ///
    /// `interest` is the region of the plane the caller cares about (also in
    /// local coordinates); unbounded solids use it to bound their section.
    /// `None` when the plane misses the solid or only touches its boundary.
    fn cross_section(&self, plane: &Plane, interest: &[Point2<f64>]) -> Option<Contour>;

    /// Conservative overlap test: `false` only if the solid cannot touch `bounds`
    fn may_intersect(&self, bounds: &Aabb) -> bool;
}

/// A closed convex solid
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    faces: Vec<Face>,
    bounds: Aabb,
}

/// A face/plane intersection bounding a cross-section
struct SectionEdge {
    point: Point2<f64>,
    direction: Vector2<f64>,
    outward: Vector2<f64>,
}

impl Volume {
    /// Build a volume from the faces of a convex solid.
    ///
    /// Faces whose normal points towards the interior are flipped so that
    /// every normal points outward.
    pub fn from_faces(faces: Vec<Face>) -> Result<Volume> {
        if faces.len() < 4 {
            return Err(Error::InvalidVolume(format!(
                "A closed solid needs at least 4 faces, got {}",
                faces.len()
            )));
        }

        let center = {
            let sum = faces
                .iter()
                .fold(Vector3::zeros(), |acc, f| acc + f.centroid().coords);
            Point3::from(sum / faces.len() as f64)
        };

        let faces: Vec<Face> = faces
            .into_iter()
            .map(|face| {
                if face.normal().dot(&(face.centroid() - center)) < 0.0 {
                    face.flipped()
                } else {
                    face
                }
            })
            .collect();

        let bounds = faces
            .iter()
            .skip(1)
            .fold(*faces[0].bounds(), |acc, f| acc.union(f.bounds()));

        Ok(Volume { faces, bounds })
    }

    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Whether `p` lies inside or on the boundary
    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        self.faces
            .iter()
            .all(|f| f.plane().signed_distance(p) <= PLANE_EPSILON)
    }

    /// Cross-section with `plane`, counter-clockwise in the plane's frame.
    ///
    /// Each face crossing the plane contributes a half-plane bounded by its
    /// slice segment; the section is their intersection. A plane that touches
    /// the solid only along an edge (two faces slicing to the same line from
    /// opposite sides) or that coincides with a face yields `None`.
    pub fn slice(&self, plane: &Plane) -> Option<Contour> {
        if self.faces.iter().any(|f| f.plane().is_coplanar(plane)) {
            return None;
        }

        let mut edges: Vec<SectionEdge> = Vec::with_capacity(self.faces.len());
        for face in &self.faces {
            let Slice2D::Segment(a, b) = face.slice(plane) else {
                continue;
            };

            let outward = plane.dir_to_plane_space(&face.normal());
            let len = outward.norm();
            if len <= PLANE_EPSILON {
                continue;
            }
            let outward = outward / len;
            let direction = (b - a).normalize();

            if let Some(existing) = edges
                .iter()
                .find(|e| collinear(e, &a, &direction))
            {
                if existing.outward.dot(&outward) < 0.0 {
                    // Faces on both sides of one line: the plane grazes an edge
                    return None;
                }
                continue;
            }

            edges.push(SectionEdge {
                point: a,
                direction,
                outward,
            });
        }

        if edges.is_empty() {
            return None;
        }

        let mut ring = self.projected_bounds(plane);
        for edge in &edges {
            ring = clip_convex(&ring, &edge.point, &edge.outward);
            if ring.len() < 3 {
                return None;
            }
        }

        if compute_signed_area(&ring).abs() <= MIN_AREA_THRESHOLD {
            return None;
        }
        Some(ensure_ccw(&ring))
    }

    /// Rectangle in `plane`'s frame covering the projection of the bounds
    fn projected_bounds(&self, plane: &Plane) -> Contour {
        let (mut min, mut max) = (
            Point2::new(f64::MAX, f64::MAX),
            Point2::new(f64::MIN, f64::MIN),
        );
        for corner in self.bounds.corners() {
            let q = plane.to_plane_space(&corner);
            min.x = min.x.min(q.x);
            min.y = min.y.min(q.y);
            max.x = max.x.max(q.x);
            max.y = max.y.max(q.y);
        }
        min.x -= SECTION_MARGIN;
        min.y -= SECTION_MARGIN;
        max.x += SECTION_MARGIN;
        max.y += SECTION_MARGIN;

        vec![
            min,
            Point2::new(max.x, min.y),
            max,
            Point2::new(min.x, max.y),
        ]
    }

    /// The part of `triangle` outside this volume
    pub fn punch(&self, triangle: &Triangle) -> Vec<Triangle> {
        let Some(section) = self.slice(triangle.plane()) else {
            return vec![triangle.clone()];
        };
        let footprint = triangle.footprint();
        let cutter = Region2D::from_contour(&section);

        match bool2d::overlaps(&footprint, &cutter, 0.0) {
            Ok(false) => return vec![triangle.clone()],
            Ok(true) => {}
            Err(e) => {
                debug!(error = %e, "volume punch skipped a triangle");
                return vec![triangle.clone()];
            }
        }

        match bool2d::difference(&footprint, &cutter) {
            Ok(rest) => triangle.retriangulate(&rest),
            Err(e) => {
                debug!(error = %e, "volume punch skipped a triangle");
                vec![triangle.clone()]
            }
        }
    }

    /// The part of `triangle` inside this volume
    pub fn crop(&self, triangle: &Triangle) -> Vec<Triangle> {
        if triangle.vertices().iter().all(|v| self.contains_point(v)) {
            return vec![triangle.clone()];
        }
        let Some(section) = self.slice(triangle.plane()) else {
            return Vec::new();
        };
        self.crop_to(triangle, &Region2D::from_contour(&section))
    }

    fn crop_to(&self, triangle: &Triangle, region: &Region2D) -> Vec<Triangle> {
        match bool2d::intersection(&triangle.footprint(), region) {
            Ok(inside) if inside.is_empty() => Vec::new(),
            Ok(inside) => triangle.retriangulate(&inside),
            Err(e) => {
                debug!(error = %e, "volume crop dropped a triangle");
                Vec::new()
            }
        }
    }

    /// Crop a triangle set to this volume for spatial partitioning.
    ///
    /// Triangles that fit are kept verbatim and disjoint ones are dropped.
    /// A triangle lying in the plane of a face is owned by the volume only
    /// when that face points along a positive axis. Two volumes sharing the
    /// face therefore never both keep the triangle.
    pub fn crop_triangles(&self, triangles: &[Triangle]) -> Vec<Triangle> {
        let mut result = Vec::with_capacity(triangles.len());

        for triangle in triangles {
            if !self.bounds.intersects(triangle.bounds()) {
                continue;
            }

            if let Some(face) = self
                .faces
                .iter()
                .find(|f| f.plane().is_coplanar(triangle.plane()))
            {
                if !owns_boundary(&face.normal()) {
                    continue;
                }
                if self.bounds.contains(triangle.bounds(), CONTAIN_TOLERANCE) {
                    result.push(triangle.clone());
                } else {
                    let region = Region2D::from_contour(&face.contour_in(triangle.plane()));
                    result.extend(self.crop_to(triangle, &region));
                }
                continue;
            }

            if self.bounds.contains(triangle.bounds(), CONTAIN_TOLERANCE)
                && triangle.vertices().iter().all(|v| self.contains_point(v))
            {
                result.push(triangle.clone());
                continue;
            }

            result.extend(self.crop(triangle));
        }

        result
    }

    /// Whether any face of this volume overlaps the prism
    pub fn intersects_prism(&self, prism: &Prism) -> bool {
        if !prism.may_touch(&self.bounds) {
            return false;
        }

        self.faces.iter().any(|face| {
            let Some(section) = prism.slice(face.plane(), face.contour()) else {
                return false;
            };
            verdict(
                bool2d::overlaps(&face.region(), &Region2D::from_contour(&section), 0.0),
                "overlap",
            )
        })
    }

    /// Whether every face of this volume lies inside the prism
    pub fn inside_prism(&self, prism: &Prism) -> bool {
        if !prism.may_touch(&self.bounds) {
            return false;
        }

        self.faces.iter().all(|face| {
            let Some(section) = prism.slice(face.plane(), face.contour()) else {
                return false;
            };
            verdict(
                bool2d::difference(&face.region(), &Region2D::from_contour(&section))
                    .map(|rest| rest.area() <= MIN_AREA_THRESHOLD),
                "containment",
            )
        })
    }

    /// Outward-facing triangles covering the surface (a fan per face)
    pub fn triangles(&self) -> Vec<Triangle> {
        let mut triangles = Vec::with_capacity(self.faces.len() * 2);
        for face in &self.faces {
            let v = face.vertices();
            for i in 1..v.len() - 1 {
                if let Ok(t) = Triangle::new(v[0], v[i], v[i + 1]) {
                    triangles.push(t);
                }
            }
        }
        triangles
    }
}

impl ConvexCutter for Volume {
    fn cross_section(&self, plane: &Plane, _interest: &[Point2<f64>]) -> Option<Contour> {
        self.slice(plane)
    }

    fn may_intersect(&self, bounds: &Aabb) -> bool {
        self.bounds.intersects(bounds)
    }
}

/// Outcome of a best-effort prism test; a failed boolean counts as `false`
fn verdict(result: Result<bool>, test: &str) -> bool {
    result.unwrap_or_else(|e| {
        debug!(error = %e, test, "prism test failed");
        false
    })
}

fn collinear(edge: &SectionEdge, point: &Point2<f64>, direction: &Vector2<f64>) -> bool {
    let cross = |u: &Vector2<f64>, v: &Vector2<f64>| u.x * v.y - u.y * v.x;
    cross(&edge.direction, direction).abs() <= PLANE_EPSILON
        && cross(&edge.direction, &(point - edge.point)).abs() <= PLANE_EPSILON
}

/// Shared boundaries belong to the face pointing along a positive axis
fn owns_boundary(normal: &Vector3<f64>) -> bool {
    for c in normal.iter() {
        if c.abs() > PLANE_EPSILON {
            return *c > 0.0;
        }
    }
    false
}
