// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh triangles with material and texture attributes
//!
//! A [`Triangle`] is a three-vertex [`Face`] that also carries per-vertex
//! texture coordinates and the outer/inner material flag. Cutting a triangle
//! always goes through [`Triangle::retriangulate`], which rebuilds the pieces
//! in the source plane and reprojects the texture coordinates so the cut is
//! invisible in the texture.

use crate::bool2d::{Region2D, MIN_AREA_THRESHOLD};
use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::face::Face;
use crate::plane::Plane;
use crate::triangulation::triangulate_region;
use nalgebra::{Point2, Point3, Vector3};
use smallvec::smallvec;
use tracing::debug;

/// Minimum squared length of a texture edge for reprojection
const UV_EPSILON: f64 = 1e-6;

/// A mesh triangle
///
/// The normal follows the right-hand rule `(v1 - v0) x (v2 - v0)`, i.e. the
/// vertices are counter-clockwise seen from the front.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    face: Face,
    uvs: [Point2<f64>; 3],
    is_outer: bool,
}

impl Triangle {
    /// Create an outer-material triangle with zero texture coordinates
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Result<Triangle> {
        let normal = (v1 - v0).cross(&(v2 - v0));
        let area = normal.norm() * 0.5;
        if !(area > MIN_AREA_THRESHOLD) {
            return Err(Error::DegenerateGeometry(format!(
                "Triangle area {:e} is too small",
                area
            )));
        }

        let plane = Plane::new(v0, normal);
        Ok(Triangle {
            face: Face::from_parts(plane, smallvec![v0, v1, v2]),
            uvs: [Point2::origin(); 3],
            is_outer: true,
        })
    }

    pub fn with_uvs(mut self, uvs: [Point2<f64>; 3]) -> Self {
        self.uvs = uvs;
        self
    }

    pub fn with_outer(mut self, is_outer: bool) -> Self {
        self.is_outer = is_outer;
        self
    }

    #[inline]
    pub fn face(&self) -> &Face {
        &self.face
    }

    #[inline]
    pub fn plane(&self) -> &Plane {
        self.face.plane()
    }

    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.face.normal()
    }

    #[inline]
    pub fn vertices(&self) -> [Point3<f64>; 3] {
        let v = self.face.vertices();
        [v[0], v[1], v[2]]
    }

    #[inline]
    pub fn uvs(&self) -> [Point2<f64>; 3] {
        self.uvs
    }

    #[inline]
    pub fn is_outer(&self) -> bool {
        self.is_outer
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        self.face.bounds()
    }

    /// The triangle in its own plane's local frame
    #[inline]
    pub fn contour(&self) -> &[Point2<f64>] {
        self.face.contour()
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.face.area()
    }

    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        self.face.centroid()
    }

    /// The triangle as a region in its own frame
    pub fn footprint(&self) -> Region2D {
        self.face.region()
    }

    /// Texture coordinate at a point of this triangle's plane
    ///
    /// Solves `p - v0 = a * (v1 - v0) + b * (v2 - v0)` in the plane and applies
    /// the same combination to the texture edges. Zero when the texture edges
    /// are degenerate.
    pub fn uv_at(&self, p: &Point3<f64>) -> Point2<f64> {
        let [t0, t1, t2] = self.uvs;
        let du = t1 - t0;
        let dv = t2 - t0;
        if du.norm_squared() <= UV_EPSILON || dv.norm_squared() <= UV_EPSILON {
            return Point2::origin();
        }

        let c = self.contour();
        let e1 = c[1] - c[0];
        let e2 = c[2] - c[0];
        let q = self.plane().to_plane_space(p) - c[0];

        let det = e1.x * e2.y - e1.y * e2.x;
        if det.abs() <= f64::EPSILON {
            return Point2::origin();
        }
        let a = (q.x * e2.y - q.y * e2.x) / det;
        let b = (e1.x * q.y - e1.y * q.x) / det;

        t0 + du * a + dv * b
    }

    /// Triangulate a region of `plane` into outer triangles.
    ///
    /// Triangles face along the plane normal, or against it when
    /// `invert_winding` is set.
    pub fn try_triangulate(
        plane: &Plane,
        region: &Region2D,
        invert_winding: bool,
    ) -> Result<Vec<Triangle>> {
        let triangles = triangulate_region(region, invert_winding)?;

        Ok(triangles
            .iter()
            .filter_map(|[a, b, c]| {
                Triangle::new(
                    plane.to_world_space(a),
                    plane.to_world_space(b),
                    plane.to_world_space(c),
                )
                .ok()
            })
            .collect())
    }

    /// Best-effort [`Triangle::try_triangulate`]: failures yield no triangles
    pub fn triangulate(plane: &Plane, region: &Region2D, invert_winding: bool) -> Vec<Triangle> {
        match Triangle::try_triangulate(plane, region, invert_winding) {
            Ok(triangles) => triangles,
            Err(e) => {
                debug!(error = %e, "dropping region that failed to triangulate");
                Vec::new()
            }
        }
    }

    /// Replace this triangle by the triangulation of `region` (given in this
    /// triangle's frame), keeping its material and texture mapping
    pub fn retriangulate(&self, region: &Region2D) -> Vec<Triangle> {
        Triangle::triangulate(self.plane(), region, false)
            .into_iter()
            .map(|t| {
                let [a, b, c] = t.vertices();
                let uvs = [self.uv_at(&a), self.uv_at(&b), self.uv_at(&c)];
                t.with_uvs(uvs).with_outer(self.is_outer)
            })
            .collect()
    }
}
