// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Wrapper around earcutr for 2D polygon triangulation. Regions produced by
//! the boolean layer are triangulated polygon by polygon in the local frame
//! of a plane and handed back as oriented 2D triangles.

use crate::bool2d::{compute_signed_area, is_convex, Region2D, MIN_AREA_THRESHOLD};
use crate::{Error, Point2, Result};

/// Simple fan triangulation for convex polygons
#[inline]
fn fan_triangulate(n: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity((n - 2) * 3);
    for i in 1..n - 1 {
        indices.push(0);
        indices.push(i);
        indices.push(i + 1);
    }
    indices
}

/// Triangulate a ring with optional holes.
///
/// Returns triangle indices into the combined vertex array (outer followed
/// by every hole with at least 3 points, in order).
pub fn triangulate_rings(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<usize>> {
    let n = outer.len();
    if n < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points in outer boundary".to_string(),
        ));
    }

    let valid_holes: Vec<&Vec<Point2<f64>>> = holes.iter().filter(|h| h.len() >= 3).collect();

    if valid_holes.is_empty() {
        // FAST PATH: Triangle - no triangulation needed
        if n == 3 {
            return Ok(vec![0, 1, 2]);
        }

        // FAST PATH: Convex polygon - use fan triangulation
        if n <= 8 && is_convex(outer) {
            return Ok(fan_triangulate(n));
        }
    }

    // Flatten vertices for earcutr
    let total_points: usize = n + valid_holes.iter().map(|h| h.len()).sum::<usize>();
    let mut vertices = Vec::with_capacity(total_points * 2);

    for p in outer {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    // Add holes and track their start indices
    let mut hole_indices = Vec::with_capacity(valid_holes.len());
    for hole in valid_holes {
        hole_indices.push(vertices.len() / 2);
        for p in hole {
            vertices.push(p.x);
            vertices.push(p.y);
        }
    }

    earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))
}

/// Triangulate every polygon of a region.
///
/// Output triangles are counter-clockwise in the plane's local frame, or
/// clockwise when `invert_winding` is set. Zero-area triangles are dropped.
pub fn triangulate_region(
    region: &Region2D,
    invert_winding: bool,
) -> Result<Vec<[Point2<f64>; 3]>> {
    let mut triangles = Vec::new();

    for polygon in &region.polygons {
        let indices = triangulate_rings(&polygon.outer, &polygon.holes)?;

        let points: Vec<Point2<f64>> = polygon
            .outer
            .iter()
            .chain(polygon.holes.iter().filter(|h| h.len() >= 3).flatten())
            .copied()
            .collect();

        for tri in indices.chunks_exact(3) {
            let (Some(&a), Some(&b), Some(&c)) =
                (points.get(tri[0]), points.get(tri[1]), points.get(tri[2]))
            else {
                return Err(Error::TriangulationError(
                    "Triangulation index out of range".to_string(),
                ));
            };

            let area = compute_signed_area(&[a, b, c]);
            if area.abs() <= MIN_AREA_THRESHOLD {
                continue;
            }

            let ccw = area > 0.0;
            if ccw != invert_winding {
                triangles.push([a, b, c]);
            } else {
                triangles.push([a, c, b]);
            }
        }
    }

    Ok(triangles)
}
