// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hole punching on flat triangle lists
//!
//! A hole is applied in three stages:
//!
//! 1. [`partition`] the triangles into those the hole touches and the rest,
//! 2. [`cut`] the hole's cross-section out of every affected triangle,
//! 3. build the tunnel walls from the affected triangles ([`WallCollector`]
//!    for prisms, [`volume_walls`] for generic volumes).
//!
//! The stages are public so [`FaceTree`](crate::FaceTree) can run them per
//! leaf. Boolean and triangulation failures never abort a hole: the failing
//! triangle contributes nothing and the failure is logged at `debug`.

mod walls;

pub use walls::{sweep, volume_walls, WallCollector, WallSegment};

use crate::bool2d::{self, compute_signed_area, Region2D};
use crate::prism::Prism;
use crate::triangle::Triangle;
use crate::volume::{ConvexCutter, Volume};
use rayon::prelude::*;
use tracing::debug;

/// Radius reduction of the cutting prism.
///
/// Material is removed slightly inside the wall, so a second punch with the
/// same hole finds nothing left to cut.
pub const HOLE_SHRINK: f64 = 1e-4;

/// Overlap below this fraction of the hole's cross-section does not count
pub const OVERLAP_EPSILON: f64 = 1e-7;

/// Triangles split by whether a hole touches them, in input order
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub affected: Vec<Triangle>,
    pub unaffected: Vec<Triangle>,
}

/// Whether the cutter's cross-section overlaps the triangle
pub fn is_affected<C: ConvexCutter + ?Sized>(triangle: &Triangle, cutter: &C) -> bool {
    if !cutter.may_intersect(triangle.bounds()) {
        return false;
    }
    let Some(section) = cutter.cross_section(triangle.plane(), triangle.contour()) else {
        return false;
    };

    let min_area = compute_signed_area(&section).abs() * OVERLAP_EPSILON;
    match bool2d::overlaps(&triangle.footprint(), &Region2D::from_contour(&section), min_area) {
        Ok(hit) => hit,
        Err(e) => {
            debug!(error = %e, "overlap test failed, leaving triangle untouched");
            false
        }
    }
}

/// Split `triangles` into those the cutter affects and those it does not
pub fn partition<C: ConvexCutter + ?Sized>(triangles: Vec<Triangle>, cutter: &C) -> Partition {
    let flags: Vec<bool> = triangles
        .par_iter()
        .map(|t| is_affected(t, cutter))
        .collect();

    let mut partition = Partition::default();
    for (triangle, affected) in triangles.into_iter().zip(flags) {
        if affected {
            partition.affected.push(triangle);
        } else {
            partition.unaffected.push(triangle);
        }
    }
    partition
}

/// Remove the cutter's cross-section from each triangle.
///
/// Pieces keep the material and texture mapping of their source triangle.
pub fn cut<C: ConvexCutter + ?Sized>(triangles: &[Triangle], cutter: &C) -> Vec<Triangle> {
    triangles
        .par_iter()
        .flat_map_iter(|t| cut_triangle(t, cutter))
        .collect()
}

fn cut_triangle<C: ConvexCutter + ?Sized>(triangle: &Triangle, cutter: &C) -> Vec<Triangle> {
    let Some(section) = cutter.cross_section(triangle.plane(), triangle.contour()) else {
        return vec![triangle.clone()];
    };

    match bool2d::difference(&triangle.footprint(), &Region2D::from_contour(&section)) {
        Ok(rest) if rest.is_empty() => Vec::new(),
        Ok(rest) => triangle.retriangulate(&rest),
        Err(e) => {
            debug!(error = %e, "dropping triangle that failed to cut");
            Vec::new()
        }
    }
}

/// Punch a prism hole through a triangle list.
///
/// Returns the cut triangles, then the inner wall triangles, then the
/// untouched triangles in their original order.
pub fn punch_hole(triangles: Vec<Triangle>, prism: &Prism) -> Vec<Triangle> {
    let cutter = prism.shrunk(HOLE_SHRINK);
    let Partition {
        affected,
        unaffected,
    } = partition(triangles, &cutter);

    if affected.is_empty() {
        return unaffected;
    }

    let mut walls = WallCollector::new(prism);
    walls.collect(&affected);

    let mut result = cut(&affected, &cutter);
    result.extend(walls.build());
    result.extend(unaffected);
    result
}

/// Punch a generic convex volume through a triangle list.
///
/// Same output layout as [`punch_hole`]; each face of the volume gets its
/// own wall.
pub fn punch_volume(triangles: Vec<Triangle>, volume: &Volume) -> Vec<Triangle> {
    let Partition {
        affected,
        unaffected,
    } = partition(triangles, volume);

    if affected.is_empty() {
        return unaffected;
    }

    let mut result = cut(&affected, volume);
    result.extend(volume_walls(&affected, volume));
    result.extend(unaffected);
    result
}
