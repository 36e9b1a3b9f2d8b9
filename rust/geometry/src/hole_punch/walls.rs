// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunnel wall construction
//!
//! Every wall of a hole is a plane. Where mesh triangles cross that plane
//! inside the hole they leave segments; seen in the wall's frame with the
//! hole entrance at the top, a segment whose triangle faces along the hole
//! axis marks the far side of material, and one facing against it marks the
//! near side. Sweeping the segments from the deepest up, each one casts a
//! shadow to a common baseline above all of them: far-side shadows are added
//! and near-side shadows removed. What remains is the part of the wall that
//! lies inside the material.
//!
//! Segments whose lines cross each other are not ordered correctly. Closed
//! meshes rarely produce them inside a single wall.

use crate::bool2d::{self, clip_segment, contour_bounds, Region2D, EPSILON_2D};
use crate::face::{Face, Slice2D};
use crate::plane::Plane;
use crate::prism::Prism;
use crate::triangle::Triangle;
use crate::volume::Volume;
use nalgebra::Point2;
use rayon::prelude::*;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;

/// A mesh/wall crossing in the wall's frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallSegment {
    pub a: Point2<f64>,
    pub b: Point2<f64>,
    /// The crossing triangle faces away from the hole entrance
    pub forward: bool,
}

impl WallSegment {
    #[inline]
    fn x_range(&self) -> (f64, f64) {
        (self.a.x.min(self.b.x), self.a.x.max(self.b.x))
    }

    /// Height of the segment's line at `x`
    #[inline]
    fn y_at(&self, x: f64) -> f64 {
        let t = (x - self.a.x) / (self.b.x - self.a.x);
        self.a.y + (self.b.y - self.a.y) * t
    }
}

/// Accumulates wall segments for a prism hole.
///
/// Segments may be collected in several batches (one per tree leaf); walls
/// are built once at the end so that a tunnel crossing several leaves still
/// gets one continuous wall.
#[derive(Debug, Clone)]
pub struct WallCollector {
    prism: Prism,
    planes: Vec<Plane>,
    walls: Vec<Vec<WallSegment>>,
}

impl WallCollector {
    pub fn new(prism: &Prism) -> Self {
        let sides = prism.sides();
        Self {
            prism: prism.clone(),
            planes: (0..sides).map(|i| prism.wall_plane(i)).collect(),
            walls: vec![Vec::new(); sides],
        }
    }

    /// Add the crossings of `triangles` with every wall.
    ///
    /// Triangles running along the axis never cross a wall inside the hole
    /// and are skipped.
    pub fn collect(&mut self, triangles: &[Triangle]) {
        let axis = self.prism.axis();
        let sides = self.prism.sides();

        for triangle in triangles {
            if self.prism.is_parallel(triangle.plane()) {
                continue;
            }
            let Some(section) = self.prism.slice(triangle.plane(), &[]) else {
                continue;
            };

            let forward = triangle.normal().dot(&axis) > 0.0;
            let contour = triangle.contour();

            for i in 0..sides {
                let a = section[i];
                let b = section[(i + 1) % sides];
                let Some((t0, t1)) = clip_segment(&a, &b, contour) else {
                    continue;
                };
                let p0 = a + (b - a) * t0;
                let p1 = a + (b - a) * t1;
                if (p1 - p0).norm() <= EPSILON_2D {
                    continue;
                }

                let plane = &self.planes[i];
                let to_wall = |q: &Point2<f64>| {
                    plane.to_plane_space(&triangle.plane().to_world_space(q))
                };
                self.walls[i].push(WallSegment {
                    a: to_wall(&p0),
                    b: to_wall(&p1),
                    forward,
                });
            }
        }
    }

    pub fn segment_count(&self) -> usize {
        self.walls.iter().map(Vec::len).sum()
    }

    /// Inner-material wall triangles facing the axis
    pub fn build(&self) -> Vec<Triangle> {
        self.planes
            .par_iter()
            .zip(self.walls.par_iter())
            .flat_map_iter(|(plane, segments)| {
                let silhouette = sweep(segments, 0.0);
                Triangle::triangulate(plane, &silhouette, false)
                    .into_iter()
                    .map(|t| t.with_outer(false))
            })
            .collect()
    }
}

/// Reconstruct a wall silhouette from its segments.
///
/// `floor` is the lowest allowed baseline; shadows reach up to the larger of
/// `floor` and the highest segment point. Vertical segments cast no shadow.
/// Fewer than two segments cannot bound anything and give an empty region.
pub fn sweep(segments: &[WallSegment], floor: f64) -> Region2D {
    let segments: Vec<&WallSegment> = segments
        .iter()
        .filter(|s| (s.b.x - s.a.x).abs() > EPSILON_2D)
        .collect();
    if segments.len() < 2 {
        return Region2D::empty();
    }

    let baseline = segments
        .iter()
        .flat_map(|s| [s.a.y, s.b.y])
        .fold(floor, f64::max);

    let mut silhouette = Region2D::empty();
    for i in depth_order(&segments) {
        let s = segments[i];
        let shadow = Region2D::from_contour(&[
            s.a,
            s.b,
            Point2::new(s.b.x, baseline),
            Point2::new(s.a.x, baseline),
        ]);

        let step = if s.forward {
            bool2d::union(&silhouette, &shadow)
        } else {
            bool2d::difference(&silhouette, &shadow)
        };
        match step {
            Ok(region) => silhouette = region,
            Err(e) => {
                debug!(error = %e, "wall sweep failed, dropping wall");
                return Region2D::empty();
            }
        }
    }

    silhouette
}

/// Sweep order, deepest first.
///
/// Two segments are ordered only where their x-ranges overlap: the lower one
/// at the middle of the overlap comes first. The relation is not total, so
/// the order is a topological sort, ties going to input order. A cycle
/// (crossing segments) is broken by appending the rest in input order.
fn depth_order(segments: &[&WallSegment]) -> Vec<usize> {
    let n = segments.len();
    let mut after: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); n];
    let mut blockers = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            let (i_lo, i_hi) = segments[i].x_range();
            let (j_lo, j_hi) = segments[j].x_range();
            let lo = i_lo.max(j_lo);
            let hi = i_hi.min(j_hi);
            if hi - lo <= EPSILON_2D {
                continue;
            }

            let mid = (lo + hi) * 0.5;
            let yi = segments[i].y_at(mid);
            let yj = segments[j].y_at(mid);
            if yi < yj - EPSILON_2D {
                after[i].push(j);
                blockers[j] += 1;
            } else if yj < yi - EPSILON_2D {
                after[j].push(i);
                blockers[i] += 1;
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&i| blockers[i] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(n);
    let mut placed = vec![false; n];

    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        placed[i] = true;
        for &j in &after[i] {
            blockers[j] -= 1;
            if blockers[j] == 0 {
                ready.push(Reverse(j));
            }
        }
    }

    if order.len() < n {
        debug!(
            unordered = n - order.len(),
            "crossing wall segments, sweep order is approximate"
        );
        order.extend((0..n).filter(|&i| !placed[i]));
    }

    order
}

/// Inner walls for a generic convex volume, one per face.
///
/// Each face gets a frame turned so that its x axis follows the dominant
/// direction of the crossings; the silhouette is clipped to the face and
/// faces into the volume.
pub fn volume_walls(affected: &[Triangle], volume: &Volume) -> Vec<Triangle> {
    volume
        .faces()
        .par_iter()
        .flat_map_iter(|face| face_wall(affected, face))
        .collect()
}

fn face_wall(affected: &[Triangle], face: &Face) -> Vec<Triangle> {
    // Crossings in the face's own frame
    let crossings: Vec<(Point2<f64>, Point2<f64>, &Triangle)> = affected
        .iter()
        .filter(|t| !t.plane().is_parallel(face.plane()))
        .filter_map(|t| match t.face().slice(face.plane()) {
            Slice2D::Segment(a, b) => Some((a, b, t)),
            _ => None,
        })
        .collect();
    if crossings.len() < 2 {
        return Vec::new();
    }

    let frame = face.plane().spun(dominant_angle(
        crossings.iter().map(|(a, b, _)| (*a, *b)),
    ));
    let outline = face.contour_in(&frame);
    let Some((min, max)) = contour_bounds(&outline) else {
        return Vec::new();
    };

    let to_frame = |q: &Point2<f64>| frame.to_plane_space(&face.plane().to_world_space(q));
    let segments: Vec<WallSegment> = crossings
        .iter()
        .filter_map(|(a, b, t)| {
            let (a, b) = clip_to_x_range(to_frame(a), to_frame(b), min.x, max.x)?;
            Some(WallSegment {
                a,
                b,
                forward: t.normal().dot(&frame.unit_y()) < 0.0,
            })
        })
        .collect();

    let silhouette = sweep(&segments, max.y);
    match bool2d::intersection(&silhouette, &Region2D::from_contour(&outline)) {
        Ok(wall) => Triangle::triangulate(&frame, &wall, true)
            .into_iter()
            .map(|t| t.with_outer(false))
            .collect(),
        Err(e) => {
            debug!(error = %e, "failed to clip volume wall to its face");
            Vec::new()
        }
    }
}

/// Mean direction of undirected segments, by doubled-angle averaging
fn dominant_angle(segments: impl Iterator<Item = (Point2<f64>, Point2<f64>)>) -> f64 {
    let (mut sx, mut sy) = (0.0, 0.0);
    for (a, b) in segments {
        let d = b - a;
        let len = d.norm();
        if len <= EPSILON_2D {
            continue;
        }
        let phi = d.y.atan2(d.x) * 2.0;
        sx += len * phi.cos();
        sy += len * phi.sin();
    }
    sy.atan2(sx) * 0.5
}

fn clip_to_x_range(
    a: Point2<f64>,
    b: Point2<f64>,
    lo: f64,
    hi: f64,
) -> Option<(Point2<f64>, Point2<f64>)> {
    let (a, b) = if a.x <= b.x { (a, b) } else { (b, a) };
    if b.x - a.x <= EPSILON_2D || b.x <= lo || a.x >= hi {
        return None;
    }

    let at = |x: f64| {
        let t = (x - a.x) / (b.x - a.x);
        a + (b - a) * t
    };
    let start = if a.x < lo { at(lo) } else { a };
    let end = if b.x > hi { at(hi) } else { b };
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    fn seg(ax: f64, ay: f64, bx: f64, by: f64, forward: bool) -> WallSegment {
        WallSegment {
            a: Point2::new(ax, ay),
            b: Point2::new(bx, by),
            forward,
        }
    }

    #[test]
    fn test_sweep_between_two_sheets() {
        // Near side at -1, far side at -3
        let segments = [seg(0.0, -1.0, 2.0, -1.0, false), seg(0.0, -3.0, 2.0, -3.0, true)];
        let wall = sweep(&segments, 0.0);
        assert!((wall.area() - 4.0).abs() < 1e-9);
        assert!(wall.contains_point(&Point2::new(1.0, -2.0)));
        assert!(!wall.contains_point(&Point2::new(1.0, -0.5)));
    }

    #[test]
    fn test_sweep_two_layers() {
        let segments = [
            seg(0.0, -1.0, 1.0, -1.0, false),
            seg(0.0, -2.0, 1.0, -2.0, true),
            seg(0.0, -3.0, 1.0, -3.0, false),
            seg(0.0, -4.0, 1.0, -4.0, true),
        ];
        let wall = sweep(&segments, 0.0);
        assert!((wall.area() - 2.0).abs() < 1e-9);
        assert!(!wall.contains_point(&Point2::new(0.5, -2.5)));
    }

    #[test]
    fn test_sweep_partial_overlap() {
        // A far sheet under only half of the near sheet
        let segments = [seg(0.0, -1.0, 2.0, -1.0, false), seg(1.0, -2.0, 2.0, -2.0, true)];
        let wall = sweep(&segments, 0.0);
        assert!((wall.area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sweep_needs_two_segments() {
        assert!(sweep(&[seg(0.0, -1.0, 1.0, -1.0, true)], 0.0).is_empty());
        // Vertical segments do not count
        let segments = [seg(0.0, -1.0, 1.0, -1.0, true), seg(0.5, -1.0, 0.5, -2.0, false)];
        assert!(sweep(&segments, 0.0).is_empty());
    }

    #[test]
    fn test_depth_order_is_topological() {
        let a = seg(0.0, -1.0, 1.0, -1.0, false);
        let b = seg(2.0, -5.0, 3.0, -5.0, true);
        let c = seg(0.0, -2.0, 3.0, -2.0, true);
        let order = depth_order(&[&a, &b, &c]);
        // c is below a and above b; a and b never overlap
        let pos = |i: usize| order.iter().position(|&k| k == i).unwrap();
        assert!(pos(2) < pos(0));
        assert!(pos(1) < pos(2));
    }

    #[test]
    fn test_depth_order_breaks_cycle() {
        // a is below b, b below c, and c (steep, crossing both) below a
        let a = seg(0.0, -1.0, 2.0, -1.0, false);
        let b = seg(1.0, 0.0, 3.0, 0.0, true);
        let c = seg(0.0, -5.0, 3.0, 4.0, true);
        assert_eq!(depth_order(&[&a, &b, &c]), vec![0, 1, 2]);

        let wall = sweep(&[a, b, c], 5.0);
        assert!(wall.area().is_finite());
    }

    #[test]
    fn test_sweep_crossing_pair() {
        let up = seg(0.0, -3.0, 2.0, -1.0, true);
        let down = seg(0.0, -1.0, 2.0, -3.0, false);
        let order = depth_order(&[&up, &down]);
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1]);

        let wall = sweep(&[up, down], 0.0);
        assert!(wall.area().is_finite());
        assert!(wall.area() <= 2.0 * 3.0);
    }

    #[test]
    fn test_collector_builds_tube() {
        let prism = Prism::new(Point3::new(0.0, 0.0, 1.0), -Vector3::z(), 0.5, 6).unwrap();
        let top = Triangle::new(
            Point3::new(-2.0, -2.0, 0.0),
            Point3::new(2.0, -2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        )
        .unwrap();
        let bottom = Triangle::new(
            Point3::new(-2.0, -2.0, -0.5),
            Point3::new(0.0, 2.0, -0.5),
            Point3::new(2.0, -2.0, -0.5),
        )
        .unwrap();

        let mut collector = WallCollector::new(&prism);
        collector.collect(&[top, bottom]);
        assert_eq!(collector.segment_count(), 12);

        let walls = collector.build();
        let area: f64 = walls.iter().map(Triangle::area).sum();
        // Hexagon side equals the radius
        assert!((area - 6.0 * 0.5 * 0.5).abs() < 1e-6);
        assert!(walls.iter().all(|t| !t.is_outer()));
    }

    #[test]
    fn test_dominant_angle() {
        let segs = [
            (Point2::new(0.0, 0.0), Point2::new(0.0, 1.0)),
            (Point2::new(0.0, 1.0), Point2::new(0.0, 0.0)),
        ];
        let angle = dominant_angle(segs.into_iter());
        assert!((angle.abs() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }
}
