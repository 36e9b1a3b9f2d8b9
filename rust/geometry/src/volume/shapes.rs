// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face lists for the built-in volume shapes

use super::Volume;
use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::face::Face;
use nalgebra::{Point3, Vector3};

impl Volume {
    /// Axis-aligned box
    pub fn cuboid(bounds: &Aabb) -> Result<Volume> {
        let e = bounds.extent();
        if !(e.x > 0.0 && e.y > 0.0 && e.z > 0.0) {
            return Err(Error::InvalidVolume(format!(
                "Box extent must be positive, got ({}, {}, {})",
                e.x, e.y, e.z
            )));
        }

        let (a, b) = (bounds.min, bounds.max);
        let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);

        let quads = [
            // -X / +X
            [p(a.x, a.y, a.z), p(a.x, a.y, b.z), p(a.x, b.y, b.z), p(a.x, b.y, a.z)],
            [p(b.x, a.y, a.z), p(b.x, b.y, a.z), p(b.x, b.y, b.z), p(b.x, a.y, b.z)],
            // -Y / +Y
            [p(a.x, a.y, a.z), p(b.x, a.y, a.z), p(b.x, a.y, b.z), p(a.x, a.y, b.z)],
            [p(a.x, b.y, a.z), p(a.x, b.y, b.z), p(b.x, b.y, b.z), p(b.x, b.y, a.z)],
            // -Z / +Z
            [p(a.x, a.y, a.z), p(a.x, b.y, a.z), p(b.x, b.y, a.z), p(b.x, a.y, a.z)],
            [p(a.x, a.y, b.z), p(b.x, a.y, b.z), p(b.x, b.y, b.z), p(a.x, b.y, b.z)],
        ];

        let faces = quads
            .iter()
            .map(|q| Face::from_points(q))
            .collect::<Result<Vec<_>>>()?;

        Volume::from_faces(faces)
    }

    /// Cube with its minimum corner at `corner`
    pub fn cube(corner: Point3<f64>, size: f64) -> Result<Volume> {
        Volume::cuboid(&Aabb::new(
            corner,
            corner + Vector3::new(size, size, size),
        ))
    }

    /// Regular tetrahedron-like pyramid standing on the XZ plane at `position`.
    ///
    /// The base is an equilateral triangle of side `width`; the apex sits
    /// `height` above the base centroid.
    pub fn pyramid(position: Point3<f64>, width: f64, height: f64) -> Result<Volume> {
        if !(width > 0.0 && height > 0.0) {
            return Err(Error::InvalidVolume(format!(
                "Pyramid width and height must be positive, got {} and {}",
                width, height
            )));
        }

        let p0 = position;
        let p1 = position + Vector3::new(width, 0.0, 0.0);
        let p2 = position + Vector3::new(0.5, 0.0, 0.866_025_4) * width;
        let p3 = position
            + Vector3::new(0.5, 0.0, 0.288_675_1) * width
            + Vector3::new(0.0, height, 0.0);

        let faces = [[p0, p1, p2], [p0, p2, p3], [p0, p3, p1], [p1, p3, p2]]
            .iter()
            .map(|t| Face::from_points(t))
            .collect::<Result<Vec<_>>>()?;

        Volume::from_faces(faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plane::Plane;

    #[test]
    fn test_cuboid_bounds_and_faces() {
        let bounds = Aabb::new(Point3::new(-1.0, 0.0, 2.0), Point3::new(1.0, 3.0, 2.5));
        let volume = Volume::cuboid(&bounds).unwrap();
        assert_eq!(volume.faces().len(), 6);
        assert_eq!(*volume.bounds(), bounds);
        let area: f64 = volume.faces().iter().map(Face::area).sum();
        assert!((area - 2.0 * (6.0 + 1.0 + 1.5)).abs() < 1e-9);
    }

    #[test]
    fn test_cuboid_rejects_flat_box() {
        let flat = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 0.0));
        assert!(Volume::cuboid(&flat).is_err());
    }

    #[test]
    fn test_pyramid() {
        let pyramid = Volume::pyramid(Point3::origin(), 1.0, 1.0).unwrap();
        assert_eq!(pyramid.faces().len(), 4);

        let centroid = Point3::new(0.5, 0.25, 0.288_675_1);
        assert!(pyramid.contains_point(&centroid));
        assert!(!pyramid.contains_point(&Point3::new(0.5, 1.5, 0.3)));

        // Horizontal section halfway up is a smaller triangle
        let plane = Plane::new(Point3::new(0.0, 0.5, 0.0), Vector3::y());
        let section = pyramid.slice(&plane).unwrap();
        let base_area = 3f64.sqrt() / 4.0;
        let area = crate::bool2d::compute_signed_area(&section);
        assert!((area - base_area / 4.0).abs() < 1e-6);
    }
}
