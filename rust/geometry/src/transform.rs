// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh placement transforms
//!
//! Holes are requested in world space but punched in the mesh's own space.
//! A [`MeshTransform`] carries the mesh's local-to-world matrix and maps hole
//! parameters the other way. Only uniform scale is supported: a radius cannot
//! be mapped through a non-uniform scale without distorting the hole.

use crate::error::{Error, Result};
use nalgebra::{Matrix3, Matrix4, Point3, UnitQuaternion, Vector3};

/// Relative tolerance when comparing axis scale factors
const SCALE_TOLERANCE: f64 = 1e-6;

/// Local-to-world placement of a mesh with uniform scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshTransform {
    matrix: Matrix4<f64>,
    inverse: Matrix4<f64>,
    scale: f64,
}

impl Default for MeshTransform {
    fn default() -> Self {
        Self {
            matrix: Matrix4::identity(),
            inverse: Matrix4::identity(),
            scale: 1.0,
        }
    }
}

impl MeshTransform {
    /// Wrap a local-to-world matrix, rejecting non-uniform scale
    pub fn new(matrix: Matrix4<f64>) -> Result<Self> {
        let linear: Matrix3<f64> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let sx = linear.column(0).norm();
        let sy = linear.column(1).norm();
        let sz = linear.column(2).norm();

        let scale = (sx + sy + sz) / 3.0;
        if !(scale > 0.0)
            || (sx - scale).abs() > scale * SCALE_TOLERANCE
            || (sy - scale).abs() > scale * SCALE_TOLERANCE
            || (sz - scale).abs() > scale * SCALE_TOLERANCE
        {
            return Err(Error::NonUniformScale {
                x: sx,
                y: sy,
                z: sz,
            });
        }

        let inverse = matrix.try_inverse().ok_or_else(|| {
            Error::DegenerateGeometry("Mesh transform is not invertible".to_string())
        })?;

        Ok(Self {
            matrix,
            inverse,
            scale,
        })
    }

    /// Build from translation, rotation and a uniform scale factor
    pub fn from_parts(
        translation: Vector3<f64>,
        rotation: UnitQuaternion<f64>,
        scale: f64,
    ) -> Result<Self> {
        let matrix = Matrix4::new_translation(&translation)
            * rotation.to_homogeneous()
            * Matrix4::new_scaling(scale);
        Self::new(matrix)
    }

    #[inline]
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn point_to_world_space(&self, p: &Point3<f64>) -> Point3<f64> {
        self.matrix.transform_point(p)
    }

    #[inline]
    pub fn point_to_mesh_space(&self, p: &Point3<f64>) -> Point3<f64> {
        self.inverse.transform_point(p)
    }

    /// Map a world direction into mesh space (unit length)
    #[inline]
    pub fn dir_to_mesh_space(&self, d: &Vector3<f64>) -> Vector3<f64> {
        self.inverse.transform_vector(d).normalize()
    }

    /// Map a world length into mesh space
    #[inline]
    pub fn scale_to_mesh_space(&self, length: f64) -> f64 {
        length / self.scale
    }
}
