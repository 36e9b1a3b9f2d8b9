// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Indexed source meshes
//!
//! Engines hand over vertex and index buffers; the punching code wants a
//! flat list of [`Triangle`]s. [`SourceMesh`] is that boundary.

use crate::error::{Error, Result};
use crate::triangle::Triangle;
use nalgebra::{Point2, Point3};
use tracing::debug;

/// An indexed triangle mesh in its own local space
#[derive(Debug, Clone, Default)]
pub struct SourceMesh {
    pub positions: Vec<Point3<f64>>,
    /// Per-vertex texture coordinates, parallel to `positions`
    pub uvs: Option<Vec<Point2<f64>>>,
    pub indices: Vec<u32>,
}

impl SourceMesh {
    pub fn new(positions: Vec<Point3<f64>>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            uvs: None,
            indices,
        }
    }

    pub fn with_uvs(mut self, uvs: Vec<Point2<f64>>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Convert to outer-material triangles.
    ///
    /// Degenerate triangles are skipped. Indices outside the vertex buffer
    /// and texture buffers of the wrong length are errors.
    pub fn to_triangles(&self) -> Result<Vec<Triangle>> {
        if self.indices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "Index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != self.positions.len() {
                return Err(Error::InvalidMesh(format!(
                    "Got {} texture coordinates for {} vertices",
                    uvs.len(),
                    self.positions.len()
                )));
            }
        }

        let vertex = |i: u32| -> Result<usize> {
            let i = i as usize;
            if i < self.positions.len() {
                Ok(i)
            } else {
                Err(Error::InvalidMesh(format!(
                    "Index {} out of range for {} vertices",
                    i,
                    self.positions.len()
                )))
            }
        };

        let mut triangles = Vec::with_capacity(self.indices.len() / 3);
        let mut skipped = 0usize;

        for chunk in self.indices.chunks_exact(3) {
            let [a, b, c] = [vertex(chunk[0])?, vertex(chunk[1])?, vertex(chunk[2])?];

            let triangle = match Triangle::new(self.positions[a], self.positions[b], self.positions[c])
            {
                Ok(t) => t,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };

            triangles.push(match &self.uvs {
                Some(uvs) => triangle.with_uvs([uvs[a], uvs[b], uvs[c]]),
                None => triangle,
            });
        }

        if skipped > 0 {
            debug!(skipped, "skipped degenerate source triangles");
        }

        Ok(triangles)
    }
}
