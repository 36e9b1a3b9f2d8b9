// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures
//!
//! Flat, renderer-ready buffers built from [`Triangle`] lists. The geometry
//! code works on triangles; buffers are derived on demand.

use crate::triangle::Triangle;
use nalgebra::{Point2, Point3, Vector3};
use rustc_hash::FxHashMap;

/// Quantization scale for vertex welding (micrometer precision)
const WELD_SCALE: f64 = 1e6;

type WeldKey = [i64; 8];

/// Triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Texture coordinates (u, v)
    pub uvs: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            uvs: Vec::with_capacity(vertex_count * 2),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Build an indexed mesh, welding vertices that share position, normal
    /// and texture coordinate
    pub fn from_triangles(triangles: &[Triangle]) -> Self {
        let mut mesh = Mesh::with_capacity(triangles.len() * 3, triangles.len() * 3);
        let mut welded: FxHashMap<WeldKey, u32> = FxHashMap::default();

        for triangle in triangles {
            let normal = triangle.normal();
            let uvs = triangle.uvs();
            let mut corner = [0u32; 3];

            for (slot, (position, uv)) in triangle.vertices().iter().zip(uvs.iter()).enumerate() {
                let key = weld_key(position, &normal, uv);
                corner[slot] = *welded.entry(key).or_insert_with(|| {
                    let index = mesh.vertex_count() as u32;
                    mesh.add_vertex(*position, normal, *uv);
                    index
                });
            }

            mesh.add_triangle(corner[0], corner[1], corner[2]);
        }

        mesh
    }

    /// Add a vertex with normal and texture coordinate
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>, uv: Point2<f64>) {
        self.positions.push(position.x as f32);
        self.positions.push(position.y as f32);
        self.positions.push(position.z as f32);

        self.normals.push(normal.x as f32);
        self.normals.push(normal.y as f32);
        self.normals.push(normal.z as f32);

        self.uvs.push(uv.x as f32);
        self.uvs.push(uv.y as f32);
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Merge another mesh into this one
    #[inline]
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }

        let vertex_offset = self.vertex_count() as u32;

        self.positions.reserve(other.positions.len());
        self.normals.reserve(other.normals.len());
        self.uvs.reserve(other.uvs.len());
        self.indices.reserve(other.indices.len());

        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Render buffers split by material
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialMeshes {
    /// Hole walls
    pub inner: Mesh,
    /// Original surface
    pub outer: Mesh,
}

impl MaterialMeshes {
    pub fn from_triangles(triangles: &[Triangle]) -> Self {
        let (outer, inner): (Vec<Triangle>, Vec<Triangle>) =
            triangles.iter().cloned().partition(Triangle::is_outer);

        Self {
            inner: Mesh::from_triangles(&inner),
            outer: Mesh::from_triangles(&outer),
        }
    }

    pub fn merge(&mut self, other: &MaterialMeshes) {
        self.inner.merge(&other.inner);
        self.outer.merge(&other.outer);
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.inner.triangle_count() + self.outer.triangle_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty() && self.outer.is_empty()
    }
}

fn weld_key(position: &Point3<f64>, normal: &Vector3<f64>, uv: &Point2<f64>) -> WeldKey {
    let q = |v: f64| (v * WELD_SCALE).round() as i64;
    [
        q(position.x),
        q(position.y),
        q(position.z),
        q(normal.x),
        q(normal.y),
        q(normal.z),
        q(uv.x),
        q(uv.y),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Vec<Triangle> {
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        vec![
            Triangle::new(p[0], p[1], p[2]).unwrap(),
            Triangle::new(p[0], p[2], p[3]).unwrap(),
        ]
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_add_vertex() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(
            Point3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 0.0, 1.0),
            Point2::new(0.25, 0.5),
        );
        assert_eq!(mesh.vertex_count(), 1);
        assert_eq!(mesh.positions, vec![1.0, 2.0, 3.0]);
        assert_eq!(mesh.normals, vec![0.0, 0.0, 1.0]);
        assert_eq!(mesh.uvs, vec![0.25, 0.5]);
    }

    #[test]
    fn test_merge() {
        let mut mesh1 = Mesh::new();
        mesh1.add_vertex(Point3::new(0.0, 0.0, 0.0), Vector3::z(), Point2::origin());
        mesh1.add_triangle(0, 0, 0);

        let mut mesh2 = Mesh::new();
        mesh2.add_vertex(Point3::new(1.0, 1.0, 1.0), Vector3::y(), Point2::origin());
        mesh2.add_triangle(0, 0, 0);

        mesh1.merge(&mesh2);
        assert_eq!(mesh1.vertex_count(), 2);
        assert_eq!(mesh1.triangle_count(), 2);
        assert_eq!(&mesh1.indices[3..], &[1, 1, 1]);
    }

    #[test]
    fn test_from_triangles_welds_shared_vertices() {
        let mesh = Mesh::from_triangles(&quad());
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.uvs.len(), 8);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_from_triangles_keeps_uv_seams() {
        let mut triangles = quad();
        triangles[1] = triangles[1]
            .clone()
            .with_uvs([Point2::new(0.5, 0.5); 3]);
        let mesh = Mesh::from_triangles(&triangles);
        assert_eq!(mesh.vertex_count(), 6);
    }

    #[test]
    fn test_material_split() {
        let mut triangles = quad();
        triangles[1] = triangles[1].clone().with_outer(false);

        let meshes = MaterialMeshes::from_triangles(&triangles);
        assert_eq!(meshes.outer.triangle_count(), 1);
        assert_eq!(meshes.inner.triangle_count(), 1);
        assert_eq!(meshes.triangle_count(), 2);

        let mut total = MaterialMeshes::default();
        assert!(total.is_empty());
        total.merge(&meshes);
        total.merge(&meshes);
        assert_eq!(total.triangle_count(), 4);
    }
}
