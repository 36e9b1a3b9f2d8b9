// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HolePunch Geometry
//!
//! Incremental perforation of triangle meshes by convex hole volumes.
//! Triangles are cut with 2D booleans (i_overlay) in their own planes,
//! re-triangulated with earcutr, and the tunnel walls are rebuilt from the
//! mesh/wall crossings. A [`FaceTree`] keeps large meshes editable by only
//! touching the leaves a hole reaches.

pub mod bool2d;
pub mod bounds;
pub mod error;
pub mod face;
pub mod face_tree;
pub mod hole_punch;
pub mod mesh;
pub mod plane;
pub mod prism;
pub mod source;
pub mod transform;
pub mod triangle;
pub mod triangulation;
pub mod volume;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, UnitQuaternion, Vector2, Vector3};

pub use bool2d::{Contour, Region2D};
pub use bounds::Aabb;
pub use error::{Error, Result};
pub use face::{Face, Slice2D};
pub use face_tree::{FaceTree, NodeId, TreeConfig};
pub use hole_punch::{punch_hole, punch_volume, WallCollector};
pub use mesh::{MaterialMeshes, Mesh};
pub use plane::{Line2D, Plane};
pub use prism::Prism;
pub use source::SourceMesh;
pub use transform::MeshTransform;
pub use triangle::Triangle;
pub use volume::{ConvexCutter, Volume};
