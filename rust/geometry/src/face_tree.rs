// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial partition tree for incremental hole punching
//!
//! A binary space partition over axis-aligned boxes. Leaves own the part of
//! the mesh that falls in their box (triangles crossing a boundary are
//! cropped) plus render buffers built from it. A leaf splits in half along
//! its longest axis once it holds more than `leaf_capacity` triangles; boxes
//! at or below `atomic_volume` drop their geometry instead.
//!
//! Punching a hole only visits nodes the hole touches. A node entirely
//! inside the hole is collapsed to an empty leaf without looking at its
//! triangles.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]; slots of
//! collapsed subtrees are reused.

use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::hole_punch::{cut, partition, Partition, WallCollector, HOLE_SHRINK};
use crate::mesh::MaterialMeshes;
use crate::prism::Prism;
use crate::triangle::Triangle;
use crate::volume::Volume;
use tracing::{debug, trace};

/// Padding added around the mesh bounds for the root box
pub const ROOT_PADDING: f64 = 1e-4;

/// Tree tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeConfig {
    /// Triangle count above which a leaf splits
    pub leaf_capacity: usize,
    /// Box volume at or below which a node keeps no geometry
    pub atomic_volume: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            leaf_capacity: 50,
            atomic_volume: 1e-6,
        }
    }
}

impl TreeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.leaf_capacity == 0 {
            return Err(Error::InvalidConfig(
                "leaf_capacity must be at least 1".to_string(),
            ));
        }
        if !(self.atomic_volume > 0.0 && self.atomic_volume.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "atomic_volume must be positive, got {}",
                self.atomic_volume
            )));
        }
        Ok(())
    }
}

/// Index of a node in the tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Leaf {
        triangles: Vec<Triangle>,
        meshes: MaterialMeshes,
    },
    Internal {
        left: NodeId,
        right: NodeId,
    },
}

impl NodeKind {
    fn empty_leaf() -> Self {
        NodeKind::Leaf {
            triangles: Vec::new(),
            meshes: MaterialMeshes::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    bounds: Aabb,
    kind: NodeKind,
}

impl Node {
    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Triangles stored in this node (empty for internal nodes)
    pub fn triangles(&self) -> &[Triangle] {
        match &self.kind {
            NodeKind::Leaf { triangles, .. } => triangles,
            NodeKind::Internal { .. } => &[],
        }
    }
}

/// Split axis of a box: the longest extent, ties going to the later axis
fn split_axis(bounds: &Aabb) -> usize {
    let e = bounds.extent();
    let (x, y, z) = (e.x.abs(), e.y.abs(), e.z.abs());
    if x > y && x > z {
        0
    } else if y > z {
        1
    } else {
        2
    }
}

/// Halves of a box along `axis`
fn bisect(bounds: &Aabb, axis: usize) -> (Aabb, Aabb) {
    let mid = (bounds.min[axis] + bounds.max[axis]) * 0.5;
    let mut lower_max = bounds.max;
    lower_max[axis] = mid;
    let mut upper_min = bounds.min;
    upper_min[axis] = mid;
    (
        Aabb::new(bounds.min, lower_max),
        Aabb::new(upper_min, bounds.max),
    )
}

/// Binary space partition over a triangle mesh
#[derive(Debug, Clone)]
pub struct FaceTree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    root: NodeId,
    config: TreeConfig,
}

impl FaceTree {
    /// Create an empty tree over `bounds`
    pub fn new(bounds: Aabb, config: TreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            nodes: vec![Node {
                bounds,
                kind: NodeKind::empty_leaf(),
            }],
            free: Vec::new(),
            root: NodeId(0),
            config,
        })
    }

    /// Build a tree over the bounds of `triangles` and insert them
    pub fn from_triangles(triangles: Vec<Triangle>, config: TreeConfig) -> Result<Self> {
        let bounds = Aabb::from_points(triangles.iter().flat_map(|t| t.face().vertices()))
            .ok_or_else(|| Error::InvalidMesh("Cannot build a tree without triangles".to_string()))?;

        let mut tree = FaceTree::new(bounds.expanded(ROOT_PADDING), config)?;
        tree.set_vertices(&triangles)?;
        Ok(tree)
    }

    #[inline]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.nodes[self.root.0].bounds
    }

    #[inline]
    pub fn is_leaf_root(&self) -> bool {
        self.nodes[self.root.0].is_leaf()
    }

    /// Replace the tree's geometry with `triangles`
    pub fn set_vertices(&mut self, triangles: &[Triangle]) -> Result<()> {
        self.assign(self.root, triangles)
    }

    /// Add triangles to the leaves they fall in
    pub fn insert_triangles(&mut self, triangles: &[Triangle]) -> Result<()> {
        if triangles.is_empty() {
            return Ok(());
        }
        self.insert(self.root, triangles)
    }

    /// Punch a prism hole through the stored mesh.
    ///
    /// Only nodes the hole touches are visited. Walls are built once for the
    /// whole tree and inserted afterwards, so a tunnel crossing several
    /// leaves gets continuous walls.
    pub fn punch_hole(&mut self, prism: &Prism) -> Result<()> {
        let cutter = prism.shrunk(HOLE_SHRINK);
        let mut walls = WallCollector::new(prism);

        self.punch_node(self.root, &cutter, &mut walls)?;

        let wall_triangles = walls.build();
        debug!(
            segments = walls.segment_count(),
            triangles = wall_triangles.len(),
            "built hole walls"
        );
        self.insert_triangles(&wall_triangles)
    }

    /// Every stored triangle, leaves in depth-first order
    pub fn triangles(&self) -> Vec<Triangle> {
        self.leaves()
            .into_iter()
            .flat_map(|id| self.nodes[id.0].triangles().iter().cloned())
            .collect()
    }

    /// Render buffers of all leaves merged per material
    pub fn material_meshes(&self) -> MaterialMeshes {
        let mut merged = MaterialMeshes::default();
        for meshes in self.leaf_meshes() {
            merged.merge(meshes);
        }
        merged
    }

    /// Render buffers of the leaves holding geometry
    pub fn leaf_meshes(&self) -> Vec<&MaterialMeshes> {
        self.leaves()
            .into_iter()
            .filter_map(|id| match &self.nodes[id.0].kind {
                NodeKind::Leaf { meshes, .. } if !meshes.is_empty() => Some(meshes),
                _ => None,
            })
            .collect()
    }

    pub fn triangle_count(&self) -> usize {
        self.leaves()
            .into_iter()
            .map(|id| self.nodes[id.0].triangles().len())
            .sum()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// Number of nodes reachable from the root
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            count += 1;
            if let NodeKind::Internal { left, right } = self.nodes[id.0].kind {
                stack.push(right);
                stack.push(left);
            }
        }
        count
    }

    /// Edges on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let NodeKind::Internal { left, right } = self.nodes[id.0].kind {
                stack.push((right, depth + 1));
                stack.push((left, depth + 1));
            }
        }
        deepest
    }

    fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match self.nodes[id.0].kind {
                NodeKind::Leaf { .. } => leaves.push(id),
                NodeKind::Internal { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        leaves
    }

    #[inline]
    fn is_atomic(&self, bounds: &Aabb) -> bool {
        bounds.volume() <= self.config.atomic_volume
    }

    fn alloc(&mut self, bounds: Aabb) -> NodeId {
        let node = Node {
            bounds,
            kind: NodeKind::empty_leaf(),
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Return a subtree's slots to the free list
    fn release(&mut self, id: NodeId) {
        let kind = std::mem::replace(&mut self.nodes[id.0].kind, NodeKind::empty_leaf());
        if let NodeKind::Internal { left, right } = kind {
            self.release(left);
            self.release(right);
        }
        self.free.push(id);
    }

    /// Turn a node into an empty leaf, discarding its subtree
    fn collapse(&mut self, id: NodeId) {
        let kind = std::mem::replace(&mut self.nodes[id.0].kind, NodeKind::empty_leaf());
        if let NodeKind::Internal { left, right } = kind {
            self.release(left);
            self.release(right);
        }
    }

    /// Store `triangles` in a leaf and rebuild its render buffers
    fn store(&mut self, id: NodeId, triangles: Vec<Triangle>) {
        let meshes = MaterialMeshes::from_triangles(&triangles);
        self.nodes[id.0].kind = NodeKind::Leaf { triangles, meshes };
    }

    fn take_triangles(&mut self, id: NodeId) -> Vec<Triangle> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Leaf { triangles, .. } => std::mem::take(triangles),
            NodeKind::Internal { .. } => Vec::new(),
        }
    }

    fn assign(&mut self, id: NodeId, triangles: &[Triangle]) -> Result<()> {
        let bounds = self.nodes[id.0].bounds;
        if self.is_atomic(&bounds) {
            self.collapse(id);
            return Ok(());
        }

        match self.nodes[id.0].kind {
            NodeKind::Internal { left, right } => {
                self.assign(left, triangles)?;
                self.assign(right, triangles)
            }
            NodeKind::Leaf { .. } => {
                let cropped = Volume::cuboid(&bounds)?.crop_triangles(triangles);
                self.store(id, cropped);
                self.split(id)
            }
        }
    }

    fn insert(&mut self, id: NodeId, triangles: &[Triangle]) -> Result<()> {
        let bounds = self.nodes[id.0].bounds;
        if self.is_atomic(&bounds) || !triangles.iter().any(|t| bounds.intersects(t.bounds())) {
            return Ok(());
        }

        match self.nodes[id.0].kind {
            NodeKind::Internal { left, right } => {
                self.insert(left, triangles)?;
                self.insert(right, triangles)
            }
            NodeKind::Leaf { .. } => {
                let cropped = Volume::cuboid(&bounds)?.crop_triangles(triangles);
                if cropped.is_empty() {
                    return Ok(());
                }
                let mut stored = self.take_triangles(id);
                stored.extend(cropped);
                self.store(id, stored);
                self.split(id)
            }
        }
    }

    fn split(&mut self, id: NodeId) -> Result<()> {
        let node = &self.nodes[id.0];
        let NodeKind::Leaf { triangles, .. } = &node.kind else {
            return Ok(());
        };
        if triangles.len() <= self.config.leaf_capacity {
            return Ok(());
        }

        let bounds = node.bounds;
        let axis = split_axis(&bounds);
        let (lower, upper) = bisect(&bounds, axis);
        trace!(
            node = id.0,
            axis,
            triangles = triangles.len(),
            "splitting leaf"
        );

        let triangles = self.take_triangles(id);
        let left = self.alloc(lower);
        let right = self.alloc(upper);
        self.nodes[id.0].kind = NodeKind::Internal { left, right };

        self.assign(left, &triangles)?;
        self.assign(right, &triangles)
    }

    fn punch_node(&mut self, id: NodeId, cutter: &Prism, walls: &mut WallCollector) -> Result<()> {
        let bounds = self.nodes[id.0].bounds;
        if !cutter.may_touch(&bounds) {
            return Ok(());
        }

        let cell = Volume::cuboid(&bounds)?;
        if !cell.intersects_prism(cutter) {
            trace!(node = id.0, "hole misses node");
            return Ok(());
        }
        if cell.inside_prism(cutter) {
            debug!(node = id.0, "collapsing node inside hole");
            self.collapse(id);
            return Ok(());
        }

        if let NodeKind::Internal { left, right } = self.nodes[id.0].kind {
            self.punch_node(left, cutter, walls)?;
            return self.punch_node(right, cutter, walls);
        }

        let triangles = self.take_triangles(id);
        if triangles.is_empty() {
            return Ok(());
        }

        let Partition {
            affected,
            unaffected,
        } = partition(triangles, cutter);
        if affected.is_empty() {
            if let NodeKind::Leaf { triangles, .. } = &mut self.nodes[id.0].kind {
                *triangles = unaffected;
            }
            return Ok(());
        }

        walls.collect(&affected);
        let mut result = cut(&affected, cutter);
        result.extend(unaffected);
        self.store(id, result);
        self.split(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    fn cube_triangles() -> Vec<Triangle> {
        Volume::cube(Point3::new(-0.5, -0.5, -0.5), 1.0)
            .unwrap()
            .triangles()
    }

    /// `n` x `n` grid of unit cells in the plane z = 0
    fn grid(n: usize) -> Vec<Triangle> {
        let mut triangles = Vec::new();
        for i in 0..n {
            for j in 0..n {
                let (x, y) = (i as f64, j as f64);
                let p = |dx: f64, dy: f64| Point3::new(x + dx, y + dy, 0.0);
                triangles.push(Triangle::new(p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)).unwrap());
                triangles.push(Triangle::new(p(0.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)).unwrap());
            }
        }
        triangles
    }

    fn total_area(triangles: &[Triangle]) -> f64 {
        triangles.iter().map(Triangle::area).sum()
    }

    #[test]
    fn test_config_validation() {
        assert!(TreeConfig::default().validate().is_ok());
        let zero = TreeConfig {
            leaf_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(Error::InvalidConfig(_))));
        let negative = TreeConfig {
            atomic_volume: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_small_mesh_stays_single_leaf() {
        let tree = FaceTree::from_triangles(cube_triangles(), TreeConfig::default()).unwrap();
        assert!(tree.is_leaf_root());
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.triangles(), cube_triangles());
        assert_eq!(tree.material_meshes().outer.triangle_count(), 12);
    }

    #[test]
    fn test_split_halves_box_with_tie_break() {
        let config = TreeConfig {
            leaf_capacity: 11,
            ..Default::default()
        };
        let tree = FaceTree::from_triangles(cube_triangles(), config).unwrap();
        assert!(!tree.is_leaf_root());

        let root = tree.node(tree.root()).unwrap();
        let NodeKind::Internal { left, right } = *root.kind() else {
            panic!("root did not split");
        };
        let (left, right) = (tree.node(left).unwrap(), tree.node(right).unwrap());

        // Equal extents split along Z
        let half = root.bounds().extent().z * 0.5;
        assert!((left.bounds().extent().z - half).abs() < 1e-12);
        assert!((right.bounds().extent().z - half).abs() < 1e-12);
        assert_eq!(left.bounds().extent().x, root.bounds().extent().x);
        assert_eq!(left.bounds().max.z, right.bounds().min.z);

        // Cropping conserves area
        assert!((total_area(&tree.triangles()) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_split_prefers_longest_axis() {
        let bounds = Aabb::new(Point3::origin(), Point3::new(1.0, 3.0, 2.0));
        assert_eq!(split_axis(&bounds), 1);
        let (lower, upper) = bisect(&bounds, 1);
        assert_eq!(lower.max.y, 1.5);
        assert_eq!(upper.min.y, 1.5);
        assert_eq!(split_axis(&Aabb::new(Point3::origin(), Point3::new(2.0, 2.0, 1.0))), 1);
    }

    #[test]
    fn test_atomic_nodes_drop_geometry() {
        let config = TreeConfig {
            leaf_capacity: 50,
            atomic_volume: 10.0,
        };
        let tree = FaceTree::from_triangles(cube_triangles(), config).unwrap();
        assert!(tree.triangles().is_empty());
        assert!(tree.leaf_meshes().is_empty());
    }

    #[test]
    fn test_collapsed_slots_are_reused() {
        let config = TreeConfig {
            leaf_capacity: 8,
            ..Default::default()
        };
        let mut tree = FaceTree::from_triangles(grid(4), config).unwrap();
        assert_eq!(tree.leaf_count(), 4);
        assert_eq!(tree.node_count(), 7);

        tree.collapse(tree.root());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.free.len(), 6);

        tree.set_vertices(&grid(4)).unwrap();
        assert_eq!(tree.node_count(), 7);
        assert_eq!(tree.nodes.len(), 7);
        assert!((total_area(&tree.triangles()) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_punch_collapses_covered_leaf() {
        let config = TreeConfig {
            leaf_capacity: 8,
            ..Default::default()
        };
        let mut tree = FaceTree::from_triangles(grid(4), config).unwrap();
        let hole = Prism::new(Point3::new(1.0, 1.0, 5.0), -Vector3::z(), 2.0, 8).unwrap();
        tree.punch_hole(&hole).unwrap();

        let covered = tree
            .leaves()
            .into_iter()
            .map(|id| tree.node(id).unwrap())
            .find(|n| n.bounds().contains_point(&Point3::new(1.0, 1.0, 0.0)))
            .unwrap();
        assert!(covered.triangles().is_empty());

        let shrunk = hole.shrunk(HOLE_SHRINK);
        assert!(tree
            .triangles()
            .iter()
            .all(|t| !shrunk.contains_point(&t.centroid())));
        // A single sheet has no walls
        assert!(tree.triangles().iter().all(Triangle::is_outer));
    }

    #[test]
    fn test_insert_triangles_lands_in_leaves() {
        let config = TreeConfig {
            leaf_capacity: 8,
            ..Default::default()
        };
        let mut tree = FaceTree::from_triangles(grid(4), config).unwrap();
        let extra = Triangle::new(
            Point3::new(1.5, 1.5, 0.0),
            Point3::new(2.5, 1.5, 0.0),
            Point3::new(1.5, 2.5, 0.0),
        )
        .unwrap()
        .with_outer(false);

        tree.insert_triangles(&[extra.clone()]).unwrap();
        let inner: f64 = tree
            .triangles()
            .iter()
            .filter(|t| !t.is_outer())
            .map(Triangle::area)
            .sum();
        assert!((inner - extra.area()).abs() < 1e-6);
    }

    #[test]
    fn test_empty_mesh_rejected() {
        assert!(matches!(
            FaceTree::from_triangles(Vec::new(), TreeConfig::default()),
            Err(Error::InvalidMesh(_))
        ));
    }
}
