//! Generic, arena-backed 8-way spatial partition used for locality queries.
//!
//! Nodes live in a flat `Vec` and refer to each other by index, so the
//! parent back-reference costs nothing to tear down. The tree is a build-time
//! index: welding constructs one, consumes it, and drops it on return.
//!
//! Two content-distribution paths exist. The default
//! [`distribute_contents`](Octree::distribute_contents) assigns each item to
//! exactly one child by comparing its representative point against the node
//! midpoint per axis. [`distribute_contents_by_intersection`](Octree::distribute_contents_by_intersection)
//! instead duplicates an item into every child whose volume it intersects,
//! which matters for faces that straddle a split plane (see DESIGN.md).

use crate::bounding::Aabb;
use crate::float_types::Real;
use nalgebra::{Point3, Vector3};

/// Anything that can be placed into an [`Octree`].
///
/// Point-like contents (vertices) only need [`representative_point`]; extended
/// contents (faces) additionally override [`bounding_box`] and [`plane`] so
/// the intersection-aware distribution path can test them against node
/// volumes rather than merely their centers.
///
/// [`representative_point`]: OctreeContent::representative_point
/// [`bounding_box`]: OctreeContent::bounding_box
/// [`plane`]: OctreeContent::plane
pub trait OctreeContent {
    fn representative_point(&self) -> Point3<Real>;

    fn bounding_box(&self) -> Aabb {
        let p = self.representative_point();
        Aabb::new(p, p)
    }

    /// Supporting plane `n · p = w`, when the content has one (faces).
    fn plane(&self) -> Option<(Vector3<Real>, Real)> {
        None
    }
}

impl OctreeContent for Point3<Real> {
    fn representative_point(&self) -> Point3<Real> {
        *self
    }
}

/// Split limits shared by every node of a tree. Passed explicitly at
/// construction and propagated by value; children never carry their own copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeConfig {
    /// No node is created deeper than this.
    pub max_depth: u32,
    /// A cell splits only while it holds at least this many items.
    pub split_threshold: usize,
    /// A cell with its shortest edge below this never splits.
    pub min_cell_size: Real,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        OctreeConfig {
            max_depth: 10,
            split_threshold: 50,
            min_cell_size: 1.0,
        }
    }
}

/// One node of the arena: either a leaf holding contents, or an interior node
/// with exactly 8 children.
#[derive(Debug, Clone)]
pub struct OctreeNode<T> {
    pub bounds: Aabb,
    pub depth: u32,
    /// Grid coordinate of this cell at its depth: the root is `[0,0,0]`, each
    /// child doubles the parent coordinate and adds 0 or 1 per axis.
    pub coord: [u32; 3],
    pub parent: Option<usize>,
    pub children: Option<[usize; 8]>,
    pub contents: Vec<T>,
}

impl<T> OctreeNode<T> {
    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Octree<T> {
    nodes: Vec<OctreeNode<T>>,
    config: OctreeConfig,
}

impl<T: OctreeContent> Octree<T> {
    /// Index of the root node.
    pub const ROOT: usize = 0;

    pub fn new(bounds: Aabb, config: OctreeConfig) -> Self {
        Octree {
            nodes: vec![OctreeNode {
                bounds,
                depth: 0,
                coord: [0, 0, 0],
                parent: None,
                children: None,
                contents: Vec::new(),
            }],
            config,
        }
    }

    pub fn node(&self, id: usize) -> &OctreeNode<T> {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub const fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Place one item into the root's contents list.
    pub fn add_content(&mut self, item: T) {
        self.nodes[Self::ROOT].contents.push(item);
    }

    pub fn add_contents(&mut self, items: impl IntoIterator<Item = T>) {
        self.nodes[Self::ROOT].contents.extend(items);
    }

    /// Split `node` into 8 equal octants along its midplanes, in canonical
    /// child order (bit 0 → +x half, bit 1 → +y, bit 2 → +z).
    ///
    /// Each child's depth is the parent's plus one, and its grid coordinate is
    /// the parent's doubled plus the per-axis bit of its slot.
    pub fn create_children(&mut self, node: usize) -> [usize; 8] {
        debug_assert!(self.nodes[node].children.is_none(), "node already split");
        let bounds = self.nodes[node].bounds;
        let depth = self.nodes[node].depth;
        let coord = self.nodes[node].coord;

        let mut ids = [0usize; 8];
        for (slot, id) in ids.iter_mut().enumerate() {
            *id = self.nodes.len();
            self.nodes.push(OctreeNode {
                bounds: bounds.octant(slot),
                depth: depth + 1,
                coord: [
                    coord[0] * 2 + (slot as u32 & 1),
                    coord[1] * 2 + ((slot as u32 >> 1) & 1),
                    coord[2] * 2 + ((slot as u32 >> 2) & 1),
                ],
                parent: Some(node),
                children: None,
                contents: Vec::new(),
            });
        }
        self.nodes[node].children = Some(ids);
        ids
    }

    /// Move every content item of `node` into exactly one child, selected by
    /// three per-axis comparisons of the item's representative point against
    /// the node midpoint. No item is ever duplicated by this path.
    pub fn distribute_contents(&mut self, node: usize) {
        let Some(children) = self.nodes[node].children else {
            return;
        };
        let center = self.nodes[node].bounds.center();
        let items = std::mem::take(&mut self.nodes[node].contents);
        for item in items {
            let p = item.representative_point();
            let slot = usize::from(p.x >= center.x)
                | (usize::from(p.y >= center.y) << 1)
                | (usize::from(p.z >= center.z) << 2);
            self.nodes[children[slot]].contents.push(item);
        }
    }

    /// Does `item` overlap the volume of `bounds`?
    ///
    /// Combines a box/box test with a box/plane straddle test when the item
    /// exposes a supporting plane, so a thin face is not claimed by an octant
    /// its bounding box merely grazes.
    pub fn intersects(bounds: &Aabb, item: &T) -> bool {
        if !bounds.intersects(&item.bounding_box()) {
            return false;
        }
        match item.plane() {
            Some((normal, w)) => bounds.intersects_plane(&normal, w),
            None => true,
        }
    }

    /// Copy every content item of `node` into each child whose volume it
    /// intersects. An item straddling a midplane lands in several children;
    /// contrast with [`distribute_contents`](Self::distribute_contents).
    pub fn distribute_contents_by_intersection(&mut self, node: usize)
    where
        T: Clone,
    {
        let Some(children) = self.nodes[node].children else {
            return;
        };
        let items = std::mem::take(&mut self.nodes[node].contents);
        for item in items {
            for &child in &children {
                if Self::intersects(&self.nodes[child].bounds, &item) {
                    self.nodes[child].contents.push(item.clone());
                }
            }
        }
    }

    /// Recursively split cells holding at least the configured
    /// `split_threshold` items, until the depth limit or minimum cell size is
    /// reached.
    pub fn build_by_min_content_count(&mut self) {
        let threshold = self.config.split_threshold;
        let min_cell = self.config.min_cell_size;
        self.grow(|node| node.contents.len() >= threshold && node.bounds.min_extent() >= min_cell);
    }

    /// Recursively split non-empty cells until their shortest edge drops below
    /// `size` or the configured depth limit is reached.
    pub fn build_by_min_cell_size(&mut self, size: Real) {
        self.grow(|node| !node.contents.is_empty() && node.bounds.min_extent() >= size);
    }

    fn grow(&mut self, should_split: impl Fn(&OctreeNode<T>) -> bool) {
        let max_depth = self.config.max_depth;
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            if self.nodes[id].depth >= max_depth {
                continue;
            }
            if !should_split(&self.nodes[id]) {
                continue;
            }
            let children = self.create_children(id);
            self.distribute_contents(id);
            stack.extend(children);
        }
    }

    /// Pre-order walk collecting every node whose own contents list is
    /// non-empty. Once distribution has run, only leaves can hold contents, so
    /// in practice this returns leaves.
    pub fn nodes_with_contents(&self) -> Vec<usize> {
        let mut result = Vec::new();
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !node.contents.is_empty() {
                result.push(id);
            }
            if let Some(children) = node.children {
                // reversed so the walk visits child 0 first
                stack.extend(children.iter().rev());
            }
        }
        result
    }
}
