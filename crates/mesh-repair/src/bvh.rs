//! Static bounding volume hierarchy over mesh triangles.
//!
//! Built once, queried many times: box queries for candidate pairs and local
//! patches, ray queries for inside/outside tests.

use nalgebra::{Point3, Vector3};

use crate::types::{Mesh, Triangle};

const MAX_LEAF_SIZE: usize = 8;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// An inverted box that any `grow` call replaces.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    /// Box spanning two corners.
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Bounds of a triangle.
    pub fn from_triangle(tri: &Triangle) -> Self {
        let (min, max) = tri.bounds();
        Self { min, max }
    }

    /// Bounds of a mesh, `None` when it has no vertices.
    pub fn from_mesh(mesh: &Mesh) -> Option<Self> {
        mesh.bounds().map(|(min, max)| Self { min, max })
    }

    /// Whether `grow` was never called on an empty box.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow to include another box.
    pub fn grow(&mut self, other: &Aabb) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// The box inflated by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Closed-interval overlap test.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
            && self.min.z <= other.max.z
            && other.min.z <= self.max.z
    }

    /// Point containment (closed).
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (self.min.x..=self.max.x).contains(&p.x)
            && (self.min.y..=self.max.y).contains(&p.y)
            && (self.min.z..=self.max.z).contains(&p.z)
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn diagonal(&self) -> Vector3<f64> {
        self.max - self.min
    }

    fn longest_axis(&self) -> usize {
        let d = self.diagonal();
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// Slab test. `inv_dir` holds the component-wise reciprocal of the ray
    /// direction (infinite components are fine).
    fn hit_by_ray(&self, origin: &Point3<f64>, inv_dir: &Vector3<f64>) -> bool {
        let mut t_min = 0.0f64;
        let mut t_max = f64::INFINITY;
        for axis in 0..3 {
            let t1 = (self.min[axis] - origin[axis]) * inv_dir[axis];
            let t2 = (self.max[axis] - origin[axis]) * inv_dir[axis];
            // NaN appears when the origin lies on a slab plane of a parallel
            // axis; treat that slab as unbounded.
            let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            if !lo.is_nan() {
                t_min = t_min.max(lo);
            }
            if !hi.is_nan() {
                t_max = t_max.min(hi);
            }
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
struct Node {
    bbox: Aabb,
    /// Leaf: start into `order`. Internal: index of the right child (the left
    /// child always follows its parent).
    start_or_right: u32,
    /// Zero for internal nodes.
    count: u32,
}

/// A bounding volume hierarchy over the triangles of one mesh.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<Node>,
    order: Vec<u32>,
    boxes: Vec<Aabb>,
}

impl Bvh {
    /// Build over every face of `mesh`.
    pub fn build(mesh: &Mesh) -> Self {
        let triangles: Vec<Triangle> = mesh.triangles().collect();
        Self::from_triangles(&triangles)
    }

    /// Build over a slice of triangles; indices in query results refer to it.
    pub fn from_triangles(triangles: &[Triangle]) -> Self {
        let boxes: Vec<Aabb> = triangles.iter().map(Aabb::from_triangle).collect();
        let mut order: Vec<u32> = (0..boxes.len() as u32).collect();
        let mut nodes = Vec::with_capacity(2 * boxes.len() / MAX_LEAF_SIZE + 1);

        if !boxes.is_empty() {
            Self::build_recursive(&boxes, &mut order, 0, boxes.len(), &mut nodes);
        }

        Self {
            nodes,
            order,
            boxes,
        }
    }

    fn build_recursive(
        boxes: &[Aabb],
        order: &mut [u32],
        start: usize,
        end: usize,
        nodes: &mut Vec<Node>,
    ) -> usize {
        let mut bbox = Aabb::empty();
        for &i in &order[start..end] {
            bbox.grow(&boxes[i as usize]);
        }

        let node_idx = nodes.len();
        if end - start <= MAX_LEAF_SIZE {
            nodes.push(Node {
                bbox,
                start_or_right: start as u32,
                count: (end - start) as u32,
            });
            return node_idx;
        }

        nodes.push(Node {
            bbox,
            start_or_right: 0,
            count: 0,
        });

        // Median split along the longest axis of the node box.
        let axis = bbox.longest_axis();
        let mid = start + (end - start) / 2;
        order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
            let ca = boxes[a as usize].center()[axis];
            let cb = boxes[b as usize].center()[axis];
            ca.total_cmp(&cb)
        });

        Self::build_recursive(boxes, order, start, mid, nodes);
        let right = Self::build_recursive(boxes, order, mid, end, nodes);
        nodes[node_idx].start_or_right = right as u32;

        node_idx
    }

    /// Number of indexed triangles.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Bounds of everything indexed.
    pub fn bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|n| n.bbox)
    }

    /// Box of triangle `idx`.
    pub fn triangle_box(&self, idx: u32) -> &Aabb {
        &self.boxes[idx as usize]
    }

    /// Indices of the triangles whose boxes overlap `query`, ascending.
    pub fn query_box(&self, query: &Aabb) -> Vec<u32> {
        let mut hits = Vec::new();
        self.visit(
            |bbox| bbox.intersects(query),
            |idx| {
                if self.boxes[idx as usize].intersects(query) {
                    hits.push(idx);
                }
            },
        );
        hits.sort_unstable();
        hits
    }

    /// Call `f` with every triangle whose box the ray `origin + t * dir`,
    /// `t >= 0`, passes through.
    pub fn ray_candidates(&self, origin: &Point3<f64>, dir: &Vector3<f64>, mut f: impl FnMut(u32)) {
        let inv_dir = dir.map(|c| 1.0 / c);
        self.visit(
            |bbox| bbox.hit_by_ray(origin, &inv_dir),
            |idx| {
                if self.boxes[idx as usize].hit_by_ray(origin, &inv_dir) {
                    f(idx);
                }
            },
        );
    }

    fn visit(&self, mut descend: impl FnMut(&Aabb) -> bool, mut leaf: impl FnMut(u32)) {
        if self.nodes.is_empty() {
            return;
        }

        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !descend(&node.bbox) {
                continue;
            }
            if node.count > 0 {
                let start = node.start_or_right as usize;
                for &tri in &self.order[start..start + node.count as usize] {
                    leaf(tri);
                }
            } else {
                stack.push(node.start_or_right as usize);
                stack.push(idx + 1);
            }
        }
    }
}
