//! Bounding Volume Hierarchy (BVH) over an indexed triangle set.
//!
//! Nodes live in a flat array and refer to their children by index. Leaves
//! own a contiguous range of the sorted triangle-index array, so every
//! triangle belongs to exactly one leaf.
//!
//! Splits are chosen with a full-sweep surface area heuristic: for each axis
//! the triangles are sorted by centroid and every split position is costed as
//! `area_left * n_left + area_right * n_right`. When no position beats the
//! others, or none beats keeping the range whole, the range is cut at its
//! median so the tree stays balanced.

use glint_math::{BoundingBox, DVec3, Ray};
use log::info;
use std::time::Instant;

/// Ranges of at most this many triangles always become leaves.
pub const LEAF_SIZE: usize = 4;

/// Ranges of at most this many triangles become leaves when splitting does not pay off.
pub const MAX_LEAF_SIZE: usize = 16;

/// Padding added to triangle boxes so that flat triangles keep a volume.
const BOX_PADDING: f64 = 1e-6;

/// Relative difference below which two split costs count as equal.
const COST_TOLERANCE: f64 = 1e-9;

/// What a node points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeContent {
    /// Indices of the two children in the node array.
    Internal { left: u32, right: u32 },
    /// Range `start..end` into the sorted triangle-index array.
    Leaf { start: u32, end: u32 },
}

/// BVH node - a box and either two children or a range of triangles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    pub bbox: BoundingBox,
    pub content: NodeContent,
}

impl BvhNode {
    fn leaf(bbox: BoundingBox, start: usize, end: usize) -> Self {
        Self {
            bbox,
            content: NodeContent::Leaf {
                start: start as u32,
                end: end as u32,
            },
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.content, NodeContent::Leaf { .. })
    }
}

/// Reusable traversal state.
///
/// Owned by the caller, so any number of threads can query one BVH at once.
#[derive(Debug, Default, Clone)]
pub struct TraversalScratch {
    stack: Vec<u32>,
    candidates: Vec<u32>,
}

impl TraversalScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn clear(&mut self) {
        self.stack.clear();
        self.candidates.clear();
    }
}

/// A pending range during construction.
struct BuildTask {
    node: usize,
    start: usize,
    end: usize,
    depth: usize,
}

/// Best split found for a range.
struct Split {
    axis: usize,
    /// Number of triangles going left
    position: usize,
    cost: f64,
    /// Every candidate position costs the same
    uniform: bool,
}

/// Working buffers shared by every step of a build.
struct Builder<'a> {
    boxes: &'a [BoundingBox],
    centroids: &'a [DVec3],
    left_areas: Vec<f64>,
    right_areas: Vec<f64>,
}

impl Builder<'_> {
    fn range_bounds(&self, indices: &[u32]) -> BoundingBox {
        indices.iter().fold(BoundingBox::EMPTY, |acc, &i| {
            BoundingBox::merged(&acc, &self.boxes[i as usize])
        })
    }

    fn sort_by_axis(&self, indices: &mut [u32], axis: usize) {
        let centroids = self.centroids;
        indices.sort_unstable_by(|&a, &b| {
            centroids[a as usize][axis]
                .total_cmp(&centroids[b as usize][axis])
                .then(a.cmp(&b))
        });
    }

    /// Sweep all three axes and return the cheapest split.
    ///
    /// Ties keep the lowest axis, then the lowest position. Leaves `indices`
    /// sorted along the returned axis.
    fn best_split(&mut self, indices: &mut [u32]) -> Split {
        let count = indices.len();
        let mut best = Split {
            axis: 0,
            position: count / 2,
            cost: f64::INFINITY,
            uniform: true,
        };
        let mut worst_cost = f64::NEG_INFINITY;

        for axis in 0..3 {
            self.sort_by_axis(indices, axis);

            self.left_areas.clear();
            let mut acc = BoundingBox::EMPTY;
            for &i in indices.iter() {
                acc.merge(&self.boxes[i as usize]);
                self.left_areas.push(acc.compute_area());
            }

            self.right_areas.clear();
            self.right_areas.resize(count, 0.0);
            let mut acc = BoundingBox::EMPTY;
            for (k, &i) in indices.iter().enumerate().rev() {
                acc.merge(&self.boxes[i as usize]);
                self.right_areas[k] = acc.compute_area();
            }

            for position in 1..count {
                let cost = self.left_areas[position - 1] * position as f64
                    + self.right_areas[position] * (count - position) as f64;
                worst_cost = worst_cost.max(cost);
                if cost < best.cost {
                    best.axis = axis;
                    best.position = position;
                    best.cost = cost;
                }
            }
        }
        best.uniform = worst_cost - best.cost <= worst_cost.abs() * COST_TOLERANCE;

        if best.axis != 2 {
            self.sort_by_axis(indices, best.axis);
        }
        best
    }
}

/// Flat BVH over the triangles of one mesh.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    triangle_indices: Vec<u32>,
    depth: usize,
}

impl Default for Bvh {
    /// A BVH over nothing: a single empty leaf.
    fn default() -> Self {
        Self {
            nodes: vec![BvhNode::leaf(BoundingBox::EMPTY, 0, 0)],
            triangle_indices: Vec::new(),
            depth: 1,
        }
    }
}

impl Bvh {
    /// Build a BVH over `triangles`, which index into `positions`.
    ///
    /// Indices past the end of `positions` are ignored when computing boxes.
    pub fn build(positions: &[DVec3], triangles: &[[u32; 3]]) -> Self {
        let start_time = Instant::now();

        let boxes: Vec<BoundingBox> = triangles
            .iter()
            .map(|tri| {
                BoundingBox::from_points(tri.iter().filter_map(|&i| positions.get(i as usize).copied()))
                    .padded(BOX_PADDING)
            })
            .collect();
        let centroids: Vec<DVec3> = boxes.iter().map(|b| b.centroid()).collect();

        let mut triangle_indices: Vec<u32> = (0..triangles.len() as u32).collect();
        let mut builder = Builder {
            boxes: &boxes,
            centroids: &centroids,
            left_areas: Vec::with_capacity(triangles.len()),
            right_areas: Vec::with_capacity(triangles.len()),
        };

        let placeholder = BvhNode::leaf(BoundingBox::EMPTY, 0, 0);
        let mut nodes = vec![placeholder];
        let mut depth = 1;
        let mut stack = vec![BuildTask {
            node: 0,
            start: 0,
            end: triangles.len(),
            depth: 1,
        }];

        while let Some(task) = stack.pop() {
            depth = depth.max(task.depth);
            let range = &mut triangle_indices[task.start..task.end];
            let bbox = builder.range_bounds(range);
            let count = range.len();

            if count <= LEAF_SIZE {
                nodes[task.node] = BvhNode::leaf(bbox, task.start, task.end);
                continue;
            }

            let split = builder.best_split(range);
            let leaf_cost = bbox.compute_area() * count as f64;
            let pays_off = split.cost < leaf_cost * (1.0 - COST_TOLERANCE);
            if count <= MAX_LEAF_SIZE && !pays_off {
                nodes[task.node] = BvhNode::leaf(bbox, task.start, task.end);
                continue;
            }

            // Range is sorted along split.axis, so the median is a valid cut
            let position = if pays_off && !split.uniform {
                split.position
            } else {
                count / 2
            };

            let left = nodes.len();
            let right = left + 1;
            nodes.push(placeholder);
            nodes.push(placeholder);
            nodes[task.node] = BvhNode {
                bbox,
                content: NodeContent::Internal {
                    left: left as u32,
                    right: right as u32,
                },
            };

            let mid = task.start + position;
            stack.push(BuildTask {
                node: right,
                start: mid,
                end: task.end,
                depth: task.depth + 1,
            });
            stack.push(BuildTask {
                node: left,
                start: task.start,
                end: mid,
                depth: task.depth + 1,
            });
        }

        let bvh = Self {
            nodes,
            triangle_indices,
            depth,
        };
        info!(
            "Built BVH: {} triangles, {} nodes, {} leaves, depth {} in {:.2?}",
            bvh.triangle_count(),
            bvh.node_count(),
            bvh.leaf_count(),
            bvh.depth(),
            start_time.elapsed()
        );
        bvh
    }

    /// Triangles whose leaf boxes the ray passes through within `(0, max_lambda)`.
    ///
    /// A conservative superset of the triangles the ray actually hits.
    pub fn intersect_bounding_boxes(&self, ray: &Ray, max_lambda: f64) -> Vec<u32> {
        let mut scratch = TraversalScratch::new();
        self.collect_candidates(ray, max_lambda, &mut scratch);
        scratch.candidates
    }

    /// Like [`Bvh::intersect_bounding_boxes`], reusing the buffers in `scratch`.
    pub fn collect_candidates<'s>(
        &self,
        ray: &Ray,
        max_lambda: f64,
        scratch: &'s mut TraversalScratch,
    ) -> &'s [u32] {
        scratch.clear();
        scratch.stack.push(0);

        while let Some(index) = scratch.stack.pop() {
            let node = &self.nodes[index as usize];
            if !node.bbox.any_intersection(ray, max_lambda) {
                continue;
            }
            match node.content {
                NodeContent::Internal { left, right } => {
                    scratch.stack.push(right);
                    scratch.stack.push(left);
                }
                NodeContent::Leaf { start, end } => {
                    scratch
                        .candidates
                        .extend_from_slice(&self.triangle_indices[start as usize..end as usize]);
                }
            }
        }

        &scratch.candidates
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Triangle indices in leaf order.
    pub fn triangle_indices(&self) -> &[u32] {
        &self.triangle_indices
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Number of levels, counting the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_indices.len()
    }

    /// Bounds of the whole tree.
    pub fn bounding_box(&self) -> BoundingBox {
        self.nodes[0].bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangle::intersect_triangle;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_point(rng: &mut StdRng, extent: f64) -> DVec3 {
        DVec3::new(
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
        )
    }

    /// Small triangles scattered through a cube.
    fn random_soup(rng: &mut StdRng, count: usize) -> (Vec<DVec3>, Vec<[u32; 3]>) {
        let mut positions = Vec::with_capacity(count * 3);
        let mut triangles = Vec::with_capacity(count);
        for t in 0..count as u32 {
            let center = random_point(rng, 5.0);
            for _ in 0..3 {
                positions.push(center + random_point(rng, 0.5));
            }
            triangles.push([3 * t, 3 * t + 1, 3 * t + 2]);
        }
        (positions, triangles)
    }

    fn random_ray(rng: &mut StdRng) -> Ray {
        let origin = random_point(rng, 8.0);
        let target = random_point(rng, 3.0);
        Ray::between(origin, target)
    }

    #[test]
    fn test_empty_bvh() {
        let bvh = Bvh::build(&[], &[]);
        assert_eq!(bvh.node_count(), 1);
        assert_eq!(bvh.leaf_count(), 1);
        assert_eq!(bvh.triangle_count(), 0);
        assert!(bvh.bounding_box().is_empty());

        let ray = Ray::new(DVec3::new(0.0, 0.0, -5.0), DVec3::Z);
        assert!(bvh.intersect_bounding_boxes(&ray, f64::INFINITY).is_empty());
    }

    #[test]
    fn test_small_set_is_single_leaf() {
        let (positions, triangles) = random_soup(&mut StdRng::seed_from_u64(1), LEAF_SIZE);
        let bvh = Bvh::build(&positions, &triangles);
        assert_eq!(bvh.node_count(), 1);
        assert!(bvh.nodes()[0].is_leaf());
        assert_eq!(bvh.depth(), 1);
    }

    #[test]
    fn test_leaves_partition_triangles() {
        let (positions, triangles) = random_soup(&mut StdRng::seed_from_u64(7), 500);
        let bvh = Bvh::build(&positions, &triangles);

        let mut seen = vec![0u32; triangles.len()];
        for node in bvh.nodes() {
            match node.content {
                NodeContent::Leaf { start, end } => {
                    assert!(end - start <= MAX_LEAF_SIZE as u32);
                    for &t in &bvh.triangle_indices()[start as usize..end as usize] {
                        seen[t as usize] += 1;
                        // Leaf box contains its triangles
                        for &v in &triangles[t as usize] {
                            assert!(node.bbox.contains_point(positions[v as usize]));
                        }
                    }
                }
                NodeContent::Internal { left, right } => {
                    for child in [left, right] {
                        let child_box = bvh.nodes()[child as usize].bbox;
                        assert!(node.bbox.contains_point(child_box.min));
                        assert!(node.bbox.contains_point(child_box.max));
                    }
                }
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
        assert!(bvh.leaf_count() > 1);
        assert!(bvh.depth() > 1);
    }

    #[test]
    fn test_candidates_superset_of_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        for count in [1, 5, 17, 100, 1000] {
            let (positions, triangles) = random_soup(&mut rng, count);
            let bvh = Bvh::build(&positions, &triangles);

            for _ in 0..200 {
                let ray = random_ray(&mut rng);
                let max_lambda = if rng.gen_bool(0.5) {
                    f64::INFINITY
                } else {
                    rng.gen_range(1.0..15.0)
                };

                let candidates = bvh.intersect_bounding_boxes(&ray, max_lambda);
                for (t, [i0, i1, i2]) in triangles.iter().enumerate() {
                    let hit = intersect_triangle(
                        positions[*i0 as usize],
                        positions[*i1 as usize],
                        positions[*i2 as usize],
                        &ray,
                        max_lambda,
                    );
                    if hit.is_some() {
                        assert!(
                            candidates.contains(&(t as u32)),
                            "triangle {t} hit but not a candidate ({count} triangles)"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_repeat_queries_are_deterministic() {
        let mut rng = StdRng::seed_from_u64(3);
        let (positions, triangles) = random_soup(&mut rng, 300);
        let bvh = Bvh::build(&positions, &triangles);

        let mut scratch = TraversalScratch::new();
        for _ in 0..50 {
            let ray = random_ray(&mut rng);
            let first = bvh.intersect_bounding_boxes(&ray, f64::INFINITY);
            let second = bvh.collect_candidates(&ray, f64::INFINITY, &mut scratch).to_vec();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let (positions, triangles) = random_soup(&mut StdRng::seed_from_u64(11), 200);
        let a = Bvh::build(&positions, &triangles);
        let b = Bvh::build(&positions, &triangles);
        assert_eq!(a.nodes(), b.nodes());
        assert_eq!(a.triangle_indices(), b.triangle_indices());
    }

    /// Check every triangle sits in exactly one leaf of at most `MAX_LEAF_SIZE`.
    fn assert_partition(bvh: &Bvh, triangle_count: usize) {
        let mut seen = vec![0u32; triangle_count];
        for node in bvh.nodes() {
            if let NodeContent::Leaf { start, end } = node.content {
                assert!(end - start <= MAX_LEAF_SIZE as u32);
                for &t in &bvh.triangle_indices()[start as usize..end as usize] {
                    seen[t as usize] += 1;
                }
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_identical_triangles_stay_balanced() {
        let positions = vec![DVec3::ZERO, DVec3::X, DVec3::Y];
        let triangles = vec![[0, 1, 2]; 2000];
        let bvh = Bvh::build(&positions, &triangles);

        assert_partition(&bvh, triangles.len());
        // 2000 halved down to at most 16 per leaf
        assert!(bvh.depth() <= 9, "depth {}", bvh.depth());
        assert!(bvh.leaf_count() >= 2000 / MAX_LEAF_SIZE);
    }

    #[test]
    fn test_split_separates_clusters() {
        // Two far apart clusters of 8 triangles each
        let mut positions = Vec::new();
        let mut triangles = Vec::new();
        for cluster in [-10.0, 10.0] {
            for k in 0..8 {
                let base = positions.len() as u32;
                let c = DVec3::new(cluster, k as f64 * 0.1, 0.0);
                positions.extend([c, c + DVec3::X * 0.05, c + DVec3::Y * 0.05]);
                triangles.push([base, base + 1, base + 2]);
            }
        }
        let bvh = Bvh::build(&positions, &triangles);

        let NodeContent::Internal { left, right } = bvh.nodes()[0].content else {
            panic!("root should be split");
        };
        assert!(bvh.nodes()[left as usize].bbox.max.x < 0.0);
        assert!(bvh.nodes()[right as usize].bbox.min.x > 0.0);

        // A ray through one cluster only reports that cluster
        let ray = Ray::new(DVec3::new(10.0, 0.3, 5.0), -DVec3::Z);
        let candidates = bvh.intersect_bounding_boxes(&ray, f64::INFINITY);
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|&t| t >= 8));
    }
}
