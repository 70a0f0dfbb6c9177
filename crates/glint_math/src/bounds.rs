use crate::{DVec3, Ray, EPSILON};

/// Axis-aligned bounding box for the BVH.
///
/// The empty box has `min = +inf` and `max = -inf` on every axis, so merging
/// anything into it yields that thing. Merging and expanding only ever grow a box.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    /// A box that contains nothing.
    pub const EMPTY: BoundingBox = BoundingBox {
        min: DVec3::INFINITY,
        max: DVec3::NEG_INFINITY,
    };

    /// A box that contains everything (used for unbounded shapes like planes).
    pub const UNIVERSE: BoundingBox = BoundingBox {
        min: DVec3::NEG_INFINITY,
        max: DVec3::INFINITY,
    };

    /// Create a box from its corners.
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Create the smallest box containing all `points`.
    pub fn from_points<I: IntoIterator<Item = DVec3>>(points: I) -> Self {
        let mut bbox = Self::EMPTY;
        for p in points {
            bbox.expand_by_point(p);
        }
        bbox
    }

    /// True if the box contains no point at all.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to include `point`.
    pub fn expand_by_point(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow the box to include `other`.
    pub fn merge(&mut self, other: &BoundingBox) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// The union of two boxes.
    pub fn merged(a: &BoundingBox, b: &BoundingBox) -> BoundingBox {
        let mut out = *a;
        out.merge(b);
        out
    }

    /// The box grown by `delta` on every side. Empty boxes stay empty.
    pub fn padded(&self, delta: f64) -> BoundingBox {
        if self.is_empty() {
            return *self;
        }
        BoundingBox::new(self.min - DVec3::splat(delta), self.max + DVec3::splat(delta))
    }

    /// Surface area of the box. Zero for an empty box.
    pub fn compute_area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let e = self.max - self.min;
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    /// Center of the box.
    pub fn centroid(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// True if `p` lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Slab test: does the ray pass through the box for some lambda in `(0, max_lambda)`?
    ///
    /// Axes where the direction is (nearly) zero are treated as parallel slabs:
    /// the ray is rejected if its origin lies outside that slab.
    pub fn any_intersection(&self, ray: &Ray, max_lambda: f64) -> bool {
        let origin = ray.origin();
        let direction = ray.direction();

        let mut t_enter = f64::NEG_INFINITY;
        let mut t_exit = f64::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < EPSILON {
                if o < lo || o > hi {
                    return false;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }

            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_exit < t_enter {
                return false;
            }
        }

        t_exit > 0.0 && t_enter < max_lambda
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}
