// Re-export glam for convenience
pub use glam::*;

// glint math types
mod bounds;
mod ray;
mod transform;

pub use bounds::BoundingBox;
pub use ray::Ray;
pub use transform::DMat4Ext;

/// Tolerance used for degenerate lengths, parallel-ray tests and surface offsets.
///
/// The tracer works in double precision throughout.
pub const EPSILON: f64 = 1e-9;

/// Normalize `v`, returning the zero vector when its length is below [`EPSILON`].
///
/// Callers must tolerate a zero result downstream.
#[inline]
pub fn safe_normalize(v: DVec3) -> DVec3 {
    let len = v.length();
    if len > EPSILON {
        v / len
    } else {
        DVec3::ZERO
    }
}

/// Reflect `v` about the unit normal `n`.
#[inline]
pub fn reflect(v: DVec3, n: DVec3) -> DVec3 {
    v - 2.0 * v.dot(n) * n
}
