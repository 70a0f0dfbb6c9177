// Transform utilities for DMat4
//
// Extends glam::DMat4 with the operations mesh ingestion needs: a point
// transform with a full homogeneous divide and a normal matrix.

use glam::{DMat3, DMat4, DVec3};

/// Extension trait for DMat4 used when bringing mesh data into world space.
pub trait DMat4Ext {
    /// Transform a point with w=1 and divide by the resulting w.
    ///
    /// Unlike `transform_point3`, this also handles projective matrices.
    /// A resulting w of zero leaves the xyz components undivided.
    fn transform_point_homogeneous(&self, point: DVec3) -> DVec3;

    /// The inverse transpose of the upper-left 3x3 block, used for normals.
    fn normal_matrix(&self) -> DMat3;
}

impl DMat4Ext for DMat4 {
    fn transform_point_homogeneous(&self, point: DVec3) -> DVec3 {
        let p = *self * point.extend(1.0);
        if p.w != 0.0 {
            p.truncate() / p.w
        } else {
            p.truncate()
        }
    }

    fn normal_matrix(&self) -> DMat3 {
        DMat3::from_mat4(*self).inverse().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec4;

    #[test]
    fn test_homogeneous_identity() {
        let point = DVec3::new(1.0, 2.0, 3.0);
        assert_eq!(DMat4::IDENTITY.transform_point_homogeneous(point), point);
    }

    #[test]
    fn test_homogeneous_translation() {
        let mat = DMat4::from_translation(DVec3::new(10.0, 20.0, 30.0));
        let transformed = mat.transform_point_homogeneous(DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(transformed, DVec3::new(11.0, 22.0, 33.0));
    }

    #[test]
    fn test_homogeneous_divide() {
        // Scales w by 2, so every point is halved after the divide
        let mat = DMat4::from_cols(DVec4::X, DVec4::Y, DVec4::Z, DVec4::new(0.0, 0.0, 0.0, 2.0));
        let transformed = mat.transform_point_homogeneous(DVec3::new(2.0, 4.0, 6.0));
        assert!((transformed - DVec3::new(1.0, 2.0, 3.0)).length() < 1e-12);
    }

    #[test]
    fn test_normal_matrix_non_uniform_scale() {
        // Plane x + y = 0 has normal (1,1,0). Squash x by 2 and the surface
        // normal must tilt towards x, not towards y.
        let mat = DMat4::from_scale(DVec3::new(0.5, 1.0, 1.0));
        let n = (mat.normal_matrix() * DVec3::new(1.0, 1.0, 0.0)).normalize();

        // Tangent (1,-1,0) maps to (0.5,-1,0); the new normal must stay orthogonal
        let tangent = mat.transform_vector3(DVec3::new(1.0, -1.0, 0.0));
        assert!(n.dot(tangent).abs() < 1e-12);
        assert!(n.x > n.y);
    }

    #[test]
    fn test_normal_matrix_rotation() {
        use std::f64::consts::PI;

        let mat = DMat4::from_rotation_z(PI / 2.0);
        let n = mat.normal_matrix() * DVec3::X;

        assert!((n - DVec3::Y).length() < 1e-12);
    }
}
