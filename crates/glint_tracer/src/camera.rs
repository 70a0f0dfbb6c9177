//! Pinhole camera for primary rays.

use glint_math::{safe_normalize, DVec3, Ray};
use serde::{Deserialize, Serialize};

/// Where the camera sits and what it looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub look_from: DVec3,
    pub look_to: DVec3,
    pub look_up: DVec3,
    /// Field of view in degrees
    pub fov: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            look_from: DVec3::new(5.0, 0.0, 5.0),
            look_to: DVec3::ZERO,
            look_up: DVec3::Z,
            fov: 60.0,
        }
    }
}

impl CameraSettings {
    pub fn with_position(mut self, look_from: DVec3, look_to: DVec3, look_up: DVec3) -> Self {
        self.look_from = look_from;
        self.look_to = look_to;
        self.look_up = look_up;
        self
    }

    pub fn with_fov(mut self, fov: f64) -> Self {
        self.fov = fov;
        self
    }
}

/// Camera basis resolved against an image size.
///
/// The image plane sits one unit in front of the camera. The same field of
/// view is used horizontally and vertically, so non-square images stretch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    position: DVec3,
    forward: DVec3,
    /// Step between horizontally adjacent pixel centers
    right: DVec3,
    /// Step between vertically adjacent pixel centers
    up: DVec3,
    bottom_left_pixel_center: DVec3,
}

impl Camera {
    pub fn new(settings: &CameraSettings, width: u32, height: u32) -> Self {
        let position = settings.look_from;
        let forward = safe_normalize(settings.look_to - settings.look_from);
        let right = safe_normalize(forward.cross(settings.look_up));
        let up = safe_normalize(right.cross(forward));

        let half_extent = (settings.fov.to_radians() / 2.0).tan();
        let right = right * half_extent;
        let up = up * half_extent;

        let bottom_left = position + forward - right - up;

        let right = right * (2.0 / width.max(1) as f64);
        let up = up * (2.0 / height.max(1) as f64);

        Self {
            position,
            forward,
            right,
            up,
            bottom_left_pixel_center: bottom_left + 0.5 * (right + up),
        }
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn forward(&self) -> DVec3 {
        self.forward
    }

    /// Ray through the center of pixel `(i, j)`, with `j` counted from the bottom.
    pub fn ray_for_pixel(&self, i: u32, j: u32) -> Ray {
        let pixel_center = self.bottom_left_pixel_center + i as f64 * self.right + j as f64 * self.up;
        Ray::between(self.position, pixel_center)
    }
}
