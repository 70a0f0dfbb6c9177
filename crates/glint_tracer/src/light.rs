//! Point lights and the default light rig.

use glint_math::{DVec3, safe_normalize};
use serde::{Deserialize, Serialize};

/// A point light with separate ambient, diffuse and specular colors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: DVec3,
    pub ambient: DVec3,
    pub diffuse: DVec3,
    pub specular: DVec3,
}

impl Light {
    pub fn new(position: DVec3, ambient: DVec3, diffuse: DVec3, specular: DVec3) -> Self {
        Self {
            position,
            ambient,
            diffuse,
            specular,
        }
    }
}

impl Default for Light {
    /// White light at the origin.
    fn default() -> Self {
        Self::new(DVec3::ZERO, DVec3::ONE, DVec3::ONE, DVec3::ONE)
    }
}

/// Colors of the three-light rig used when a scene brings no lights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightRig {
    pub ambient: DVec3,
    pub diffuse: DVec3,
    pub specular: DVec3,
}

impl Default for LightRig {
    fn default() -> Self {
        let c = DVec3::new(0.8, 0.65, 0.6);
        Self {
            ambient: c,
            diffuse: c,
            specular: c,
        }
    }
}

impl LightRig {
    /// Two warm key lights and a cool fill light.
    pub fn lights(&self) -> Vec<Light> {
        let warm = safe_normalize(DVec3::new(200.0, 170.0, 150.0));
        let cool = safe_normalize(DVec3::new(130.0, 160.0, 200.0));

        [
            (DVec3::new(5.0, 2.0, 6.0), warm),
            (DVec3::new(5.0, -7.0, 3.0), warm),
            (DVec3::new(-10.0, 4.0, 5.0), cool),
        ]
        .into_iter()
        .map(|(position, tint)| Light::new(position, self.ambient, self.diffuse * tint, self.specular))
        .collect()
    }
}
