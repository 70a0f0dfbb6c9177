//! Material system for ray tracing.
//!
//! Materials compute the light reflected towards the viewer at an
//! intersection. Visibility of the light is decided by the scene; a material
//! only ever sees lights that reach the surface.

use crate::intersection::RayIntersection;
use crate::light::Light;
use glint_math::{safe_normalize, DVec3, EPSILON};

/// Linear RGB color.
pub type Color = DVec3;

/// Shading behaviour shared by every material.
pub trait Shade {
    /// Base color used for ambient light.
    fn ambient_color(&self) -> Color;

    /// Fraction of light that is mirrored, in `[0, 1]`.
    fn reflectance(&self) -> f64;

    /// Direct contribution of `light`, assuming it is visible.
    fn shade(&self, intersection: &RayIntersection, light: &Light) -> Color;

    /// Ambient contribution of `light`, with inverse-square falloff.
    fn shade_ambient(&self, intersection: &RayIntersection, light: &Light) -> Color {
        let dist2 = (light.position - intersection.position)
            .length_squared()
            .max(EPSILON);
        self.ambient_color() * light.ambient / dist2
    }

    /// Tint applied to reflected light.
    fn absorption_spectrum(&self) -> Color {
        self.ambient_color()
    }
}

/// Scale `color` down so that no channel exceeds one.
fn normalize_spectrum(color: Color) -> Color {
    let max = color.max_element();
    if max > 1.0 {
        color / max
    } else {
        color
    }
}

fn clamp_color(color: Color) -> Color {
    color.max(DVec3::ZERO)
}

/// Unlit material that always shows its color.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantMaterial {
    color: Color,
}

impl ConstantMaterial {
    pub fn new(color: Color) -> Self {
        Self {
            color: clamp_color(color),
        }
    }
}

impl Default for ConstantMaterial {
    fn default() -> Self {
        Self::new(DVec3::new(0.0, 0.4, 0.8))
    }
}

impl Shade for ConstantMaterial {
    fn ambient_color(&self) -> Color {
        self.color
    }

    fn reflectance(&self) -> f64 {
        0.0
    }

    fn shade(&self, _intersection: &RayIntersection, _light: &Light) -> Color {
        self.color
    }

    fn shade_ambient(&self, _intersection: &RayIntersection, _light: &Light) -> Color {
        Color::ZERO
    }
}

/// Phong illumination with inverse-square light falloff.
#[derive(Debug, Clone, PartialEq)]
pub struct PhongMaterial {
    ambient: Color,
    diffuse: Color,
    specular: Color,
    reflectance: f64,
    shininess: f64,
}

impl PhongMaterial {
    pub fn new(ambient: Color, diffuse: Color, specular: Color, reflectance: f64, shininess: f64) -> Self {
        Self {
            ambient: clamp_color(ambient),
            diffuse: clamp_color(diffuse),
            specular: clamp_color(specular),
            reflectance: reflectance.clamp(0.0, 1.0),
            shininess: shininess.max(0.0),
        }
    }

    pub fn diffuse_color(&self) -> Color {
        self.diffuse
    }

    pub fn specular_color(&self) -> Color {
        self.specular
    }

    pub fn shininess(&self) -> f64 {
        self.shininess
    }
}

impl Default for PhongMaterial {
    fn default() -> Self {
        let c = DVec3::new(0.0, 0.4, 0.8);
        Self::new(c, c, c, 0.5, 10.0)
    }
}

impl Shade for PhongMaterial {
    fn ambient_color(&self) -> Color {
        self.ambient
    }

    fn reflectance(&self) -> f64 {
        self.reflectance
    }

    fn shade(&self, intersection: &RayIntersection, light: &Light) -> Color {
        let n = safe_normalize(intersection.normal);
        let to_light = light.position - intersection.position;
        let dist2 = to_light.length_squared().max(EPSILON);
        let l = safe_normalize(to_light);
        let v = intersection.ray.direction();
        let r = safe_normalize(l - 2.0 * n.dot(l) * n);

        let cos_nl = n.dot(l).max(0.0);
        let cos_rv = r.dot(v).max(0.0);

        let diffuse = cos_nl * self.diffuse * light.diffuse / dist2;
        let specular = cos_rv.powf(self.shininess) * self.specular * light.specular / dist2;
        diffuse + specular
    }

    fn absorption_spectrum(&self) -> Color {
        normalize_spectrum(self.diffuse + self.ambient)
    }
}

/// Cook-Torrance microfacet model with a Beckmann distribution and
/// Schlick's Fresnel approximation. Light does not fall off with distance.
#[derive(Debug, Clone, PartialEq)]
pub struct CookTorranceMaterial {
    albedo: Color,
    roughness: f64,
    ior: f64,
    ambient: Color,
    reflectance: f64,
}

impl CookTorranceMaterial {
    /// Roughness below this produces an unusably sharp highlight.
    const MIN_ROUGHNESS: f64 = 0.03;

    pub fn new(albedo: Color, roughness: f64, ior: f64, ambient: Color, reflectance: f64) -> Self {
        Self {
            albedo: clamp_color(albedo),
            roughness,
            ior,
            ambient: clamp_color(ambient),
            reflectance: reflectance.clamp(0.0, 1.0),
        }
    }

    pub fn albedo(&self) -> Color {
        self.albedo
    }

    pub fn roughness(&self) -> f64 {
        self.roughness
    }

    pub fn ior(&self) -> f64 {
        self.ior
    }
}

impl Shade for CookTorranceMaterial {
    fn ambient_color(&self) -> Color {
        self.ambient
    }

    fn reflectance(&self) -> f64 {
        self.reflectance
    }

    fn shade(&self, intersection: &RayIntersection, light: &Light) -> Color {
        let ray_dir = intersection.ray.direction();
        let n = safe_normalize(intersection.normal);
        let l = safe_normalize(light.position - intersection.position);

        let vdn = (-ray_dir).dot(n).clamp(0.0, 1.0);
        let ndl = n.dot(l).clamp(0.0, 1.0);
        let h = safe_normalize(l - ray_dir);
        let ndh = n.dot(h).clamp(EPSILON, 1.0);
        let vdh = (-ray_dir).dot(h).clamp(0.0, 1.0);

        // Geometric attenuation
        let g = if vdh >= EPSILON {
            (2.0 * ndh * vdn.min(ndl) / vdh).min(1.0)
        } else {
            1.0
        };

        // Beckmann distribution
        let m2 = self.roughness.max(Self::MIN_ROUGHNESS).powi(2);
        let ndh2 = ndh * ndh;
        let d = ((ndh2 - 1.0) / (m2 * ndh2)).exp() / (4.0 * m2 * ndh2 * ndh2);

        // Schlick
        let f0 = (1.0 - self.ior) / (1.0 + self.ior);
        let f0_2 = f0 * f0;
        let f = f0_2 + (1.0 - f0_2) * (1.0 - vdn).powi(5);

        let spec = (g * d * f).clamp(0.0, 1.0);
        let specular = light.diffuse.lerp(self.albedo, 0.5) * spec;
        let diffuse = n.dot(l).max(0.0) * self.albedo * light.diffuse;
        diffuse + specular
    }

    fn shade_ambient(&self, _intersection: &RayIntersection, light: &Light) -> Color {
        self.ambient * light.ambient
    }

    fn absorption_spectrum(&self) -> Color {
        normalize_spectrum(self.albedo + self.ambient)
    }
}

/// Every material a renderable can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Constant(ConstantMaterial),
    Phong(PhongMaterial),
    CookTorrance(CookTorranceMaterial),
}

impl Material {
    fn inner(&self) -> &dyn Shade {
        match self {
            Material::Constant(m) => m,
            Material::Phong(m) => m,
            Material::CookTorrance(m) => m,
        }
    }
}

impl Shade for Material {
    fn ambient_color(&self) -> Color {
        self.inner().ambient_color()
    }

    fn reflectance(&self) -> f64 {
        self.inner().reflectance()
    }

    fn shade(&self, intersection: &RayIntersection, light: &Light) -> Color {
        self.inner().shade(intersection, light)
    }

    fn shade_ambient(&self, intersection: &RayIntersection, light: &Light) -> Color {
        self.inner().shade_ambient(intersection, light)
    }

    fn absorption_spectrum(&self) -> Color {
        self.inner().absorption_spectrum()
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::Phong(PhongMaterial::default())
    }
}

impl From<ConstantMaterial> for Material {
    fn from(m: ConstantMaterial) -> Self {
        Material::Constant(m)
    }
}

impl From<PhongMaterial> for Material {
    fn from(m: PhongMaterial) -> Self {
        Material::Phong(m)
    }
}

impl From<CookTorranceMaterial> for Material {
    fn from(m: CookTorranceMaterial) -> Self {
        Material::CookTorrance(m)
    }
}
