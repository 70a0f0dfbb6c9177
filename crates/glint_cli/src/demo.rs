//! Built-in demo scene.

use glint_tracer::{
    CookTorranceMaterial, DVec3, Material, PhongMaterial, Plane, Renderable, Scene, Sphere,
};
use std::f64::consts::TAU;
use std::sync::Arc;

/// Number of spheres in the ring.
const RING_SIZE: usize = 8;

/// Material for the ground: slightly blue and reflective.
fn ground_material() -> Material {
    PhongMaterial::new(
        DVec3::new(0.3, 0.3, 0.6),
        DVec3::new(0.7, 0.7, 0.9),
        DVec3::splat(0.5),
        0.25,
        10.0,
    )
    .into()
}

/// Fully saturated color for `hue` in `[0, 1)`.
fn hue_color(hue: f64) -> DVec3 {
    let h = hue.fract() * 6.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    match h as u32 {
        0 => DVec3::new(1.0, x, 0.0),
        1 => DVec3::new(x, 1.0, 0.0),
        2 => DVec3::new(0.0, 1.0, x),
        3 => DVec3::new(0.0, x, 1.0),
        4 => DVec3::new(x, 0.0, 1.0),
        _ => DVec3::new(1.0, 0.0, x),
    }
}

/// Add a ground plane and a ring of spheres standing on it.
///
/// Spheres alternate between Phong and Cook-Torrance materials.
pub fn populate(scene: &mut Scene) {
    scene.add_renderable(Renderable::with_material(Plane::default(), ground_material()));

    for i in 0..RING_SIZE {
        let t = i as f64 / RING_SIZE as f64;
        let angle = t * TAU;
        let radius = if i % 2 == 0 { 0.5 } else { 0.35 };
        let center = DVec3::new(2.5 * angle.cos(), 2.5 * angle.sin(), radius);
        let color = hue_color(t);

        let material: Material = if i % 2 == 0 {
            PhongMaterial::new(color * 0.2, color, DVec3::new(0.3, 0.3, 0.2), 0.3, 40.0).into()
        } else {
            CookTorranceMaterial::new(color * 0.5, 0.2, 1.5, DVec3::splat(0.2), 0.1).into()
        };
        scene.add_renderable(Renderable::new(Sphere::new(center, radius), Arc::new(material)));
    }

    // Mirror sphere in the middle
    scene.add_renderable(Renderable::with_material(
        Sphere::new(DVec3::new(0.0, 0.0, 1.0), 1.0),
        PhongMaterial::new(DVec3::splat(0.1), DVec3::splat(0.8), DVec3::ONE, 0.8, 100.0),
    ));
}
