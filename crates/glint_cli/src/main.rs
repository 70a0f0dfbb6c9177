//! glint - render a demo scene (and optionally an OBJ mesh) to a PNG.
//!
//! Usage: `glint [settings.json]`

mod demo;
mod obj;

use anyhow::{Context, Result};
use glint_tracer::ingest::{add_meshes, lights_from_sources};
use glint_tracer::{ImageBuffer, Material, PhongMaterial, RenderSettings, Scene};
use std::sync::Arc;

fn load_settings() -> Result<RenderSettings> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading settings from {path}");
            RenderSettings::load(&path).with_context(|| format!("Failed to load settings from {path}"))
        }
        None => Ok(RenderSettings::default()),
    }
}

/// Material for meshes loaded from disk.
fn mesh_material(settings: &RenderSettings) -> Material {
    let color = settings.mesh_color;
    PhongMaterial::new(color * 0.2, color, glint_tracer::DVec3::splat(0.4), 0.0, 10.0).into()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = load_settings()?;

    let mut scene = Scene::new();
    settings.apply_to(&mut scene);
    demo::populate(&mut scene);

    for light in lights_from_sources(&settings.light_sources, &settings.lights) {
        scene.add_light(light);
    }

    if let Some(path) = &settings.mesh_path {
        let inputs = obj::load_obj(path)?;
        let added = add_meshes(&mut scene, &inputs, Arc::new(mesh_material(&settings)));
        log::info!("Added {added} of {} meshes from {}", inputs.len(), path.display());
    }

    scene.prepare_scene();

    let mut image = ImageBuffer::new(settings.width, settings.height);
    scene
        .render(&mut image, settings.max_depth)
        .context("Render failed")?;

    image
        .save(&settings.output)
        .with_context(|| format!("Failed to write {}", settings.output.display()))?;
    log::info!("Wrote {}", settings.output.display());

    Ok(())
}
