//! Scene: renderables, lights, camera and the render loop.
//!
//! A scene is populated, prepared once (building acceleration structures)
//! and then rendered any number of times. Rendering only borrows the scene,
//! so rows are traced in parallel over shared geometry.

use crate::camera::{Camera, CameraSettings};
use crate::image_buffer::ImageBuffer;
use crate::intersection::{Intersect, RayIntersection, RenderableId};
use crate::light::Light;
use crate::material::{Color, Shade};
use crate::renderable::Renderable;
use glint_math::{reflect, DVec3, Ray, Vec4, EPSILON};
use log::info;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default scale applied to the color of every pixel that hits geometry.
pub const DEFAULT_LIGHT_INTENSITY: f64 = 100.0;

/// Errors that prevent a render from starting.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("camera properties have not been set")]
    CameraNotConfigured,

    #[error("image size has not been set; call init() first")]
    ImageSizeNotSet,

    #[error("scene has not been prepared; call prepare_scene() first")]
    NotPrepared,

    #[error("output buffer is {actual_width}x{actual_height} but the scene renders {width}x{height}")]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Counters and timing of one render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStats {
    /// Rays (primary and reflected) that hit something
    pub intersections: u64,
    /// Direct light evaluations that passed the shadow test
    pub shadings: u64,
    pub elapsed: Duration,
    pub worker_threads: usize,
}

/// Color seen along a ray, and whether the ray hit anything.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceResult {
    pub color: Color,
    pub intersection_found: bool,
}

#[derive(Debug, Default)]
struct Statistics {
    intersections: AtomicU64,
    shadings: AtomicU64,
}

impl Statistics {
    fn reset(&self) {
        self.intersections.store(0, Ordering::Relaxed);
        self.shadings.store(0, Ordering::Relaxed);
    }
}

/// Everything needed to render an image.
#[derive(Debug)]
pub struct Scene {
    renderables: Vec<Renderable>,
    lights: Vec<Light>,
    camera: Option<CameraSettings>,
    image_size: Option<(u32, u32)>,
    prepared: bool,
    stats: Statistics,

    /// Color of rays that hit nothing
    pub background: Color,
    /// Scale applied to every pixel that hits geometry
    pub light_intensity: f64,
    /// Size of a dedicated render pool; `None` uses rayon's global pool
    pub worker_threads: Option<usize>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            renderables: Vec::new(),
            lights: Vec::new(),
            camera: None,
            image_size: None,
            prepared: false,
            stats: Statistics::default(),
            background: Color::ZERO,
            light_intensity: DEFAULT_LIGHT_INTENSITY,
            worker_threads: None,
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all renderables and lights.
    pub fn clear(&mut self) {
        self.renderables.clear();
        self.lights.clear();
        self.prepared = false;
    }

    /// Add a renderable and return its id.
    ///
    /// The scene has to be prepared again before the next render.
    pub fn add_renderable(&mut self, renderable: Renderable) -> RenderableId {
        self.renderables.push(renderable);
        self.prepared = false;
        RenderableId(self.renderables.len() - 1)
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn renderables(&self) -> &[Renderable] {
        &self.renderables
    }

    pub fn renderable(&self, id: RenderableId) -> Option<&Renderable> {
        self.renderables.get(id.0)
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Set the output size and reset the statistics.
    pub fn init(&mut self, width: u32, height: u32) {
        self.image_size = Some((width, height));
        self.stats.reset();
    }

    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    pub fn set_camera_properties(&mut self, look_from: DVec3, look_to: DVec3, look_up: DVec3, fov: f64) {
        self.set_camera(CameraSettings {
            look_from,
            look_to,
            look_up,
            fov,
        });
    }

    pub fn set_camera(&mut self, settings: CameraSettings) {
        self.camera = Some(settings);
    }

    /// The camera resolved against the current image size.
    pub fn camera(&self) -> Result<Camera, SceneError> {
        let (width, height) = self.image_size.ok_or(SceneError::ImageSizeNotSet)?;
        let settings = self.camera.as_ref().ok_or(SceneError::CameraNotConfigured)?;
        Ok(Camera::new(settings, width, height))
    }

    /// Build acceleration structures. Required before [`Scene::render`].
    pub fn prepare_scene(&mut self) {
        let start = Instant::now();
        for renderable in &mut self.renderables {
            renderable.initialize();
        }
        self.prepared = true;
        info!(
            "Prepared scene with {} renderables and {} lights in {:.2?}",
            self.renderables.len(),
            self.lights.len(),
            start.elapsed()
        );
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Nearest hit over all renderables within `(0, max_lambda)`.
    pub fn closest_intersection(&self, ray: &Ray, max_lambda: f64) -> Option<RayIntersection> {
        let mut closest_lambda = max_lambda;
        let mut closest = None;

        for (index, renderable) in self.renderables.iter().enumerate() {
            if let Some(hit) = renderable.closest_intersection(ray, closest_lambda) {
                if hit.lambda < closest_lambda {
                    closest_lambda = hit.lambda;
                    closest = Some(RayIntersection::new(*ray, RenderableId(index), hit));
                }
            }
        }

        closest
    }

    /// Does anything block the ray within `(0, max_lambda)`?
    pub fn any_intersection(&self, ray: &Ray, max_lambda: f64) -> bool {
        self.renderables
            .iter()
            .any(|r| r.any_intersection(ray, max_lambda))
    }

    /// Color along `ray`, or the background when it hits nothing.
    pub fn trace(&self, ray: &Ray, depth: usize, max_depth: usize) -> TraceResult {
        match self.closest_intersection(ray, f64::INFINITY) {
            Some(intersection) => {
                self.stats.intersections.fetch_add(1, Ordering::Relaxed);
                TraceResult {
                    color: self.shade(&intersection, depth, max_depth),
                    intersection_found: true,
                }
            }
            None => TraceResult {
                color: self.background,
                intersection_found: false,
            },
        }
    }

    /// Light leaving `intersection` back along its ray.
    ///
    /// Ambient light is always added. Direct light only when the shadow ray
    /// from the light reaches the surface. Reflective materials blend in the
    /// mirrored ray while `depth < max_depth`.
    pub fn shade(&self, intersection: &RayIntersection, depth: usize, max_depth: usize) -> Color {
        let Some(renderable) = self.renderable(intersection.renderable) else {
            return self.background;
        };
        let material = renderable.material.as_ref();

        // Offset so secondary rays do not hit the surface they leave
        let safe_point = intersection.position + EPSILON * intersection.normal;

        let mut color = Color::ZERO;
        for light in &self.lights {
            color += material.shade_ambient(intersection, light);

            let to_surface = safe_point - light.position;
            let shadow_ray = Ray::new(light.position, to_surface);
            if !self.any_intersection(&shadow_ray, to_surface.length()) {
                color += material.shade(intersection, light);
                self.stats.shadings.fetch_add(1, Ordering::Relaxed);
            }
        }

        let t = material.reflectance();
        if depth < max_depth && t > 0.0 {
            let direction = reflect(intersection.ray.direction(), intersection.normal);
            let reflected = self.trace(&Ray::new(safe_point, direction), depth + 1, max_depth);

            let mut incident = reflected.color;
            // The background is not scaled by the light intensity at the end
            if !reflected.intersection_found && self.light_intensity > EPSILON {
                incident /= self.light_intensity;
            }
            color = color * (1.0 - t) + incident * material.absorption_spectrum() * t;
        }

        color
    }

    fn render_pixel(&self, camera: &Camera, i: u32, j: u32, max_depth: usize) -> Vec4 {
        let result = self.trace(&camera.ray_for_pixel(i, j), 0, max_depth);
        let color = if result.intersection_found {
            result.color * self.light_intensity
        } else {
            result.color
        };
        color.as_vec3().extend(1.0)
    }

    /// Render every pixel of `output`.
    ///
    /// Rows are traced in parallel. Row 0 of the buffer is the top of the image.
    pub fn render(&self, output: &mut ImageBuffer, max_recursive_depth: usize) -> Result<RenderStats, SceneError> {
        let (width, height) = self.image_size.ok_or(SceneError::ImageSizeNotSet)?;
        let camera = self.camera()?;
        if !self.prepared {
            return Err(SceneError::NotPrepared);
        }
        if output.width != width || output.height != height {
            return Err(SceneError::BufferSizeMismatch {
                width,
                height,
                actual_width: output.width,
                actual_height: output.height,
            });
        }

        self.stats.reset();
        let start = Instant::now();

        let render_rows = |pixels: &mut [Vec4]| {
            if width == 0 {
                return;
            }
            pixels
                .par_chunks_mut(width as usize)
                .enumerate()
                .for_each(|(y, row)| {
                    let j = height - 1 - y as u32;
                    for (i, pixel) in row.iter_mut().enumerate() {
                        *pixel = self.render_pixel(&camera, i as u32, j, max_recursive_depth);
                    }
                });
        };

        let worker_threads = match self.worker_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
                pool.install(|| render_rows(&mut output.pixels));
                pool.current_num_threads()
            }
            None => {
                render_rows(&mut output.pixels);
                rayon::current_num_threads()
            }
        };

        let stats = RenderStats {
            intersections: self.intersection_count(),
            shadings: self.shading_count(),
            elapsed: start.elapsed(),
            worker_threads,
        };
        info!(
            "Rendered {}x{} with {} intersections and {} shading computations in {:.2?} on {} threads",
            width, height, stats.intersections, stats.shadings, stats.elapsed, stats.worker_threads
        );
        Ok(stats)
    }

    /// Intersections counted since the last render or `init`.
    pub fn intersection_count(&self) -> u64 {
        self.stats.intersections.load(Ordering::Relaxed)
    }

    /// Shading computations counted since the last render or `init`.
    pub fn shading_count(&self) -> u64 {
        self.stats.shadings.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh_mesh::BvhTriangleMesh;
    use crate::material::{ConstantMaterial, Material, PhongMaterial};
    use crate::mesh::TriangleMesh;
    use crate::plane::Plane;
    use crate::sphere::Sphere;
    use std::sync::Arc;

    fn diffuse_only(reflectance: f64) -> PhongMaterial {
        PhongMaterial::new(DVec3::splat(0.2), DVec3::new(0.8, 0.6, 0.4), DVec3::ZERO, reflectance, 10.0)
    }

    fn looking_down(scene: &mut Scene, size: u32) {
        scene.init(size, size);
        scene.set_camera_properties(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO, DVec3::Y, 30.0);
    }

    #[test]
    fn test_background_on_miss() {
        let mut scene = Scene::new();
        scene.background = DVec3::new(0.1, 0.2, 0.3);
        looking_down(&mut scene, 4);
        scene.prepare_scene();

        let mut image = ImageBuffer::new(4, 4);
        let stats = scene.render(&mut image, 2).unwrap();

        let expected = Vec4::new(0.1, 0.2, 0.3, 1.0);
        assert!(image.pixels.iter().all(|p| (*p - expected).length() < 1e-6));
        assert_eq!(stats.intersections, 0);
        assert_eq!(stats.shadings, 0);
    }

    #[test]
    fn test_render_preconditions() {
        let mut scene = Scene::new();
        let mut image = ImageBuffer::new(2, 2);
        assert!(matches!(scene.render(&mut image, 0), Err(SceneError::ImageSizeNotSet)));

        scene.init(2, 2);
        assert!(matches!(scene.render(&mut image, 0), Err(SceneError::CameraNotConfigured)));

        scene.set_camera(CameraSettings::default());
        assert!(matches!(scene.render(&mut image, 0), Err(SceneError::NotPrepared)));

        scene.prepare_scene();
        let mut wrong = ImageBuffer::new(3, 2);
        assert!(matches!(
            scene.render(&mut wrong, 0),
            Err(SceneError::BufferSizeMismatch { actual_width: 3, .. })
        ));
        assert!(scene.render(&mut image, 0).is_ok());

        // Adding geometry invalidates the preparation
        scene.add_renderable(Renderable::with_material(Sphere::default(), PhongMaterial::default()));
        assert!(matches!(scene.render(&mut image, 0), Err(SceneError::NotPrepared)));
    }

    #[test]
    fn test_closest_of_several_renderables() {
        let mut scene = Scene::new();
        let material = Arc::new(Material::from(PhongMaterial::default()));
        scene.add_renderable(Renderable::new(Plane::default(), material.clone()));
        let sphere = scene.add_renderable(Renderable::new(Sphere::default(), material.clone()));
        scene.prepare_scene();

        let ray = Ray::between(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO);
        let isect = scene.closest_intersection(&ray, f64::INFINITY).unwrap();
        assert_eq!(isect.renderable, sphere);
        assert!((isect.lambda - 4.0).abs() < 1e-12);
        assert!((isect.position - DVec3::Z).length() < 1e-12);
        assert!((isect.normal - DVec3::Z).length() < 1e-12);

        assert!(scene.any_intersection(&ray, 4.5));
        assert!(!scene.any_intersection(&ray, 3.5));
    }

    #[test]
    fn test_ambient_always_direct_only_when_lit() {
        let light = Light::new(DVec3::new(0.0, 0.0, 10.0), DVec3::ONE, DVec3::ONE, DVec3::ONE);
        let ray = Ray::new(DVec3::new(0.0, 0.0, 3.0), -DVec3::Z);

        let mut lit = Scene::new();
        lit.add_renderable(Renderable::with_material(Sphere::default(), diffuse_only(0.0)));
        lit.add_light(light);
        lit.prepare_scene();
        let lit_color = lit.trace(&ray, 0, 0);
        assert!(lit_color.intersection_found);
        assert_eq!(lit.shading_count(), 1);

        let mut shadowed = Scene::new();
        shadowed.add_renderable(Renderable::with_material(Sphere::default(), diffuse_only(0.0)));
        shadowed.add_renderable(Renderable::with_material(
            Sphere::new(DVec3::new(0.0, 0.0, 5.0), 1.0),
            diffuse_only(0.0),
        ));
        shadowed.add_light(light);
        shadowed.prepare_scene();
        let shadowed_color = shadowed.trace(&ray, 0, 0);
        assert_eq!(shadowed.shading_count(), 0);

        // Only the ambient term survives: 0.2 / 9^2
        let ambient = DVec3::splat(0.2 / 81.0);
        assert!((shadowed_color.color - ambient).length() < 1e-9);
        assert!(lit_color.color.cmpgt(shadowed_color.color).all());
    }

    #[test]
    fn test_phong_light_above_sphere() {
        let material = PhongMaterial::new(DVec3::ZERO, DVec3::ONE, DVec3::ZERO, 0.0, 10.0);
        let mut scene = Scene::new();
        scene.add_renderable(Renderable::with_material(Sphere::default(), material));
        scene.add_light(Light::new(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO, DVec3::ONE, DVec3::ZERO));
        scene.prepare_scene();

        let top = scene.trace(&Ray::between(DVec3::new(0.0, 0.0, 3.0), DVec3::ZERO), 0, 0);
        assert!(top.color.x > 0.0);

        let bottom = scene.trace(&Ray::between(DVec3::new(0.0, 0.0, -3.0), DVec3::ZERO), 0, 0);
        assert!(bottom.intersection_found);
        assert_eq!(bottom.color, DVec3::ZERO);
    }

    #[test]
    fn test_depth_zero_disables_reflection() {
        let light = Light::new(DVec3::new(0.0, 3.0, 10.0), DVec3::ONE, DVec3::ONE, DVec3::ONE);
        let ray = Ray::new(DVec3::new(0.0, 0.0, 3.0), -DVec3::Z);

        let mut mirror = Scene::new();
        mirror.background = DVec3::ONE;
        mirror.add_renderable(Renderable::with_material(Sphere::default(), diffuse_only(1.0)));
        mirror.add_light(light);
        mirror.prepare_scene();

        let mut matte = Scene::new();
        matte.background = DVec3::ONE;
        matte.add_renderable(Renderable::with_material(Sphere::default(), diffuse_only(0.0)));
        matte.add_light(light);
        matte.prepare_scene();

        assert_eq!(mirror.trace(&ray, 0, 0), matte.trace(&ray, 0, 0));

        // With one bounce a full mirror shows the background, scaled down and tinted
        let reflected = mirror.trace(&ray, 0, 1).color;
        let expected = DVec3::ONE / DEFAULT_LIGHT_INTENSITY * diffuse_only(1.0).absorption_spectrum();
        assert!((reflected - expected).length() < 1e-12);
    }

    #[test]
    fn test_recursion_depth_is_bounded() {
        // Two facing mirrors
        let mirror = Arc::new(Material::from(PhongMaterial::new(
            DVec3::ZERO,
            DVec3::ONE,
            DVec3::ZERO,
            1.0,
            1.0,
        )));
        let mut scene = Scene::new();
        scene.add_renderable(Renderable::new(Plane::new(DVec3::ZERO, DVec3::Z), mirror.clone()));
        scene.add_renderable(Renderable::new(Plane::new(DVec3::new(0.0, 0.0, 2.0), -DVec3::Z), mirror));
        scene.prepare_scene();

        let ray = Ray::new(DVec3::new(0.0, 0.0, 1.0), DVec3::new(1.0, 0.0, -1.0));
        for max_depth in [0, 1, 5] {
            scene.init(1, 1);
            scene.trace(&ray, 0, max_depth);
            assert_eq!(scene.intersection_count(), max_depth as u64 + 1);
        }
    }

    #[test]
    fn test_render_stats_and_orientation() {
        // Red quad covering the upper half of the view, nothing below
        let mut upper = TriangleMesh::new();
        let a = upper.add_vertex(DVec3::new(-5.0, 0.1, 0.0), DVec3::Z);
        let b = upper.add_vertex(DVec3::new(5.0, 0.1, 0.0), DVec3::Z);
        let c = upper.add_vertex(DVec3::new(5.0, 5.0, 0.0), DVec3::Z);
        let d = upper.add_vertex(DVec3::new(-5.0, 5.0, 0.0), DVec3::Z);
        upper.add_triangle(a, b, c);
        upper.add_triangle(a, c, d);

        let mut scene = Scene::new();
        scene.add_renderable(Renderable::with_material(
            BvhTriangleMesh::new(upper),
            ConstantMaterial::new(DVec3::new(0.01, 0.0, 0.0)),
        ));
        scene.add_light(Light::new(DVec3::new(0.0, 0.0, 3.0), DVec3::ONE, DVec3::ONE, DVec3::ONE));
        scene.worker_threads = Some(2);
        looking_down(&mut scene, 8);
        scene.prepare_scene();

        let mut image = ImageBuffer::new(8, 8);
        let stats = scene.render(&mut image, 1).unwrap();
        assert_eq!(stats.worker_threads, 2);
        assert_eq!(stats.intersections, 32);
        assert_eq!(stats.shadings, 32);
        assert_eq!(stats.intersections, scene.intersection_count());

        // +Y is up in the image, so the top rows are red
        assert!((image.get(0, 0).x - 1.0).abs() < 1e-6);
        assert_eq!(image.get(0, 7), Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert!(image.pixels.iter().all(|p| p.w == 1.0));
    }
}
