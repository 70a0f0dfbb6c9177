//! Render settings loaded from JSON.

use crate::camera::CameraSettings;
use crate::ingest::LightSource;
use crate::light::LightRig;
use crate::material::Color;
use crate::scene::{Scene, DEFAULT_LIGHT_INTENSITY};
use glint_math::DVec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything a render needs besides the geometry.
///
/// Every field has a default, so a settings file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub camera: CameraSettings,
    pub background: Color,
    pub light_intensity: f64,
    pub max_depth: usize,
    /// Render threads; `None` uses all cores
    pub worker_threads: Option<usize>,
    pub lights: LightRig,
    /// Host lights; when no point light is listed the rig is used
    pub light_sources: Vec<LightSource>,
    /// Optional OBJ file added to the scene
    pub mesh_path: Option<PathBuf>,
    pub mesh_color: Color,
    pub output: PathBuf,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            camera: CameraSettings::default(),
            background: Color::ZERO,
            light_intensity: DEFAULT_LIGHT_INTENSITY,
            max_depth: 1,
            worker_threads: None,
            lights: LightRig::default(),
            light_sources: Vec::new(),
            mesh_path: None,
            mesh_color: DVec3::new(0.5, 0.9, 0.5),
            output: PathBuf::from("render.png"),
        }
    }
}

impl RenderSettings {
    /// Parse settings from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Copy the image, camera and output settings into `scene`.
    pub fn apply_to(&self, scene: &mut Scene) {
        scene.init(self.width, self.height);
        scene.set_camera(self.camera);
        scene.background = self.background;
        scene.light_intensity = self.light_intensity;
        scene.worker_threads = self.worker_threads;
    }
}
