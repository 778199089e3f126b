//! Application configuration
//!
//! Read once at startup from an optional TOML file, with the API key
//! falling back to the environment.

use crate::camera::{CameraBackend, CaptureAdapter, SyntheticCamera, DEFAULT_JPEG_QUALITY};
use crate::generation::GenerationConfig;
use crate::{CostumeError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "POKECOSTUME_CONFIG";

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pokecostume.toml";

/// Environment variables checked, in order, for the API key
pub const API_KEY_ENVS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Which camera implementation to open
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackendKind {
    /// A real device through OpenCV
    Webcam,
    /// Generated test pattern
    Synthetic,
}

impl Default for CameraBackendKind {
    fn default() -> Self {
        if cfg!(feature = "webcam") {
            CameraBackendKind::Webcam
        } else {
            CameraBackendKind::Synthetic
        }
    }
}

/// Camera settings
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub backend: CameraBackendKind,

    /// OpenCV device index
    pub device_index: i32,

    /// Requested frame size
    pub width: u32,
    pub height: u32,

    /// Quality of captured stills, 1..=100
    pub jpeg_quality: u8,

    /// Show the live preview flipped horizontally
    pub mirror_preview: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            backend: CameraBackendKind::default(),
            device_index: 0,
            width: 640,
            height: 480,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            mirror_preview: true,
        }
    }
}

impl CameraConfig {
    /// Build the capture adapter for the configured backend
    pub fn build_adapter(&self) -> Result<CaptureAdapter> {
        let backend: Arc<dyn CameraBackend> = match self.backend {
            CameraBackendKind::Synthetic => Arc::new(SyntheticCamera::new(self.width, self.height)),
            #[cfg(feature = "webcam")]
            CameraBackendKind::Webcam => Arc::new(crate::camera::WebcamCamera::new(
                self.device_index,
                self.width,
                self.height,
            )),
            #[cfg(not(feature = "webcam"))]
            CameraBackendKind::Webcam => {
                return Err(CostumeError::ConfigError(
                    "webcam backend requested but this build has no webcam support \
                     (rebuild with --features webcam)"
                        .to_string(),
                ))
            }
        };
        Ok(CaptureAdapter::new(backend).with_jpeg_quality(self.jpeg_quality))
    }
}

/// Window settings
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: f32,
    pub height: f32,
    pub min_width: f32,
    pub min_height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Pokémon Costume Booth".to_string(),
            width: 1100.0,
            height: 760.0,
            min_width: 640.0,
            min_height: 480.0,
        }
    }
}

/// Complete application configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub camera: CameraConfig,
    pub window: WindowConfig,
}

impl AppConfig {
    /// Load from the config file (if any) and the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            });
        Self::load_with(path.as_deref(), |name| std::env::var(name).ok())
    }

    /// Load from an explicit file and environment lookup
    pub fn load_with(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!("[CONFIG] Loading {}", path.display());
                let content = fs::read_to_string(path).map_err(|e| {
                    CostumeError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&content).map_err(|e| match e {
                    CostumeError::ConfigError(msg) => {
                        CostumeError::ConfigError(format!("{}: {}", path.display(), msg))
                    }
                    other => other,
                })?
            }
            None => {
                debug!("[CONFIG] No config file, using defaults");
                Self::default()
            }
        };

        if config.generation.api_key().is_none() {
            if let Some(key) = API_KEY_ENVS
                .iter()
                .find_map(|name| env(name).filter(|value| !value.trim().is_empty()))
            {
                config.generation.api_key = Some(key);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CostumeError::ConfigError(e.to_string()))
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    /// Use the synthetic test-pattern camera
    pub fn with_synthetic_camera(mut self) -> Self {
        self.camera.backend = CameraBackendKind::Synthetic;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(CostumeError::ConfigError(format!(
                "camera.jpeg_quality must be between 1 and 100, got {}",
                self.camera.jpeg_quality
            )));
        }

        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(CostumeError::ConfigError(
                "camera.width and camera.height must be non-zero".to_string(),
            ));
        }

        if self.generation.endpoint.trim().is_empty() {
            return Err(CostumeError::ConfigError(
                "generation.endpoint is required".to_string(),
            ));
        }

        if self.generation.model.trim().is_empty() {
            return Err(CostumeError::ConfigError("generation.model is required".to_string()));
        }

        if self.generation.timeout_secs == Some(0) {
            return Err(CostumeError::ConfigError(
                "generation.timeout_secs must be at least 1 when set".to_string(),
            ));
        }

        Ok(())
    }
}
