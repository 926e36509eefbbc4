use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CameraOptions {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub position: [f32; 3],
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fov_degrees: 80.0,
            position: [0.0, 0.0, 5.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LightingOptions {
    pub ambient_intensity: f32,
    pub directional_position: [f32; 3],
    pub directional_intensity: f32,
}

impl Default for LightingOptions {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.5,
            directional_position: [10.0, 10.0, 5.0],
            directional_intensity: 1.0,
        }
    }
}

/// Fixed popup composition in logical pixels. Only the image box depends on the photo.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PopupOptions {
    pub card_width: f32,
    pub card_height: f32,
    /// Right-hand column holding the text and the navigation buttons.
    pub side_panel_width: f32,
    pub button_height: f32,
    pub padding: f32,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            card_width: 900.0,
            card_height: 560.0,
            side_panel_width: 280.0,
            button_height: 48.0,
            padding: 24.0,
        }
    }
}

impl PopupOptions {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.padding >= 0.0 && self.button_height > 0.0,
            "popup.padding must be >= 0 and popup.button-height > 0"
        );
        ensure!(
            self.side_panel_width > 3.0 * self.padding,
            "popup.side-panel-width must exceed three paddings"
        );
        ensure!(
            self.card_width - self.side_panel_width - 2.0 * self.padding > 0.0,
            "popup.card-width leaves no room for the image"
        );
        ensure!(
            self.card_height - 2.0 * self.padding > 0.0,
            "popup.card-height leaves no room for the image"
        );
        ensure!(
            self.card_height >= 2.0 * self.button_height + 4.0 * self.padding,
            "popup.card-height cannot fit the close and navigation buttons"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// JSON catalog file, or a directory scanned recursively for images.
    pub catalog_path: PathBuf,
    /// Edge length of the cube planes are scattered in.
    pub bounding_range: f32,
    /// Longest side of a plane in scene units.
    pub max_plane_dimension: f32,
    /// Optional deterministic seed for plane placement.
    pub placement_seed: Option<u64>,
    /// Maximum number of concurrent texture decodes in the loader.
    pub loader_max_concurrent_decodes: usize,
    /// Decodes running longer than this resolve as failed.
    #[serde(with = "humantime_serde")]
    pub texture_timeout: Duration,
    /// RGB tint applied to planes whose texture failed.
    pub fallback_tint: [u8; 3],
    pub camera: CameraOptions,
    pub lighting: LightingOptions,
    pub popup: PopupOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.bounding_range.is_finite() && self.bounding_range > 0.0,
            "bounding-range must be a positive number"
        );
        ensure!(
            self.max_plane_dimension.is_finite() && self.max_plane_dimension > 0.0,
            "max-plane-dimension must be a positive number"
        );
        ensure!(
            self.loader_max_concurrent_decodes > 0,
            "loader-max-concurrent-decodes must be greater than zero"
        );
        ensure!(
            self.texture_timeout > Duration::ZERO,
            "texture-timeout must be positive"
        );
        ensure!(
            self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0,
            "camera.fov-degrees must be within (0, 180)"
        );
        self.popup.validate().context("invalid popup layout")?;
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::new(),
            bounding_range: 10.0,
            max_plane_dimension: 1.5,
            placement_seed: None,
            loader_max_concurrent_decodes: 4,
            texture_timeout: Duration::from_secs(10),
            fallback_tint: [255, 0, 255],
            camera: CameraOptions::default(),
            lighting: LightingOptions::default(),
            popup: PopupOptions::default(),
        }
    }
}
