// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Renderer configuration, stored as RON.

use lumen_core::math::{Extent2D, LinearRgba};
use lumen_core::renderer::TextureFormat;
use lumen_lanes::{BrightPassPreview, CubemapPolicy, DEFAULT_ADAPTATION_TIME_SECS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating [`RenderSettings`].
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings from {path:?}: {source}")]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The text is not valid RON for these settings.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The settings could not be written as RON.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
    /// The settings parse but make no sense.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Parameters of the exposure adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureSettings {
    /// Time constant of the temporal filter in seconds. `<= 0` adapts instantly.
    pub adaptation_time_secs: f32,
    /// Middle-grey value the adapted luminance is mapped to.
    pub key_value: f32,
    /// Lower bound on the adapted luminance used for the exposure scale.
    pub min_luminance: f32,
}

impl Default for ExposureSettings {
    fn default() -> Self {
        Self {
            adaptation_time_secs: DEFAULT_ADAPTATION_TIME_SECS,
            key_value: 0.18,
            min_luminance: 1e-4,
        }
    }
}

/// Parameters of the tone-map composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneMapSettings {
    /// Draw the bright-pass preview window.
    pub bright_pass: bool,
    /// Exposed luminance above which the preview keeps a pixel.
    pub bright_threshold: f32,
    /// Clip-space inset of the preview window.
    pub bright_pass_inset: f32,
}

impl Default for ToneMapSettings {
    fn default() -> Self {
        Self {
            bright_pass: false,
            bright_threshold: 1.0,
            bright_pass_inset: 0.5,
        }
    }
}

impl ToneMapSettings {
    /// The preview the tone-map lane should draw, if enabled.
    pub fn preview(&self) -> Option<BrightPassPreview> {
        self.bright_pass.then_some(BrightPassPreview {
            threshold: self.bright_threshold,
            inset: self.bright_pass_inset,
        })
    }
}

/// Parameters of the environment cube.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubemapSettings {
    /// Side length of each face in texels.
    pub face_size: u32,
    /// When the cube is projected again.
    pub policy: CubemapPolicy,
}

impl Default for CubemapSettings {
    fn default() -> Self {
        Self {
            face_size: 256,
            policy: CubemapPolicy::RebuildEveryFrame,
        }
    }
}

/// Everything the render agent can be configured with.
///
/// Missing fields take their default values, so a settings file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// Format of the HDR scene target. Must be filterable.
    pub hdr_format: TextureFormat,
    /// Format of the tone-mapped output handed to the presenter.
    pub output_format: TextureFormat,
    /// Linear RGBA the scene target is cleared to each frame.
    pub clear_color: [f32; 4],
    /// Exposure adaptation.
    pub exposure: ExposureSettings,
    /// Tone-map composite.
    pub tone_map: ToneMapSettings,
    /// Environment cube.
    pub cubemap: CubemapSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            hdr_format: TextureFormat::Rgba16Float,
            output_format: TextureFormat::Rgba8UnormSrgb,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            exposure: ExposureSettings::default(),
            tone_map: ToneMapSettings::default(),
            cubemap: CubemapSettings::default(),
        }
    }
}

impl RenderSettings {
    /// Parses and validates settings from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = ron::de::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates a RON settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_ron_str(&text)?;
        log::info!("Loaded render settings from {}", path.display());
        Ok(settings)
    }

    /// Writes the settings as pretty RON.
    pub fn to_ron_string(&self) -> Result<String, SettingsError> {
        let pretty_config = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty_config)?)
    }

    /// Checks the values the renderer cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.width == 0 || self.height == 0 {
            return Err(SettingsError::Invalid(format!(
                "viewport {}x{} is empty",
                self.width, self.height
            )));
        }
        if !self.hdr_format.is_float() || !self.hdr_format.is_filterable() {
            return Err(SettingsError::Invalid(format!(
                "HDR format {:?} must be a filterable float format",
                self.hdr_format
            )));
        }
        if self.cubemap.face_size == 0 {
            return Err(SettingsError::Invalid("cube face size is zero".to_string()));
        }
        if self.exposure.key_value <= 0.0 || self.exposure.min_luminance <= 0.0 {
            return Err(SettingsError::Invalid(
                "exposure key value and minimum luminance must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The viewport size.
    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }

    /// The clear color as a linear color.
    pub fn clear_color(&self) -> LinearRgba {
        let [r, g, b, a] = self.clear_color;
        LinearRgba::new(r, g, b, a)
    }
}
