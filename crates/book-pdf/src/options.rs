use crate::constants::*;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Image quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    pub fn settings(self) -> QualitySettings {
        match self {
            Quality::Low => QualitySettings {
                image_quality: 0.7,
                compression: 0.8,
                max_image_width: 800,
                max_image_height: 600,
            },
            Quality::Medium => QualitySettings {
                image_quality: 0.85,
                compression: 0.9,
                max_image_width: 1200,
                max_image_height: 900,
            },
            Quality::High => QualitySettings {
                image_quality: 0.95,
                compression: 0.95,
                max_image_width: 2000,
                max_image_height: 1500,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }
}

impl FromStr for Quality {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Quality::Low),
            "medium" => Ok(Quality::Medium),
            "high" => Ok(Quality::High),
            _ => Err(ExportError::InvalidQuality(s.to_string())),
        }
    }
}

impl TryFrom<String> for Quality {
    type Error = ExportError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raster limits and re-encode settings for one quality tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySettings {
    /// JPEG quality in [0, 1]
    pub image_quality: f32,
    /// Lossless compression effort in [0, 1]
    pub compression: f32,
    pub max_image_width: u32,
    pub max_image_height: u32,
}

impl QualitySettings {
    /// JPEG encoder quality (1..=100)
    pub fn jpeg_quality(&self) -> u8 {
        (self.image_quality * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// Deflate level (0..=9)
    pub fn flate_level(&self) -> u32 {
        (self.compression * 9.0).round().clamp(0.0, 9.0) as u32
    }
}

/// Bounds on image work during one export
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportLimits {
    /// Images normalized at the same time
    pub max_concurrent_images: usize,
    /// Per-image budget before falling back to a placeholder
    pub image_timeout_ms: u64,
    /// Budget for all image work; `None` waits for every image
    pub overall_timeout_ms: Option<u64>,
}

impl Default for ExportLimits {
    fn default() -> Self {
        Self {
            max_concurrent_images: MAX_CONCURRENT_IMAGE_PROCESSING,
            image_timeout_ms: IMAGE_PROCESSING_TIMEOUT.as_millis() as u64,
            overall_timeout_ms: Some(PDF_GENERATION_TIMEOUT.as_millis() as u64),
        }
    }
}

impl ExportLimits {
    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }

    pub fn overall_timeout(&self) -> Option<Duration> {
        self.overall_timeout_ms.map(Duration::from_millis)
    }
}

/// Options for one export call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub quality: Quality,

    // Interior decorations
    pub include_page_numbers: bool,
    pub watermark: Option<String>,

    // Spine text
    pub include_spine_text: bool,
    /// CSS colour string
    pub spine_text_color: String,
    /// Points
    pub spine_font_size: f32,

    pub limits: ExportLimits,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            quality: Quality::Medium,
            include_page_numbers: false,
            watermark: None,
            include_spine_text: true,
            spine_text_color: DEFAULT_SPINE_TEXT_COLOR.to_string(),
            spine_font_size: DEFAULT_SPINE_FONT_SIZE,
            limits: ExportLimits::default(),
        }
    }
}

impl ExportOptions {
    /// Set the quality tier from its string name
    pub fn with_quality_str(mut self, quality: &str) -> Result<Self> {
        self.quality = quality.parse()?;
        Ok(self)
    }

    /// Load options from JSON file
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| ExportError::Config(format!("Failed to parse config: {}", e)))?;
        // An unknown tier is InvalidQuality, not a parse failure
        if let Some(quality) = value.get("quality").and_then(|q| q.as_str()) {
            quality.parse::<Quality>()?;
        }
        let options: ExportOptions = serde_json::from_value(value)
            .map_err(|e| ExportError::Config(format!("Failed to parse config: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to JSON file
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ExportError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if !(self.spine_font_size.is_finite() && self.spine_font_size > 0.0) {
            return Err(ExportError::Config(format!(
                "Spine font size must be positive (got {})",
                self.spine_font_size
            )));
        }

        if csscolorparser::parse(&self.spine_text_color).is_err() {
            return Err(ExportError::Config(format!(
                "Unrecognized spine text color {:?}",
                self.spine_text_color
            )));
        }

        if self.limits.max_concurrent_images == 0 {
            return Err(ExportError::Config(
                "At least one image must be processed at a time".to_string(),
            ));
        }

        if self.limits.image_timeout_ms == 0 {
            return Err(ExportError::Config(
                "Image timeout must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
