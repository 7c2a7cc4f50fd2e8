use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Book layout is required for PDF generation")]
    MissingLayout,
    #[error("Invalid quality setting. Must be low, medium, or high (got {0:?})")]
    InvalidQuality(String),
    #[error("Invalid page count for spine calculation: {0}")]
    InvalidPageCount(i64),
    #[error("Invalid image reference: {0}")]
    InvalidImageReference(String),
    #[error("Image not available: {0}")]
    ImageUnavailable(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// A point in points, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A rectangular area in points, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (top edge)
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge y coordinate
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Shrink the rectangle by `amount` on every side
    pub fn inset(&self, amount: f32) -> Rect {
        Rect {
            x: self.x + amount,
            y: self.y + amount,
            width: (self.width - 2.0 * amount).max(0.0),
            height: (self.height - 2.0 * amount).max(0.0),
        }
    }

    /// Move the rectangle by (dx, dy)
    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// Physical configuration of one interior page, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintPageConfig {
    /// Trim width
    pub width: f32,
    /// Trim height
    pub height: f32,
    pub bleed_margin: f32,
    pub safe_margin: f32,
    /// Trim rectangle inset by the safe margin
    pub content_area: Rect,
}

impl PrintPageConfig {
    /// Media box width including bleed on both sides
    pub fn media_width(&self) -> f32 {
        self.width + 2.0 * self.bleed_margin
    }

    /// Media box height including bleed on both sides
    pub fn media_height(&self) -> f32 {
        self.height + 2.0 * self.bleed_margin
    }
}

impl Default for PrintPageConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            width: PAGE_WIDTH_PT,
            height: PAGE_HEIGHT_PT,
            bleed_margin: BLEED_MARGIN_PT,
            safe_margin: SAFE_MARGIN_PT,
            content_area: Rect::new(0.0, 0.0, PAGE_WIDTH_PT, PAGE_HEIGHT_PT).inset(SAFE_MARGIN_PT),
        }
    }
}

/// A recoverable degradation recorded while exporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ExportWarning {
    /// An image block was drawn as a captioned placeholder box
    ImagePlaceholder {
        page: usize,
        block_id: String,
        reason: String,
    },
    /// A requested font family was substituted
    FontSubstituted {
        page: usize,
        block_id: String,
        requested: String,
        used: String,
    },
    /// A block extends past the safe margin
    OutsideSafeArea { page: usize, block_id: String },
    /// A block with zero width or height was skipped
    EmptyBlock { page: usize, block_id: String },
}

/// Interior PDF produced by [`crate::InternalPagesExporter`]
#[derive(Debug, Clone)]
pub struct InternalPagesPdf {
    pub bytes: Vec<u8>,
    /// Physical pages written
    pub page_count: usize,
    pub warnings: Vec<ExportWarning>,
}

/// Cover PDF produced by [`crate::CoverExporter`]
#[derive(Debug, Clone)]
pub struct CoverPdf {
    pub bytes: Vec<u8>,
    /// Spine width in points
    pub spine_width: f32,
    /// Full cover width in points (both boards, spine and bleed)
    pub total_width: f32,
    pub warnings: Vec<ExportWarning>,
}

/// Both PDFs produced by [`crate::export_both`]
#[derive(Debug, Clone)]
pub struct CombinedExport {
    pub internal_pages: InternalPagesPdf,
    pub cover: CoverPdf,
}

impl CombinedExport {
    pub fn internal_page_count(&self) -> usize {
        self.internal_pages.page_count
    }

    pub fn cover_spine_width(&self) -> f32 {
        self.cover.spine_width
    }

    pub fn cover_total_width(&self) -> f32 {
        self.cover.total_width
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ExportWarning> {
        self.internal_pages
            .warnings
            .iter()
            .chain(self.cover.warnings.iter())
    }
}

/// Flat summary of a combined export, suitable for callers that only
/// need a success flag and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_spine_width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_total_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExportWarning>,
}

impl ExportReport {
    pub fn from_result(result: &Result<CombinedExport>) -> Self {
        match result {
            Ok(export) => Self {
                success: true,
                error: None,
                internal_page_count: Some(export.internal_page_count()),
                cover_spine_width: Some(export.cover_spine_width()),
                cover_total_width: Some(export.cover_total_width()),
                warnings: export.warnings().cloned().collect(),
            },
            Err(e) => Self {
                success: false,
                error: Some(e.to_string()),
                internal_page_count: None,
                cover_spine_width: None,
                cover_total_width: None,
                warnings: Vec::new(),
            },
        }
    }
}
