//! Shared constants for print export
//!
//! This module centralizes the physical page geometry, screen canvas size
//! and tuning numbers used throughout the export pipeline.

use std::time::Duration;

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 2.83465;

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

/// Convert points to millimeters
#[inline]
pub fn pt_to_mm(pt: f32) -> f32 {
    pt / POINTS_PER_MM
}

// =============================================================================
// Physical Page
// =============================================================================

/// Interior trim width (mm)
pub const PAGE_WIDTH_MM: f32 = 154.0;

/// Interior trim height (mm)
pub const PAGE_HEIGHT_MM: f32 = 216.0;

/// Interior trim width in points
pub const PAGE_WIDTH_PT: f32 = PAGE_WIDTH_MM * POINTS_PER_MM;

/// Interior trim height in points
pub const PAGE_HEIGHT_PT: f32 = PAGE_HEIGHT_MM * POINTS_PER_MM;

/// Bleed beyond the trim line on every edge (mm)
pub const BLEED_MARGIN_MM: f32 = 3.0;

/// Bleed beyond the trim line on every edge (points)
pub const BLEED_MARGIN_PT: f32 = BLEED_MARGIN_MM * POINTS_PER_MM;

/// Inset from the trim line that content should respect (mm)
pub const SAFE_MARGIN_MM: f32 = 5.0;

/// Inset from the trim line that content should respect (points)
pub const SAFE_MARGIN_PT: f32 = SAFE_MARGIN_MM * POINTS_PER_MM;

// =============================================================================
// Screen Canvas
// =============================================================================

/// Width of the editing canvas in screen pixels
pub const SCREEN_WIDTH_PX: f32 = 720.0;

/// Height of the editing canvas in screen pixels
pub const SCREEN_HEIGHT_PX: f32 = 540.0;

/// Multiplier applied to screen font sizes before clamping
pub const FONT_SIZE_SCALE_FACTOR: f32 = 0.8;

// =============================================================================
// Text
// =============================================================================

pub const MIN_FONT_SIZE: f32 = 8.0;
pub const MAX_FONT_SIZE: f32 = 72.0;

/// Screen font size used when a text block carries none
pub const DEFAULT_SCREEN_FONT_SIZE: f32 = 22.0;

/// Line height as a multiple of the font size
pub const DEFAULT_LINE_HEIGHT: f32 = 1.2;

/// Average glyph advance as a fraction of the font size
pub const AVERAGE_CHAR_WIDTH_RATIO: f32 = 0.6;

pub const DEFAULT_TEXT_COLOR: &str = "#1f2937";

/// Registered font used when nothing else matches
pub const DEFAULT_FONT_FAMILY: &str = "Inter";

/// Fallback chain appended after the resolved font
pub const FONT_FALLBACKS: [&str; 3] = ["Arial", "Helvetica", "sans-serif"];

// =============================================================================
// Spine
// =============================================================================

/// Interior pages per millimeter of spine
pub const SPINE_PAGES_PER_MM: f32 = 17.48;

/// Cover board allowance added to every spine (mm)
pub const SPINE_BASE_MM: f32 = 1.524;

pub const MIN_SPINE_MM: f32 = 2.0;
pub const MAX_SPINE_MM: f32 = 50.0;

/// Largest page count `validate_page_count` accepts
pub const MAX_REASONABLE_PAGE_COUNT: i64 = 1000;

pub const DEFAULT_SPINE_FONT_SIZE: f32 = 12.0;
pub const DEFAULT_SPINE_TEXT_COLOR: &str = "#000000";

// =============================================================================
// Images
// =============================================================================

pub const DEFAULT_IMAGE_ZOOM: f32 = 1.0;
pub const MIN_IMAGE_ZOOM: f32 = 0.1;
pub const MAX_IMAGE_ZOOM: f32 = 3.0;

/// Images normalized in parallel per export
pub const MAX_CONCURRENT_IMAGE_PROCESSING: usize = 3;

pub const IMAGE_PROCESSING_TIMEOUT: Duration = Duration::from_secs(30);

/// Budget for all image work in one export
pub const PDF_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Font size of placeholder captions (points)
pub const PLACEHOLDER_CAPTION_SIZE: f32 = 8.0;

/// Caption lines drawn inside a placeholder box
pub const PLACEHOLDER_MAX_LINES: usize = 3;

// =============================================================================
// Page Decorations
// =============================================================================

pub const PAGE_NUMBER_FONT_SIZE: f32 = 10.0;

/// Distance of the page number from the right trim edge (points)
pub const PAGE_NUMBER_OFFSET_X: f32 = 40.0;

/// Distance of the page number baseline from the bottom trim edge (points)
pub const PAGE_NUMBER_OFFSET_Y: f32 = 20.0;

pub const WATERMARK_FONT_SIZE: f32 = 24.0;

/// Gray level of watermark text (0 = black, 1 = white)
pub const WATERMARK_GRAY: f32 = 0.75;
