//! Spine width from interior page count
//!
//! Uses a linear paper-density formula:
//! `spine_mm = pages / 17.48 + 1.524`, clamped to [2, 50] mm.

use crate::constants::*;
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpineCalculator {
    page_width_pt: f32,
    bleed_margin_pt: f32,
}

impl Default for SpineCalculator {
    fn default() -> Self {
        Self::new(&PrintPageConfig::default())
    }
}

impl SpineCalculator {
    pub fn new(page: &PrintPageConfig) -> Self {
        Self {
            page_width_pt: page.width,
            bleed_margin_pt: page.bleed_margin,
        }
    }

    /// Spine width in millimeters
    pub fn spine_width_mm(&self, interior_page_count: i64) -> Result<f32> {
        if interior_page_count <= 0 {
            return Err(ExportError::InvalidPageCount(interior_page_count));
        }
        let raw = interior_page_count as f32 / SPINE_PAGES_PER_MM + SPINE_BASE_MM;
        Ok(raw.clamp(MIN_SPINE_MM, MAX_SPINE_MM))
    }

    /// Spine width in points
    pub fn spine_width_points(&self, interior_page_count: i64) -> Result<f32> {
        Ok(mm_to_pt(self.spine_width_mm(interior_page_count)?))
    }

    /// Back board + spine + front board + bleed on both outer edges, in points
    pub fn total_cover_width_points(&self, interior_page_count: i64) -> Result<f32> {
        let spine = self.spine_width_points(interior_page_count)?;
        Ok(2.0 * self.page_width_pt + spine + 2.0 * self.bleed_margin_pt)
    }

    /// Whether a spine width in points lies inside the allowed bounds
    pub fn validate_spine_width(&self, spine_width_pt: f32) -> bool {
        let mm = pt_to_mm(spine_width_pt);
        (MIN_SPINE_MM..=MAX_SPINE_MM).contains(&mm)
    }

    /// Whether a page count is plausible for a printed book
    pub fn validate_page_count(&self, page_count: i64) -> bool {
        if page_count <= 0 || page_count > MAX_REASONABLE_PAGE_COUNT {
            return false;
        }
        self.spine_width_points(page_count)
            .map(|w| self.validate_spine_width(w))
            .unwrap_or(false)
    }

    /// Spine widths (points) for the ends of a page-count range
    pub fn spine_width_range(&self, min_pages: i64, max_pages: i64) -> Result<(f32, f32)> {
        Ok((
            self.spine_width_points(min_pages)?,
            self.spine_width_points(max_pages)?,
        ))
    }

    /// Estimate the page counts that produce a spine of `spine_width_mm`,
    /// with ±10% tolerance. Diagnostic only.
    pub fn page_count_range_for_spine(&self, spine_width_mm: f32) -> (i64, i64) {
        let pages = (spine_width_mm - SPINE_BASE_MM) * SPINE_PAGES_PER_MM;
        let tolerance = pages * 0.1;
        let min = ((pages - tolerance).floor() as i64).max(1);
        let max = ((pages + tolerance).ceil() as i64).max(min);
        (min, max)
    }
}
