//! Screen-space to print-space conversion
//!
//! The editor canvas is a fixed 720×540 pixel area; the print page is the
//! trim rectangle in points. Each axis scales independently, so a
//! full-canvas block always covers the full trim page.

use crate::constants::{
    FONT_SIZE_SCALE_FACTOR, MAX_FONT_SIZE, MIN_FONT_SIZE, SCREEN_HEIGHT_PX, SCREEN_WIDTH_PX,
};
use crate::layout::Block;
use crate::types::{Dimensions, Point, PrintPageConfig, Rect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateConverter {
    page: PrintPageConfig,
}

impl Default for CoordinateConverter {
    fn default() -> Self {
        Self::new(PrintPageConfig::default())
    }
}

impl CoordinateConverter {
    pub fn new(page: PrintPageConfig) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &PrintPageConfig {
        &self.page
    }

    /// Horizontal scale, points per screen pixel
    pub fn x_ratio(&self) -> f32 {
        self.page.width / SCREEN_WIDTH_PX
    }

    /// Vertical scale, points per screen pixel
    pub fn y_ratio(&self) -> f32 {
        self.page.height / SCREEN_HEIGHT_PX
    }

    pub fn convert_x(&self, screen_x: f32) -> f32 {
        ((screen_x / SCREEN_WIDTH_PX) * self.page.width).max(0.0)
    }

    pub fn convert_y(&self, screen_y: f32) -> f32 {
        ((screen_y / SCREEN_HEIGHT_PX) * self.page.height).max(0.0)
    }

    /// Widths never drop below one point
    pub fn convert_width(&self, screen_width: f32) -> f32 {
        ((screen_width / SCREEN_WIDTH_PX) * self.page.width).max(1.0)
    }

    /// Heights never drop below one point
    pub fn convert_height(&self, screen_height: f32) -> f32 {
        ((screen_height / SCREEN_HEIGHT_PX) * self.page.height).max(1.0)
    }

    pub fn convert_font_size(&self, screen_font_size: f32) -> f32 {
        let converted = screen_font_size * FONT_SIZE_SCALE_FACTOR;
        if converted.is_nan() {
            return MIN_FONT_SIZE;
        }
        converted.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
    }

    /// Pan offsets are signed, so unlike positions they are not floored
    pub fn convert_offset(&self, screen_dx: f32, screen_dy: f32) -> (f32, f32) {
        (screen_dx * self.x_ratio(), screen_dy * self.y_ratio())
    }

    pub fn convert_point(&self, screen: Point) -> Point {
        Point::new(self.convert_x(screen.x), self.convert_y(screen.y))
    }

    pub fn convert_dimensions(&self, screen: Dimensions) -> Dimensions {
        Dimensions::new(
            self.convert_width(screen.width),
            self.convert_height(screen.height),
        )
    }

    pub fn convert_bounds(&self, screen: Rect) -> Rect {
        Rect::new(
            self.convert_x(screen.x),
            self.convert_y(screen.y),
            self.convert_width(screen.width),
            self.convert_height(screen.height),
        )
    }

    /// Print-space rectangle of a block, relative to the trim origin
    pub fn block_rect(&self, block: &Block) -> Rect {
        self.convert_bounds(Rect::new(block.x, block.y, block.w, block.h))
    }

    /// The trim rectangle inset by the safe margin
    pub fn safe_area_bounds(&self) -> Rect {
        self.page.content_area
    }

    /// Whether a box at `point` with `dims` fits inside the safe area
    pub fn is_within_safe_area(&self, point: Point, dims: Dimensions) -> bool {
        let safe = self.safe_area_bounds();
        let max_x = safe.right() - dims.width;
        let max_y = safe.bottom() - dims.height;
        point.x >= safe.x && point.x <= max_x && point.y >= safe.y && point.y <= max_y
    }

    /// Whether a box at `point` with `dims` fits inside the trim page
    pub fn is_within_bounds(&self, point: Point, dims: Dimensions) -> bool {
        let max_x = self.page.width - dims.width;
        let max_y = self.page.height - dims.height;
        point.x >= 0.0 && point.x <= max_x && point.y >= 0.0 && point.y <= max_y
    }
}
