//! Cover export
//!
//! The cover is one oversized page laid out left to right as back board,
//! spine and front board, with bleed around the outside:
//!
//! ```text
//! +--------+------+--------+
//! |  back  | spine|  front |
//! +--------+------+--------+
//! ```
//!
//! The layout has no separate back-cover content, so the back board shows
//! the same content as the front.

use crate::constants::*;
use crate::convert::CoordinateConverter;
use crate::fonts::FontResolver;
use crate::images::{ImageNormalizer, ImageOutcome};
use crate::layout::{BookLayout, PageContent};
use crate::options::ExportOptions;
use crate::render::{BlockPainter, PageCanvas, PdfWriter, Rgb};
use crate::spine::SpineCalculator;
use crate::text::TextLayoutEngine;
use crate::types::*;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

const UNTITLED: &str = "Untitled";
const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Font stack used for spine text
const SPINE_FONT_FAMILY: &str = "Inter, Arial, sans-serif";

/// Title: first line of the first non-empty text block
pub fn extract_title(content: &PageContent) -> String {
    content
        .first_text_line()
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn author_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"By\s+(.+)").ok())
        .as_ref()
}

/// Author: whatever follows "By" in the first text block containing it
pub fn extract_author(content: &PageContent) -> String {
    let blocks = content.effective_blocks();
    let Some(text) = blocks
        .iter()
        .filter_map(|block| block.as_text())
        .find(|text| text.text.contains("By"))
    else {
        return UNKNOWN_AUTHOR.to_string();
    };

    author_pattern()
        .and_then(|pattern| pattern.captures(&text.text))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|author| !author.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSectionKind {
    Back,
    Spine,
    Front,
}

/// Placement of the three cover sections on the cover page, in points with
/// a top-left origin on the media box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverGeometry {
    pub back: Rect,
    pub spine: Rect,
    pub front: Rect,
    /// Media width: both boards, spine and bleed
    pub width: f32,
    /// Media height: board height and bleed
    pub height: f32,
}

impl CoverGeometry {
    pub fn new(page: &PrintPageConfig, spine_width: f32) -> Self {
        let bleed = page.bleed_margin;
        let back = Rect::new(bleed, bleed, page.width, page.height);
        let spine = Rect::new(back.right(), bleed, spine_width, page.height);
        let front = Rect::new(spine.right(), bleed, page.width, page.height);
        Self {
            back,
            spine,
            front,
            width: front.right() + bleed,
            height: page.media_height(),
        }
    }

    pub fn sections(&self) -> [(CoverSectionKind, Rect); 3] {
        [
            (CoverSectionKind::Back, self.back),
            (CoverSectionKind::Spine, self.spine),
            (CoverSectionKind::Front, self.front),
        ]
    }

    /// Trim box spanning all three sections
    pub fn trim(&self) -> Rect {
        Rect::new(
            self.back.x,
            self.back.y,
            self.front.right() - self.back.x,
            self.back.height,
        )
    }
}

#[derive(Debug, Clone)]
pub struct CoverExporter {
    page: PrintPageConfig,
    spine: SpineCalculator,
    fonts: Arc<FontResolver>,
    images: ImageNormalizer,
}

impl Default for CoverExporter {
    fn default() -> Self {
        Self::new(Arc::new(FontResolver::new()), ImageNormalizer::default())
    }
}

impl CoverExporter {
    pub fn new(fonts: Arc<FontResolver>, images: ImageNormalizer) -> Self {
        let page = PrintPageConfig::default();
        Self {
            spine: SpineCalculator::new(&page),
            page,
            fonts,
            images,
        }
    }

    pub fn geometry(&self, interior_page_count: i64) -> Result<CoverGeometry> {
        let spine_width = self.spine.spine_width_points(interior_page_count)?;
        Ok(CoverGeometry::new(&self.page, spine_width))
    }

    /// Render the cover for a book with `interior_page_count` pages
    pub async fn export(
        &self,
        layout: Option<&BookLayout>,
        interior_page_count: i64,
        options: &ExportOptions,
    ) -> Result<CoverPdf> {
        let layout = layout.ok_or(ExportError::MissingLayout)?;
        if interior_page_count <= 0 {
            return Err(ExportError::InvalidPageCount(interior_page_count));
        }
        options.validate()?;
        layout.validate()?;

        self.fonts.register_fonts();

        let spine_width = self.spine.spine_width_points(interior_page_count)?;
        let total_width = self.spine.total_cover_width_points(interior_page_count)?;
        let geometry = CoverGeometry::new(&self.page, spine_width);
        log::debug!(
            "Cover for {} interior pages: spine {:.2}pt, total width {:.2}pt",
            interior_page_count,
            spine_width,
            total_width
        );

        let images = self
            .images
            .normalize_all(
                layout.cover.content.image_references(),
                options.quality,
                &options.limits,
            )
            .await;

        let content = layout.cover.content.clone();
        let options = options.clone();
        let fonts = self.fonts.clone();
        let page = self.page;

        let (bytes, warnings) = tokio::task::spawn_blocking(move || {
            render_cover(&content, &geometry, &page, &options, &fonts, &images)
        })
        .await??;

        log::info!(
            "Exported cover ({:.1} x {:.1}pt, {} bytes)",
            geometry.width,
            geometry.height,
            bytes.len()
        );

        Ok(CoverPdf {
            bytes,
            spine_width,
            total_width,
            warnings,
        })
    }
}

fn render_cover(
    content: &PageContent,
    geometry: &CoverGeometry,
    page: &PrintPageConfig,
    options: &ExportOptions,
    fonts: &FontResolver,
    images: &HashMap<String, ImageOutcome>,
) -> Result<(Vec<u8>, Vec<ExportWarning>)> {
    let converter = CoordinateConverter::new(*page);
    let text = TextLayoutEngine::default();
    let painter = BlockPainter {
        converter: &converter,
        fonts,
        text: &text,
        images,
    };

    let title = extract_title(content);
    let mut writer = PdfWriter::new(&title, options.quality.settings().flate_level());
    let mut canvas = PageCanvas::new(geometry.width, geometry.height, geometry.trim());
    let mut warnings = Vec::new();

    for (kind, rect) in geometry.sections() {
        log::debug!("Rendering cover section {:?}", kind);
        match kind {
            CoverSectionKind::Back | CoverSectionKind::Front => {
                canvas.begin_clip(rect);
                painter.draw_content(
                    &mut writer,
                    &mut canvas,
                    content,
                    rect.origin(),
                    1,
                    &mut warnings,
                );
                canvas.end_clip();
            }
            CoverSectionKind::Spine if options.include_spine_text => {
                let spine_text = format!("{}\n{}", title, extract_author(content));
                canvas.begin_clip(rect);
                draw_spine_text(&mut canvas, rect, &spine_text, options, fonts, &text);
                canvas.end_clip();
            }
            CoverSectionKind::Spine => {}
        }
    }

    writer.add_page(canvas)?;
    Ok((writer.finish()?, warnings))
}

/// Largest size not above `requested` at which `lines` stack across the
/// spine and the longest one runs within the spine's length
fn fitted_spine_font_size(
    spine: Rect,
    lines: &[&str],
    requested: f32,
    family: &str,
    text: &TextLayoutEngine,
) -> f32 {
    if lines.is_empty() {
        return requested;
    }
    let across = spine.width / (lines.len() as f32 * DEFAULT_LINE_HEIGHT);

    let available = (spine.height - 2.0 * SAFE_MARGIN_PT).max(1.0);
    let longest = lines
        .iter()
        .map(|line| text.estimated_width(line, requested, family))
        .fold(0.0f32, f32::max);
    let along = if longest > available {
        requested * available / longest
    } else {
        requested
    };

    requested.min(across).min(along)
}

/// Lines rotated to read top to bottom, stacked across the spine and
/// centered on its midpoint
fn draw_spine_text(
    canvas: &mut PageCanvas,
    spine: Rect,
    spine_text: &str,
    options: &ExportOptions,
    fonts: &FontResolver,
    text: &TextLayoutEngine,
) {
    let font = fonts.resolve_detailed(SPINE_FONT_FAMILY);
    let color = Rgb::parse_or(&options.spine_text_color, Rgb::BLACK);

    let lines: Vec<&str> = spine_text.lines().filter(|l| !l.trim().is_empty()).collect();
    let size = fitted_spine_font_size(spine, &lines, options.spine_font_size, font.family, text);
    if size < options.spine_font_size {
        log::debug!(
            "Spine text reduced from {}pt to {:.2}pt to fit a {:.2}pt spine",
            options.spine_font_size,
            size,
            spine.width
        );
    }
    let line_height = size * DEFAULT_LINE_HEIGHT;
    let middle = (lines.len() as f32 - 1.0) / 2.0;

    for (i, line) in lines.iter().enumerate() {
        let width = text.estimated_width(line, size, font.family);
        // The tops of the glyphs face the front board
        let cx = spine.center_x() + (middle - i as f32) * line_height;
        canvas.centered_rotated_text(
            line,
            cx,
            spine.center_y(),
            -90.0,
            width,
            font.base,
            size,
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Block, TextBlock};

    fn cover_with(texts: &[&str]) -> PageContent {
        PageContent::with_blocks(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| Block::text(format!("b{}", i), 0.0, 0.0, 100.0, 40.0, TextBlock::new(*t)))
                .collect(),
        )
    }

    #[test]
    fn extracts_title_and_author() {
        let cover = cover_with(&["The Brave Fox\nsubtitle", "Written By Ada Lovelace"]);
        assert_eq!(extract_title(&cover), "The Brave Fox");
        assert_eq!(extract_author(&cover), "Ada Lovelace");
    }

    #[test]
    fn missing_title_and_author_use_defaults() {
        let cover = cover_with(&[]);
        assert_eq!(extract_title(&cover), UNTITLED);
        assert_eq!(extract_author(&cover), UNKNOWN_AUTHOR);
        // "By" without following whitespace does not match
        assert_eq!(extract_author(&cover_with(&["Bye now"])), UNKNOWN_AUTHOR);
    }

    #[test]
    fn sections_tile_back_spine_front() {
        let page = PrintPageConfig::default();
        let geometry = CoverGeometry::new(&page, 10.0);
        assert_eq!(geometry.back.x, page.bleed_margin);
        assert_eq!(geometry.spine.x, geometry.back.right());
        assert_eq!(geometry.front.x, geometry.spine.right());
        let expected = 2.0 * page.width + 10.0 + 2.0 * page.bleed_margin;
        assert!((geometry.width - expected).abs() < 1e-3);
        assert!((geometry.height - page.media_height()).abs() < 1e-3);
    }

    #[test]
    fn spine_text_shrinks_to_fit_thin_spines() {
        let text = TextLayoutEngine::default();
        let lines = ["My Book", "Jane Doe"];
        let thin = Rect::new(0.0, 0.0, 5.67, 600.0);
        let size = fitted_spine_font_size(thin, &lines, 12.0, "Inter", &text);
        assert!((size - 5.67 / 2.4).abs() < 1e-4);

        let wide = Rect::new(0.0, 0.0, 60.0, 600.0);
        assert_eq!(fitted_spine_font_size(wide, &lines, 12.0, "Inter", &text), 12.0);

        // A very long title is limited by the spine's length instead
        let long = ["A".repeat(400)];
        let long: Vec<&str> = long.iter().map(String::as_str).collect();
        let size = fitted_spine_font_size(wide, &long, 12.0, "Inter", &text);
        assert!(text.estimated_width(long[0], size, "Inter") <= 600.0 - 2.0 * SAFE_MARGIN_PT + 1e-2);
    }

    #[test]
    fn each_section_is_clipped_to_its_rectangle() {
        use lopdf::Document;
        use lopdf::content::Content;

        let page = PrintPageConfig::default();
        let geometry = CoverGeometry::new(&page, 20.0);
        let fonts = FontResolver::new();
        fonts.register_fonts();
        let content = cover_with(&["My Book", "By Jane Doe"]);

        let (bytes, _) = render_cover(
            &content,
            &geometry,
            &page,
            &ExportOptions::default(),
            &fonts,
            &HashMap::new(),
        )
        .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        let content = Content::decode(&doc.get_page_content(pages[&1]).unwrap()).unwrap();
        let ops = &content.operations;

        let clips: Vec<Vec<f32>> = ops
            .windows(2)
            .filter(|pair| pair[0].operator == "re" && pair[1].operator == "W")
            .map(|pair| pair[0].operands.iter().map(|o| o.as_float().unwrap()).collect())
            .collect();
        assert_eq!(clips.len(), 3);
        for (clip, (_, rect)) in clips.iter().zip(geometry.sections()) {
            assert!((clip[0] - rect.x).abs() < 1e-3);
            assert!((clip[2] - rect.width).abs() < 1e-3);
            assert!((clip[3] - rect.height).abs() < 1e-3);
        }
    }
}
